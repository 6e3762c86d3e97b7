/// Display name for an episode: `S{season:02}E{index:02}. {title}`.
/// The season segment is dropped when unknown, an unknown index shows `--`.
pub fn episode_name(season: Option<u32>, index: Option<u32>, title: &str) -> String {
    let index = index
        .map(|i| format!("{:02}", i))
        .unwrap_or_else(|| "--".to_string());
    match season {
        Some(season) => format!("S{:02}E{}. {}", season, index, title),
        None => format!("E{}. {}", index, title),
    }
}

pub(crate) fn display_name(name: Option<String>) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name,
        _ => "Untitled".to_string(),
    }
}
