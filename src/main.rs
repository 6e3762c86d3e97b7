use anyhow::{Context, Result, bail};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reeltok::Config;
use reeltok::Session;
use reeltok::models::ServerType;

const FIRST_PAGE_TIMEOUT: Duration = Duration::from_secs(60);

fn usage() -> &'static str {
    "usage: reeltok [<emby|plex> <url> <username> <password-or-token>]"
}

fn parse_server_type(value: &str) -> Result<ServerType> {
    match value.to_ascii_lowercase().as_str() {
        "emby" | "jellyfin" => Ok(ServerType::Emby),
        "plex" => Ok(ServerType::Plex),
        other => bail!("Unknown server type '{}'\n{}", other, usage()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reeltok=info")),
        )
        .init();

    info!("Starting ReelTok");

    let mut config = Config::load()?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    let session = match args.as_slice() {
        [server_type, url, username, credential] => {
            let server_type = parse_server_type(server_type)?;
            let session = Session::login(server_type, url, username, credential, &config)
                .await
                .context("Login failed")?;
            config.set_server(Some(session.profile().clone()))?;
            session
        }
        [] => {
            let profile = config
                .saved_server()
                .with_context(|| format!("No saved server\n{}", usage()))?;
            Session::resume(profile, &config).context("Saved server profile is unusable")?
        }
        _ => bail!("{}", usage()),
    };

    let feed = session.feed();
    let state = tokio::time::timeout(
        FIRST_PAGE_TIMEOUT,
        feed.wait_for(|state| !state.is_loading && state.epoch() > 0),
    )
    .await
    .context("Timed out waiting for the first page")?
    .context("Feed stopped before the first page arrived")?;

    for library in &state.libraries {
        info!("Library: {} ({})", library.name, library.id);
    }
    if let Some(error) = &state.last_error {
        warn!("{}", error);
    }
    for item in &state.items {
        let dimensions = item
            .dimensions()
            .map(|(w, h)| format!("{}x{}", w, h))
            .unwrap_or_else(|| "?".to_string());
        info!(
            "{:?} {} [{}] {}",
            item.kind,
            item.name,
            dimensions,
            session.client().video_url(item)
        );
    }
    info!(
        "{} items, more available: {}",
        state.items.len(),
        state.has_more
    );

    session.logout().await;
    Ok(())
}
