use crate::models::NormalizedItem;

/// Where to pick up inside a drilled-down list: the first item with a
/// saved playback position, otherwise the most recently played one.
pub fn resume_index(items: &[NormalizedItem]) -> Option<usize> {
    if let Some(index) = items.iter().position(|i| i.playback.is_in_progress()) {
        return Some(index);
    }

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| item.playback.last_played_at.map(|at| (at, index)))
        // Earliest index wins a tie.
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, index)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKind;
    use chrono::{TimeZone, Utc};

    fn episode(id: &str) -> NormalizedItem {
        NormalizedItem::new(id, id, ItemKind::Video)
    }

    #[test]
    fn test_in_progress_wins() {
        let mut items = vec![episode("e1"), episode("e2"), episode("e3")];
        items[0].playback.last_played_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single();
        items[2].playback.position_ticks = 1_000;

        assert_eq!(resume_index(&items), Some(2));
    }

    #[test]
    fn test_most_recently_played() {
        let mut items = vec![episode("e1"), episode("e2"), episode("e3")];
        items[0].playback.last_played_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single();
        items[1].playback.last_played_at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single();
        items[2].playback.last_played_at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).single();

        assert_eq!(resume_index(&items), Some(1));
    }

    #[test]
    fn test_nothing_watched() {
        assert_eq!(resume_index(&[episode("e1"), episode("e2")]), None);
        assert_eq!(resume_index(&[]), None);
    }
}
