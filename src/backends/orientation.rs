use crate::models::{NormalizedItem, OrientationMode};

/// Height must reach this share of the width for an item to count as
/// vertical, so near-square clips still show up in the vertical feed.
pub const VERTICAL_MIN_RATIO: f64 = 0.8;

/// Whether a single item survives the orientation filter.
///
/// Containers always pass so drill-down is never hidden, and items with
/// unknown or zero dimensions pass under every mode.
pub fn matches(item: &NormalizedItem, mode: OrientationMode) -> bool {
    if mode == OrientationMode::Both || item.kind.is_container() {
        return true;
    }

    let Some((width, height)) = item.dimensions() else {
        return true;
    };

    match mode {
        OrientationMode::Vertical => f64::from(height) >= f64::from(width) * VERTICAL_MIN_RATIO,
        OrientationMode::Horizontal => width > height,
        OrientationMode::Both => true,
    }
}

pub fn filter(items: Vec<NormalizedItem>, mode: OrientationMode) -> Vec<NormalizedItem> {
    if mode == OrientationMode::Both {
        return items;
    }
    items.into_iter().filter(|item| matches(item, mode)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKind;

    const ALL_MODES: [OrientationMode; 3] = [
        OrientationMode::Vertical,
        OrientationMode::Horizontal,
        OrientationMode::Both,
    ];

    fn video(id: &str, width: u32, height: u32) -> NormalizedItem {
        NormalizedItem::new(id, id, ItemKind::Video).with_dimensions(width, height)
    }

    fn sample() -> Vec<NormalizedItem> {
        vec![
            video("portrait", 1080, 1920),
            video("landscape", 1920, 1080),
            video("square", 1000, 1000),
            video("near-square", 1000, 800),
            video("wide-ish", 1000, 799),
            NormalizedItem::new("unknown", "unknown", ItemKind::Video),
            NormalizedItem::new("series", "series", ItemKind::Series).with_dimensions(1920, 1080),
        ]
    }

    fn ids(items: &[NormalizedItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_both_is_identity() {
        let items = sample();
        assert_eq!(filter(items.clone(), OrientationMode::Both), items);
    }

    #[test]
    fn test_vertical_tolerates_near_square() {
        let kept = filter(sample(), OrientationMode::Vertical);
        assert_eq!(
            ids(&kept),
            vec!["portrait", "square", "near-square", "unknown", "series"]
        );
    }

    #[test]
    fn test_horizontal_requires_wider_than_tall() {
        let kept = filter(sample(), OrientationMode::Horizontal);
        assert_eq!(
            ids(&kept),
            vec!["landscape", "near-square", "wide-ish", "unknown", "series"]
        );
    }

    #[test]
    fn test_unknown_dimensions_pass_every_mode() {
        let unknown = NormalizedItem::new("u", "u", ItemKind::Video);
        let zeroed = video("z", 0, 0);
        let half_known = video("h", 1920, 0);
        for mode in ALL_MODES {
            assert!(matches(&unknown, mode));
            assert!(matches(&zeroed, mode));
            assert!(matches(&half_known, mode));
        }
    }

    #[test]
    fn test_containers_pass_every_mode() {
        for kind in [
            ItemKind::Series,
            ItemKind::Season,
            ItemKind::Folder,
            ItemKind::BoxSet,
        ] {
            let wide = NormalizedItem::new("c", "c", kind).with_dimensions(4000, 10);
            let tall = NormalizedItem::new("c", "c", kind).with_dimensions(10, 4000);
            for mode in ALL_MODES {
                assert!(matches(&wide, mode), "{:?} hidden under {:?}", kind, mode);
                assert!(matches(&tall, mode), "{:?} hidden under {:?}", kind, mode);
            }
        }
    }

    #[test]
    fn test_filter_preserves_order() {
        let items = vec![video("a", 9, 16), video("b", 16, 9), video("c", 3, 4)];
        assert_eq!(ids(&filter(items, OrientationMode::Vertical)), vec!["a", "c"]);
    }
}
