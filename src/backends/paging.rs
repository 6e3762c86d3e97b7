use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::debug;

use super::errors::BackendResult;
use super::orientation;
use crate::models::{NormalizedItem, OrientationMode, PagedResponse};

/// How hard a backend-paged feed tries to fill a page after orientation
/// filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingPolicy {
    /// Each request asks for `limit * overfetch_factor` raw items.
    pub overfetch_factor: u32,
    /// Upper bound on backend requests per page.
    pub max_fill_rounds: u32,
}

impl Default for PagingPolicy {
    fn default() -> Self {
        Self {
            overfetch_factor: 2,
            max_fill_rounds: 3,
        }
    }
}

/// One raw backend page, already normalized but not filtered.
#[derive(Debug, Default)]
pub(crate) struct RawPage {
    pub items: Vec<NormalizedItem>,
    pub total_count: u64,
}

/// Fetches raw pages starting at `skip` until `limit` items pass the
/// orientation filter or the backend runs dry.
///
/// `next_skip` is the raw offset just past the last raw item looked at, so
/// items cut off by truncation are returned by the next call. `total_count`
/// is the backend's unfiltered total.
pub(crate) async fn fill_page<F, Fut>(
    skip: u64,
    limit: usize,
    mode: OrientationMode,
    policy: PagingPolicy,
    mut fetch: F,
) -> BackendResult<PagedResponse>
where
    F: FnMut(u64, usize) -> Fut,
    Fut: Future<Output = BackendResult<RawPage>>,
{
    if limit == 0 {
        return Ok(PagedResponse {
            items: Vec::new(),
            next_skip: skip,
            total_count: 0,
        });
    }

    let request_size = limit.saturating_mul(policy.overfetch_factor.max(1) as usize);
    let mut cursor = skip;
    let mut total_count = 0;
    let mut kept = Vec::with_capacity(limit);

    for round in 0..policy.max_fill_rounds.max(1) {
        let page = fetch(cursor, request_size).await?;
        let fetched = page.items.len();
        total_count = page.total_count;

        let mut consumed = 0u64;
        for item in page.items {
            if kept.len() >= limit {
                break;
            }
            consumed += 1;
            if orientation::matches(&item, mode) {
                kept.push(item);
            }
        }
        cursor += consumed;

        debug!(
            "fill_page round {}: fetched {}, kept {}/{}, cursor {} of {}",
            round,
            fetched,
            kept.len(),
            limit,
            cursor,
            total_count
        );

        if fetched == 0 {
            // An empty page ends the feed whatever the reported total says.
            total_count = total_count.min(cursor);
            break;
        }
        if kept.len() >= limit || fetched < request_size || cursor >= total_count {
            break;
        }
    }

    Ok(PagedResponse {
        items: kept,
        next_skip: cursor,
        total_count,
    })
}

/// Client-side page over a whole favorites playlist: filtered, newest
/// addition first, then sliced to `[skip, skip + limit)`.
pub(crate) fn slice_favorites(
    playlist: Vec<NormalizedItem>,
    mode: OrientationMode,
    skip: u64,
    limit: usize,
) -> PagedResponse {
    let mut filtered = orientation::filter(playlist, mode);
    filtered.reverse();
    let total_count = filtered.len() as u64;
    let items = filtered
        .into_iter()
        .skip(skip as usize)
        .take(limit)
        .collect();

    PagedResponse {
        items,
        next_skip: skip + limit as u64,
        total_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::errors::BackendError;
    use crate::models::ItemKind;
    use std::cell::RefCell;
    use std::collections::HashSet;

    fn catalogue() -> Vec<NormalizedItem> {
        (0..30)
            .map(|i| {
                let item = NormalizedItem::new(format!("v{}", i), format!("v{}", i), ItemKind::Video);
                // Every third item is landscape.
                if i % 3 == 0 {
                    item.with_dimensions(1920, 1080)
                } else {
                    item.with_dimensions(1080, 1920)
                }
            })
            .collect()
    }

    fn backend(
        items: &[NormalizedItem],
        requests: &RefCell<Vec<(u64, usize)>>,
        skip: u64,
        size: usize,
    ) -> std::future::Ready<BackendResult<RawPage>> {
        requests.borrow_mut().push((skip, size));
        let page = items
            .iter()
            .skip(skip as usize)
            .take(size)
            .cloned()
            .collect();
        std::future::ready(Ok(RawPage {
            items: page,
            total_count: items.len() as u64,
        }))
    }

    #[tokio::test]
    async fn test_truncation_does_not_skip_items() {
        let items = catalogue();
        let requests = RefCell::new(Vec::new());

        let page = fill_page(0, 4, OrientationMode::Vertical, PagingPolicy::default(), |s, n| {
            backend(&items, &requests, s, n)
        })
        .await
        .unwrap();

        let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2", "v4", "v5"]);
        // v0 (filtered) through v5 were looked at; v6 onwards were not.
        assert_eq!(page.next_skip, 6);
        assert_eq!(page.total_count, 30);
        assert_eq!(requests.borrow().as_slice(), &[(0, 8)]);
    }

    #[tokio::test]
    async fn test_sequential_pages_have_no_duplicates() {
        let items = catalogue();
        let requests = RefCell::new(Vec::new());
        let mut seen = HashSet::new();
        let mut skip = 0;

        loop {
            let page = fill_page(skip, 5, OrientationMode::Vertical, PagingPolicy::default(), |s, n| {
                backend(&items, &requests, s, n)
            })
            .await
            .unwrap();
            for item in &page.items {
                assert!(seen.insert(item.id.clone()), "duplicate {}", item.id);
            }
            skip = page.next_skip;
            if !page.has_more() {
                break;
            }
        }

        // Every portrait item was delivered exactly once.
        assert_eq!(seen.len(), 20);
    }

    #[tokio::test]
    async fn test_refills_until_limit_reached() {
        // Mostly landscape: one portrait item in every five.
        let items: Vec<_> = (0..40)
            .map(|i| {
                let item = NormalizedItem::new(format!("v{}", i), "v", ItemKind::Video);
                if i % 5 == 0 {
                    item.with_dimensions(1080, 1920)
                } else {
                    item.with_dimensions(1920, 1080)
                }
            })
            .collect();
        let requests = RefCell::new(Vec::new());

        let page = fill_page(0, 3, OrientationMode::Vertical, PagingPolicy::default(), |s, n| {
            backend(&items, &requests, s, n)
        })
        .await
        .unwrap();

        assert_eq!(page.items.len(), 3);
        assert_eq!(requests.borrow().as_slice(), &[(0, 6), (6, 6)]);
        assert_eq!(page.next_skip, 11);
    }

    #[tokio::test]
    async fn test_stops_after_max_rounds() {
        let items: Vec<_> = (0..100)
            .map(|i| NormalizedItem::new(format!("v{}", i), "v", ItemKind::Video).with_dimensions(1920, 1080))
            .collect();
        let requests = RefCell::new(Vec::new());
        let policy = PagingPolicy {
            overfetch_factor: 2,
            max_fill_rounds: 2,
        };

        let page = fill_page(0, 5, OrientationMode::Vertical, policy, |s, n| {
            backend(&items, &requests, s, n)
        })
        .await
        .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(requests.borrow().len(), 2);
        assert_eq!(page.next_skip, 20);
        assert!(page.has_more());
    }

    #[tokio::test]
    async fn test_empty_backend_page_ends_feed() {
        let page = fill_page(10, 5, OrientationMode::Both, PagingPolicy::default(), |_, _| {
            std::future::ready(Ok(RawPage {
                items: Vec::new(),
                total_count: 50,
            }))
        })
        .await
        .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.next_skip, 10);
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let result = fill_page(0, 5, OrientationMode::Both, PagingPolicy::default(), |_, _| {
            std::future::ready(Err(BackendError::Network("refused".to_string())))
        })
        .await;

        assert_eq!(result, Err(BackendError::Network("refused".to_string())));
    }

    #[test]
    fn test_favorites_slice_newest_first() {
        let playlist: Vec<_> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| NormalizedItem::new(*id, *id, ItemKind::Video))
            .collect();

        let first = slice_favorites(playlist.clone(), OrientationMode::Both, 0, 2);
        let ids: Vec<_> = first.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["e", "d"]);
        assert_eq!(first.next_skip, 2);
        assert_eq!(first.total_count, 5);

        let last = slice_favorites(playlist, OrientationMode::Both, 4, 2);
        let ids: Vec<_> = last.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
        assert!(!last.has_more());
    }

    #[test]
    fn test_favorites_total_counts_filtered_items() {
        let playlist = vec![
            NormalizedItem::new("p", "p", ItemKind::Video).with_dimensions(1080, 1920),
            NormalizedItem::new("l", "l", ItemKind::Video).with_dimensions(1920, 1080),
            NormalizedItem::new("u", "u", ItemKind::Video),
        ];

        let page = slice_favorites(playlist, OrientationMode::Vertical, 0, 10);
        let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["u", "p"]);
        assert_eq!(page.total_count, 2);
    }
}
