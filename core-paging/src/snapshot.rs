//! Materialized feed snapshots.

use core_cache::StoryRecord;
use serde::{Deserialize, Serialize};

/// The ordered story sequence currently materialized for display, with the
/// continuation keys of the loaded window.
///
/// Ordering is stable and monotonic with respect to fetch order: items only
/// reorder when the source data itself changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PagedSnapshot {
    /// Stories in cache key order.
    pub items: Vec<StoryRecord>,
    /// Page index before the loaded window, `None` at the start of the feed.
    pub prev_key: Option<u32>,
    /// Page index after the loaded window, `None` once the end of the feed
    /// was observed.
    pub next_key: Option<u32>,
}

impl PagedSnapshot {
    /// Snapshot with no items and the whole feed still ahead.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            prev_key: None,
            next_key: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether more pages can be requested after this window.
    pub fn has_more(&self) -> bool {
        self.next_key.is_some()
    }
}
