// ── Query engine ──
//
// Offset pagination with substring search over the repository views.
// Cost is O(offset + page_size) per call; pages are expected to be
// requested incrementally.

use serde::{Deserialize, Serialize};

use super::repository::CatalogState;
use crate::model::Item;

/// A page of a list view. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: usize,
    /// Zero asks the engine for its default page size.
    #[serde(default)]
    pub page_size: usize,
    #[serde(default)]
    pub search: String,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize, search: impl Into<String>) -> Self {
        Self {
            page,
            page_size,
            search: search.into(),
        }
    }

    /// First page, no filter.
    pub fn first(page_size: usize) -> Self {
        Self::new(1, page_size, "")
    }

    /// Clamp to `page >= 1` and `1 <= page_size <= max_page_size`.
    pub(crate) fn clamped(&self, max_page_size: usize) -> (usize, usize) {
        let page = self.page.max(1);
        let page_size = self.page_size.clamp(1, max_page_size.max(1));
        (page, page_size)
    }
}

/// A page shorter than the requested size is the last page.
pub fn is_last_page(returned: usize, page_size: usize) -> bool {
    returned < page_size
}

impl CatalogState {
    /// Unselected items in sorted id order.
    pub(crate) fn list_available(&self, req: &PageRequest, max_page_size: usize) -> Vec<Item> {
        let (page, page_size) = req.clamped(max_page_size);
        let skip = (page - 1).saturating_mul(page_size);

        self.ordered_ids
            .iter()
            .filter(|id| !self.selection.contains(*id))
            .filter(|id| id.matches(&req.search))
            .skip(skip)
            .take(page_size)
            .filter_map(|id| self.items.get(id).cloned())
            .collect()
    }

    /// Selected items in selection order.
    pub(crate) fn list_selected(&self, req: &PageRequest, max_page_size: usize) -> Vec<Item> {
        let (page, page_size) = req.clamped(max_page_size);
        let skip = (page - 1).saturating_mul(page_size);

        self.selection
            .iter()
            .filter_map(|id| self.items.get(id))
            .filter(|item| item.id.matches(&req.search))
            .skip(skip)
            .take(page_size)
            .cloned()
            .collect()
    }
}
