// ── List reconciliation ──
//
// A displayed list is three layers: the authoritative window from the
// latest poll, the local optimistic marks (pending removals and pending
// additions), and on the selected side an order overlay from a local
// drag. The rendering is re-derived from all three after every change.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use strum::Display;

use picklist_core::{Item, ItemId};

/// Which of the two views a reconciler mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ListSide {
    Available,
    Selected,
}

impl ListSide {
    pub fn opposite(self) -> Self {
        match self {
            Self::Available => Self::Selected,
            Self::Selected => Self::Available,
        }
    }
}

/// Result of re-fetching pages `1..=pages` of a list.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub items: Vec<Item>,
    pub pages: usize,
    pub has_more: bool,
}

/// Optimistic marks one id carried at some point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingMarks {
    removed: bool,
    added: Option<(usize, Item)>,
}

// ── ListReconciler ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ListReconciler {
    side: ListSide,
    search: String,
    authoritative: Vec<Item>,
    pages_loaded: usize,
    has_more: bool,
    pending_removed: HashSet<ItemId>,
    pending_added: IndexMap<ItemId, Item>,
    order_overlay: Option<Vec<ItemId>>,
    displayed: Vec<Item>,
}

impl ListReconciler {
    pub fn new(side: ListSide) -> Self {
        Self {
            side,
            search: String::new(),
            authoritative: Vec::new(),
            pages_loaded: 0,
            has_more: true,
            pending_removed: HashSet::new(),
            pending_added: IndexMap::new(),
            order_overlay: None,
            displayed: Vec::new(),
        }
    }

    pub fn side(&self) -> ListSide {
        self.side
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// The merged rendering.
    pub fn displayed(&self) -> &[Item] {
        &self.displayed
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    pub fn is_pending_removed(&self, id: &ItemId) -> bool {
        self.pending_removed.contains(id)
    }

    pub fn is_pending_added(&self, id: &ItemId) -> bool {
        self.pending_added.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending_removed.len() + self.pending_added.len()
    }

    pub fn order_overlay(&self) -> Option<&[ItemId]> {
        self.order_overlay.as_deref()
    }

    // ── Window management ───────────────────────────────────────────

    /// Change the filter. The loaded window no longer applies; pending
    /// marks survive.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.reset_window();
    }

    pub fn reset_window(&mut self) {
        self.authoritative.clear();
        self.pages_loaded = 0;
        self.has_more = true;
        self.rederive();
    }

    /// Replace the window with a fresh multi-page poll and settle any
    /// optimistic marks the poll unambiguously confirms.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let present: HashSet<&ItemId> = snapshot.items.iter().map(|i| &i.id).collect();
        let window_end = if snapshot.has_more {
            snapshot.items.last().map(|i| &i.id)
        } else {
            None
        };

        // Absence only counts where the poll actually looked.
        let removed: Vec<ItemId> = self
            .pending_removed
            .iter()
            .filter(|id| !present.contains(id) && self.covers(id, window_end))
            .cloned()
            .collect();
        for id in &removed {
            self.pending_removed.remove(id);
        }
        self.pending_added.retain(|id, _| !present.contains(id));

        self.authoritative = snapshot.items;
        self.pages_loaded = snapshot.pages;
        self.has_more = snapshot.has_more;
        self.settle_overlay();
        self.rederive();
    }

    /// Extend the window by one page.
    pub fn append_page(&mut self, items: Vec<Item>, has_more: bool) {
        let known: HashSet<ItemId> = self.authoritative.iter().map(|i| i.id.clone()).collect();
        for item in items {
            self.pending_added.shift_remove(&item.id);
            if !known.contains(&item.id) {
                self.authoritative.push(item);
            }
        }
        self.pages_loaded += 1;
        self.has_more = has_more;
        self.rederive();
    }

    // ── Optimistic marks ────────────────────────────────────────────

    /// Hide `id` until a poll confirms it is gone. Returns the displayed
    /// item so it can be handed to the other list.
    pub fn mark_removed(&mut self, id: &ItemId) -> Option<Item> {
        let item = self.displayed.iter().find(|i| &i.id == id).cloned();
        self.pending_added.shift_remove(id);
        self.pending_removed.insert(id.clone());
        self.rederive();
        item
    }

    /// Show `item` until a poll confirms it is present.
    pub fn mark_added(&mut self, item: Item) {
        self.pending_removed.remove(&item.id);
        self.pending_added.insert(item.id.clone(), item);
        self.rederive();
    }

    /// The marks `id` carries right now, for [`restore_marks`](Self::restore_marks).
    pub fn marks(&self, id: &ItemId) -> PendingMarks {
        PendingMarks {
            removed: self.pending_removed.contains(id),
            added: self
                .pending_added
                .get_full(id)
                .map(|(at, _, item)| (at, item.clone())),
        }
    }

    /// Put back the marks captured before a failed mutation.
    pub fn restore_marks(&mut self, id: &ItemId, marks: PendingMarks) {
        if marks.removed {
            self.pending_removed.insert(id.clone());
        } else {
            self.pending_removed.remove(id);
        }
        self.pending_added.shift_remove(id);
        if let Some((at, item)) = marks.added {
            let at = at.min(self.pending_added.len());
            self.pending_added.shift_insert(at, id.clone(), item);
        }
        self.rederive();
    }

    /// Move the displayed entry at `from` to `to`. Returns the full
    /// displayed id sequence in its new order, which becomes the overlay.
    pub fn move_item(&mut self, from: usize, to: usize) -> Option<Vec<ItemId>> {
        let len = self.displayed.len();
        if from >= len || to >= len {
            return None;
        }
        let mut order: Vec<ItemId> = self.displayed.iter().map(|i| i.id.clone()).collect();
        let moved = order.remove(from);
        order.insert(to, moved);
        self.order_overlay = Some(order.clone());
        self.rederive();
        Some(order)
    }

    pub fn clear_overlay(&mut self) {
        if self.order_overlay.take().is_some() {
            self.rederive();
        }
    }

    // ── Derivation ──────────────────────────────────────────────────

    /// Whether a poll bounded by `window_end` would have returned `id` if
    /// it were in the list.
    fn covers(&self, id: &ItemId, window_end: Option<&ItemId>) -> bool {
        if !id.matches(&self.search) {
            return false;
        }
        match self.side {
            ListSide::Available => window_end.is_none_or(|end| id <= end),
            ListSide::Selected => true,
        }
    }

    /// Forget overlay ids a complete poll no longer returns, then drop the
    /// overlay once every remaining id is served in overlay order. An id
    /// that is still pending-added blocks settling: the poll cannot show
    /// it yet, so the reorder that placed it is unconfirmed.
    fn settle_overlay(&mut self) {
        let Some(overlay) = self.order_overlay.as_mut() else {
            return;
        };
        let position: HashMap<&ItemId, usize> = self
            .authoritative
            .iter()
            .enumerate()
            .map(|(i, item)| (&item.id, i))
            .collect();
        if !self.has_more {
            overlay.retain(|id| {
                position.contains_key(id)
                    || self.pending_added.contains_key(id)
                    || !id.matches(&self.search)
            });
        }

        let mut served = Vec::with_capacity(overlay.len());
        for id in overlay.iter().filter(|id| !self.pending_removed.contains(*id)) {
            match position.get(id) {
                Some(&at) => served.push(at),
                None => return,
            }
        }
        if served.windows(2).all(|pair| pair[0] < pair[1]) {
            self.order_overlay = None;
        }
    }

    fn rederive(&mut self) {
        let present: HashSet<&ItemId> = self.authoritative.iter().map(|i| &i.id).collect();
        let mut merged: Vec<Item> = self
            .authoritative
            .iter()
            .filter(|i| !self.pending_removed.contains(&i.id))
            .cloned()
            .collect();
        let extras = self
            .pending_added
            .values()
            .filter(|i| !present.contains(&i.id) && i.id.matches(&self.search));

        match self.side {
            ListSide::Available => {
                // Past the window end the item belongs to a page not loaded yet.
                let window_end = if self.has_more {
                    self.authoritative.last().map(|i| &i.id)
                } else {
                    None
                };
                for item in extras {
                    if window_end.is_some_and(|end| item.id > *end) {
                        continue;
                    }
                    let at = merged.partition_point(|probe| probe.id < item.id);
                    merged.insert(at, item.clone());
                }
            }
            ListSide::Selected => merged.extend(extras.cloned()),
        }

        if let Some(overlay) = &self.order_overlay {
            let rank: HashMap<&ItemId, usize> =
                overlay.iter().enumerate().map(|(i, id)| (id, i)).collect();
            merged.sort_by_key(|item| rank.get(&item.id).copied().unwrap_or(usize::MAX));
        }

        self.displayed = merged;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn items(raw: &[i64]) -> Vec<Item> {
        raw.iter().map(|&n| Item::named(ItemId::from(n))).collect()
    }

    fn shown(list: &ListReconciler) -> Vec<i64> {
        list.displayed()
            .iter()
            .filter_map(|i| i.id.as_numeric())
            .collect()
    }

    fn snapshot(raw: &[i64], has_more: bool) -> Snapshot {
        Snapshot {
            items: items(raw),
            pages: 1,
            has_more,
        }
    }

    #[test]
    fn pending_removal_hides_until_poll_confirms() {
        let mut list = ListReconciler::new(ListSide::Available);
        list.apply_snapshot(snapshot(&[1, 2, 3], false));

        let item = list.mark_removed(&ItemId::from(2)).unwrap();
        assert_eq!(item.name, "Item 2");
        assert_eq!(shown(&list), vec![1, 3]);

        // Flush has not happened yet: the item is still served.
        list.apply_snapshot(snapshot(&[1, 2, 3], false));
        assert_eq!(shown(&list), vec![1, 3]);
        assert!(list.is_pending_removed(&ItemId::from(2)));

        list.apply_snapshot(snapshot(&[1, 3], false));
        assert!(!list.is_pending_removed(&ItemId::from(2)));
        assert_eq!(list.pending_count(), 0);
    }

    #[test]
    fn pending_addition_merges_in_sorted_position() {
        let mut list = ListReconciler::new(ListSide::Available);
        list.apply_snapshot(snapshot(&[1, 3, 5], false));
        list.mark_added(Item::named(ItemId::from(4)));
        assert_eq!(shown(&list), vec![1, 3, 4, 5]);

        list.apply_snapshot(snapshot(&[1, 3, 4, 5], false));
        assert!(!list.is_pending_added(&ItemId::from(4)));
        assert_eq!(shown(&list), vec![1, 3, 4, 5]);
    }

    #[test]
    fn pending_addition_past_a_partial_window_stays_hidden() {
        let mut list = ListReconciler::new(ListSide::Available);
        list.apply_snapshot(snapshot(&[1, 2, 3], true));
        list.mark_added(Item::named(ItemId::from(50)));
        assert_eq!(shown(&list), vec![1, 2, 3]);
        assert!(list.is_pending_added(&ItemId::from(50)));
    }

    #[test]
    fn removal_beyond_polled_window_is_not_confirmed() {
        let mut list = ListReconciler::new(ListSide::Available);
        list.apply_snapshot(snapshot(&[1, 2, 3, 40], false));
        list.mark_removed(&ItemId::from(40));

        // A poll that stopped at 3 says nothing about 40.
        list.apply_snapshot(snapshot(&[1, 2, 3], true));
        assert!(list.is_pending_removed(&ItemId::from(40)));
    }

    #[test]
    fn selected_side_appends_pending_additions() {
        let mut list = ListReconciler::new(ListSide::Selected);
        list.apply_snapshot(snapshot(&[9, 2], false));
        list.mark_added(Item::named(ItemId::from(5)));
        assert_eq!(shown(&list), vec![9, 2, 5]);
    }

    #[test]
    fn search_filters_pending_additions() {
        let mut list = ListReconciler::new(ListSide::Selected);
        list.set_search("2");
        list.apply_snapshot(snapshot(&[12], false));
        list.mark_added(Item::named(ItemId::from(7)));
        list.mark_added(Item::named(ItemId::from(21)));
        assert_eq!(shown(&list), vec![12, 21]);
    }

    #[test]
    fn move_installs_overlay_until_server_agrees() {
        let mut list = ListReconciler::new(ListSide::Selected);
        list.apply_snapshot(snapshot(&[1, 5, 7, 9], false));

        let order = list.move_item(3, 0).unwrap();
        assert_eq!(order, items(&[9, 1, 5, 7]).into_iter().map(|i| i.id).collect::<Vec<_>>());
        assert_eq!(shown(&list), vec![9, 1, 5, 7]);

        // Stale poll: the overlay keeps the local order.
        list.apply_snapshot(snapshot(&[1, 5, 7, 9], false));
        assert_eq!(shown(&list), vec![9, 1, 5, 7]);
        assert!(list.order_overlay().is_some());

        list.apply_snapshot(snapshot(&[9, 1, 5, 7], false));
        assert!(list.order_overlay().is_none());
    }

    #[test]
    fn overlay_ranks_unknown_ids_last() {
        let mut list = ListReconciler::new(ListSide::Selected);
        list.apply_snapshot(snapshot(&[1, 2, 3], false));
        list.move_item(2, 0).unwrap();
        list.mark_added(Item::named(ItemId::from(8)));
        assert_eq!(shown(&list), vec![3, 1, 2, 8]);
    }

    #[test]
    fn out_of_range_move_is_rejected() {
        let mut list = ListReconciler::new(ListSide::Selected);
        list.apply_snapshot(snapshot(&[1, 2], false));
        assert!(list.move_item(0, 2).is_none());
        assert!(list.order_overlay().is_none());
    }

    #[test]
    fn restore_marks_undoes_a_local_move() {
        let mut list = ListReconciler::new(ListSide::Available);
        list.apply_snapshot(snapshot(&[1, 2], false));
        let one = ItemId::from(1);
        let before = list.marks(&one);
        list.mark_removed(&one);
        list.restore_marks(&one, before);
        assert_eq!(shown(&list), vec![1, 2]);

        let three = ItemId::from(3);
        let before = list.marks(&three);
        list.mark_added(Item::named(three.clone()));
        list.restore_marks(&three, before);
        assert_eq!(shown(&list), vec![1, 2]);
        assert_eq!(list.pending_count(), 0);
    }

    #[test]
    fn restore_marks_brings_back_cleared_marks() {
        let mut list = ListReconciler::new(ListSide::Selected);
        list.apply_snapshot(snapshot(&[1], false));
        let four = ItemId::from(4);
        let five = ItemId::from(5);
        list.mark_added(Item::named(four.clone()));
        list.mark_added(Item::named(five.clone()));

        // Moving 4 out again drops its pending addition.
        let before = list.marks(&four);
        list.mark_removed(&four);
        assert_eq!(shown(&list), vec![1, 5]);

        list.restore_marks(&four, before);
        assert!(list.is_pending_added(&four));
        assert!(!list.is_pending_removed(&four));
        assert_eq!(shown(&list), vec![1, 4, 5]);
    }

    #[test]
    fn overlay_holds_while_moved_item_is_unconfirmed() {
        let mut list = ListReconciler::new(ListSide::Selected);
        list.apply_snapshot(snapshot(&[1, 2], false));
        list.mark_added(Item::named(ItemId::from(3)));
        list.move_item(2, 0).unwrap();
        assert_eq!(shown(&list), vec![3, 1, 2]);

        // The poll predates the flush: 3 is missing, 1 and 2 are in order.
        list.apply_snapshot(snapshot(&[1, 2], false));
        assert_eq!(shown(&list), vec![3, 1, 2]);
        assert!(list.order_overlay().is_some());

        list.apply_snapshot(snapshot(&[3, 1, 2], false));
        assert!(list.order_overlay().is_none());
        assert_eq!(shown(&list), vec![3, 1, 2]);
    }

    #[test]
    fn overlay_forgets_ids_gone_from_a_complete_poll() {
        let mut list = ListReconciler::new(ListSide::Selected);
        list.apply_snapshot(snapshot(&[1, 2, 3], false));
        list.move_item(2, 0).unwrap();

        // 2 was unselected elsewhere; the rest matches the local order.
        list.apply_snapshot(snapshot(&[3, 1], false));
        assert!(list.order_overlay().is_none());
        assert_eq!(shown(&list), vec![3, 1]);
    }

    #[test]
    fn append_page_extends_window_and_confirms_additions() {
        let mut list = ListReconciler::new(ListSide::Available);
        list.apply_snapshot(snapshot(&[1, 2], true));
        list.mark_added(Item::named(ItemId::from(4)));
        assert_eq!(shown(&list), vec![1, 2]);

        list.append_page(items(&[2, 3, 4]), false);
        assert_eq!(list.pages_loaded(), 2);
        assert!(!list.has_more());
        assert!(!list.is_pending_added(&ItemId::from(4)));
        assert_eq!(shown(&list), vec![1, 2, 3, 4]);
    }

    #[test]
    fn set_search_resets_window_but_keeps_marks() {
        let mut list = ListReconciler::new(ListSide::Available);
        list.apply_snapshot(snapshot(&[1, 2], false));
        list.mark_removed(&ItemId::from(2));
        list.set_search("2");
        assert_eq!(list.pages_loaded(), 0);
        assert!(list.has_more());
        assert!(list.displayed().is_empty());
        assert!(list.is_pending_removed(&ItemId::from(2)));
    }
}
