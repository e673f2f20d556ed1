// ── Item repository ──
//
// All items, the sorted id index, and the selection order live behind
// one `RwLock`. A flush is a single write-lock critical section, so a
// concurrent query observes either the whole batch or none of it.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::model::{Action, Item, ItemId, QueuedAction};

/// Result of replaying a single action against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    /// Valid but already satisfied (select of a selected id, empty reorder, ...).
    NoOp,
    /// References an id that is unknown or no longer in the required state.
    Stale,
}

/// Summary of an add flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AddReport {
    pub inserted: usize,
    /// Pending ids that were already present when the flush ran.
    pub dropped: usize,
}

/// Summary of an action flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub applied: usize,
    pub noop: usize,
    pub stale: usize,
    pub invalid: usize,
}

impl ActionReport {
    fn record(&mut self, outcome: ActionOutcome) {
        match outcome {
            ActionOutcome::Applied => self.applied += 1,
            ActionOutcome::NoOp => self.noop += 1,
            ActionOutcome::Stale => self.stale += 1,
        }
    }
}

/// Mutable catalog state guarded by the repository lock.
pub(crate) struct CatalogState {
    pub(crate) items: HashMap<ItemId, Item>,
    /// Every known id, sorted. Re-sorted only by add flushes.
    pub(crate) ordered_ids: Vec<ItemId>,
    /// Selected ids in selection/reorder order.
    pub(crate) selection: IndexSet<ItemId>,
}

impl CatalogState {
    fn seeded(count: u64) -> Self {
        let capacity = usize::try_from(count).unwrap_or(usize::MAX);
        let mut items = HashMap::with_capacity(capacity);
        let mut ordered_ids = Vec::with_capacity(capacity);
        for n in 1..=i64::try_from(count).unwrap_or(i64::MAX) {
            let id = ItemId::Numeric(n);
            items.insert(id.clone(), Item::named(id.clone()));
            ordered_ids.push(id);
        }
        Self {
            items,
            ordered_ids,
            selection: IndexSet::new(),
        }
    }

    fn insert_pending(&mut self, pending: IndexMap<ItemId, Item>) -> AddReport {
        let mut report = AddReport::default();
        for (id, item) in pending {
            if self.items.contains_key(&id) {
                debug!(%id, "pending add already present, dropping");
                report.dropped += 1;
                continue;
            }
            self.ordered_ids.push(id.clone());
            self.items.insert(id, item);
            report.inserted += 1;
        }
        if report.inserted > 0 {
            self.ordered_ids.sort_unstable();
        }
        report
    }

    pub(crate) fn apply(&mut self, action: &Action) -> ActionOutcome {
        match action {
            Action::Select(id) => self.select(id),
            Action::Unselect(id) => self.unselect(id),
            Action::Reorder(order) => self.reorder(order),
        }
    }

    fn select(&mut self, id: &ItemId) -> ActionOutcome {
        if !self.items.contains_key(id) {
            debug!(%id, "select of unknown id ignored");
            return ActionOutcome::Stale;
        }
        if self.selection.insert(id.clone()) {
            ActionOutcome::Applied
        } else {
            ActionOutcome::NoOp
        }
    }

    fn unselect(&mut self, id: &ItemId) -> ActionOutcome {
        if self.selection.shift_remove(id) {
            ActionOutcome::Applied
        } else if self.items.contains_key(id) {
            ActionOutcome::NoOp
        } else {
            debug!(%id, "unselect of unknown id ignored");
            ActionOutcome::Stale
        }
    }

    /// Move the selected ids named in `order` to the front, in that order;
    /// the remaining selected ids follow in their previous relative order.
    /// Ids that are unknown, unselected, or repeated are dropped, so the
    /// result is always a permutation of the current selection.
    fn reorder(&mut self, order: &[ItemId]) -> ActionOutcome {
        let mut next: IndexSet<ItemId> = IndexSet::with_capacity(self.selection.len());
        let mut ignored = 0usize;
        for id in order {
            if self.selection.contains(id) {
                next.insert(id.clone());
            } else {
                ignored += 1;
            }
        }
        if ignored > 0 {
            debug!(ignored, "reorder referenced ids outside the selection");
        }
        if next.is_empty() {
            return if order.is_empty() {
                ActionOutcome::NoOp
            } else {
                ActionOutcome::Stale
            };
        }
        for id in &self.selection {
            if !next.contains(id) {
                next.insert(id.clone());
            }
        }
        if next.iter().eq(self.selection.iter()) {
            return ActionOutcome::NoOp;
        }
        self.selection = next;
        ActionOutcome::Applied
    }
}

/// Source of truth for the catalog.
///
/// Thread-safe: reads take a shared lock; the add and action flushes are
/// the only writers. Every flush that changes state bumps a revision
/// counter observable through [`subscribe_revisions`](Self::subscribe_revisions).
pub struct Repository {
    state: RwLock<CatalogState>,
    revision: watch::Sender<u64>,
    last_add_flush: watch::Sender<Option<DateTime<Utc>>>,
    last_action_flush: watch::Sender<Option<DateTime<Utc>>>,
}

impl Repository {
    /// Repository pre-populated with ids `1..=count`.
    pub fn seeded(count: u64) -> Self {
        let (revision, _) = watch::channel(0u64);
        let (last_add_flush, _) = watch::channel(None);
        let (last_action_flush, _) = watch::channel(None);

        Self {
            state: RwLock::new(CatalogState::seeded(count)),
            revision,
            last_add_flush,
            last_action_flush,
        }
    }

    /// Commit pending adds. Ids that became known since they were queued
    /// are silently dropped. The id index is re-sorted once, and only if
    /// something was inserted.
    pub fn apply_adds(&self, pending: IndexMap<ItemId, Item>) -> AddReport {
        let report = self.write().insert_pending(pending);
        self.last_add_flush.send_replace(Some(Utc::now()));
        if report.inserted > 0 {
            self.bump_revision();
        }
        report
    }

    /// Replay queued actions in arrival order. A malformed or stale entry
    /// never aborts the batch.
    pub(crate) fn apply_actions(&self, actions: Vec<QueuedAction>) -> ActionReport {
        let mut report = ActionReport::default();
        {
            let mut state = self.write();
            for queued in actions {
                match queued {
                    QueuedAction::Valid(action) => report.record(state.apply(&action)),
                    QueuedAction::Malformed { kind, reason } => {
                        warn!(%kind, %reason, "skipping invalid command");
                        report.invalid += 1;
                    }
                }
            }
        }
        self.last_action_flush.send_replace(Some(Utc::now()));
        if report.applied > 0 {
            self.bump_revision();
        }
        report
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.read().items.contains_key(id)
    }

    pub fn item(&self, id: &ItemId) -> Option<Item> {
        self.read().items.get(id).cloned()
    }

    pub fn is_selected(&self, id: &ItemId) -> bool {
        self.read().selection.contains(id)
    }

    /// Copy of the current selection order.
    pub fn selection_order(&self) -> Vec<ItemId> {
        self.read().selection.iter().cloned().collect()
    }

    pub fn item_count(&self) -> usize {
        self.read().items.len()
    }

    pub fn selected_count(&self) -> usize {
        self.read().selection.len()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe_revisions(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn last_add_flush(&self) -> Option<DateTime<Utc>> {
        *self.last_add_flush.borrow()
    }

    pub fn last_action_flush(&self) -> Option<DateTime<Utc>> {
        *self.last_action_flush.borrow()
    }

    // ── Lock helpers ─────────────────────────────────────────────────

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().expect("catalog lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().expect("catalog lock poisoned")
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ids(raw: &[i64]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId::from).collect()
    }

    fn selected(repo: &Repository, raw: &[i64]) {
        let actions = raw
            .iter()
            .map(|n| QueuedAction::Valid(Action::Select(ItemId::from(*n))))
            .collect();
        repo.apply_actions(actions);
    }

    fn pending(raw: &[&str]) -> IndexMap<ItemId, Item> {
        raw.iter()
            .map(|s| {
                let id = ItemId::from(*s);
                (id.clone(), Item::named(id))
            })
            .collect()
    }

    #[test]
    fn seeding_creates_sorted_named_items() {
        let repo = Repository::seeded(3);
        assert_eq!(repo.item_count(), 3);
        assert_eq!(repo.item(&ItemId::from(2)).unwrap().name, "Item 2");
        assert_eq!(repo.read().ordered_ids, ids(&[1, 2, 3]));
    }

    #[test]
    fn apply_adds_inserts_and_resorts() {
        let repo = Repository::seeded(3);
        let report = repo.apply_adds(pending(&["zeta", "0", "10"]));
        assert_eq!(report, AddReport { inserted: 3, dropped: 0 });
        let order: Vec<String> = repo.read().ordered_ids.iter().map(ToString::to_string).collect();
        assert_eq!(order, vec!["0", "1", "2", "3", "10", "zeta"]);
    }

    #[test]
    fn apply_adds_drops_ids_that_already_exist() {
        let repo = Repository::seeded(3);
        let report = repo.apply_adds(pending(&["2", "4"]));
        assert_eq!(report, AddReport { inserted: 1, dropped: 1 });
        assert_eq!(repo.item_count(), 4);
    }

    #[test]
    fn empty_add_flush_does_not_bump_revision() {
        let repo = Repository::seeded(3);
        repo.apply_adds(IndexMap::new());
        assert_eq!(repo.revision(), 0);
        assert!(repo.last_add_flush().is_some());
    }

    #[test]
    fn select_is_idempotent_and_ignores_unknown_ids() {
        let repo = Repository::seeded(5);
        let mut state = repo.write();
        assert_eq!(state.select(&ItemId::from(3)), ActionOutcome::Applied);
        assert_eq!(state.select(&ItemId::from(3)), ActionOutcome::NoOp);
        assert_eq!(state.select(&ItemId::from(99)), ActionOutcome::Stale);
        assert_eq!(state.selection.len(), 1);
    }

    #[test]
    fn unselect_of_unselected_id_is_noop() {
        let repo = Repository::seeded(5);
        let mut state = repo.write();
        assert_eq!(state.unselect(&ItemId::from(2)), ActionOutcome::NoOp);
        assert_eq!(state.unselect(&ItemId::from(42)), ActionOutcome::Stale);
    }

    #[test]
    fn reorder_subset_moves_named_ids_first() {
        let repo = Repository::seeded(10);
        selected(&repo, &[1, 5, 7, 9]);
        let report = repo.apply_actions(vec![QueuedAction::Valid(Action::Reorder(ids(&[9, 5])))]);
        assert_eq!(report.applied, 1);
        assert_eq!(repo.selection_order(), ids(&[9, 5, 1, 7]));
    }

    #[test]
    fn reorder_drops_unknown_unselected_and_repeated_ids() {
        let repo = Repository::seeded(10);
        selected(&repo, &[1, 2, 3]);
        repo.apply_actions(vec![QueuedAction::Valid(Action::Reorder(ids(&[
            3, 42, 4, 3, 1,
        ])))]);
        assert_eq!(repo.selection_order(), ids(&[3, 1, 2]));
    }

    #[test]
    fn reorder_with_no_selected_ids_is_stale() {
        let repo = Repository::seeded(10);
        selected(&repo, &[1, 2]);
        let report = repo.apply_actions(vec![QueuedAction::Valid(Action::Reorder(ids(&[7, 8])))]);
        assert_eq!(report.stale, 1);
        assert_eq!(repo.selection_order(), ids(&[1, 2]));
    }

    #[test]
    fn malformed_entries_do_not_abort_the_batch() {
        let repo = Repository::seeded(5);
        let report = repo.apply_actions(vec![
            QueuedAction::Valid(Action::Select(ItemId::from(1))),
            QueuedAction::Malformed {
                kind: "explode".into(),
                reason: "unknown command kind".into(),
            },
            QueuedAction::Valid(Action::Select(ItemId::from(2))),
        ]);
        assert_eq!(report.applied, 2);
        assert_eq!(report.invalid, 1);
        assert_eq!(repo.selection_order(), ids(&[1, 2]));
        assert_eq!(repo.revision(), 1);
    }
}
