// ── Engine facade ──
//
// Owns the repository, both write buffers, and the two flush timers.
// Mutations return as soon as they are buffered; the flush tasks are
// the only writers of repository state.

use std::borrow::Cow;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::buffer::{ActionBuffer, AddBuffer};
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::model::{Action, Item, ItemId, QueuedAction, Queued};
use crate::store::{ActionReport, AddReport, PageRequest, Repository};

// ── CatalogStats ─────────────────────────────────────────────────

/// Point-in-time counters for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total_items: usize,
    pub selected_items: usize,
    pub pending_adds: usize,
    pub pending_actions: usize,
    pub revision: u64,
    pub last_add_flush: Option<DateTime<Utc>>,
    pub last_action_flush: Option<DateTime<Utc>>,
}

// ── Engine ───────────────────────────────────────────────────────

/// The main entry point for transport collaborators.
///
/// Cheaply cloneable via `Arc<EngineInner>`. Construct with
/// [`new()`](Self::new), then [`start()`](Self::start) the flush timers
/// from inside a tokio runtime.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    repo: Repository,
    adds: AddBuffer,
    actions: ActionBuffer,
    /// Serializes flushes: timer-driven and forced flushes never overlap.
    flush_gate: Mutex<()>,
    cancel: CancellationToken,
    task_handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Seed the catalog. Does NOT start the flush timers.
    pub fn new(config: EngineConfig) -> Self {
        let started = Instant::now();
        info!(count = config.seed_count, "seeding catalog");
        let repo = Repository::seeded(config.seed_count);
        info!(
            elapsed_ms = started.elapsed().as_millis(),
            "catalog seeding complete"
        );

        Self {
            inner: Arc::new(EngineInner {
                config,
                repo,
                adds: AddBuffer::new(),
                actions: ActionBuffer::new(),
                flush_gate: Mutex::new(()),
                cancel: CancellationToken::new(),
                task_handles: tokio::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn repository(&self) -> &Repository {
        &self.inner.repo
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the add and action flush tasks. Intervals of zero leave the
    /// corresponding timer off. Calling this twice is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::EngineStopped);
        }

        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("flush tasks already running");
            return Ok(());
        }

        let add_period = self.inner.config.add_flush_interval;
        if !add_period.is_zero() {
            handles.push(tokio::spawn(flush_task(
                self.clone(),
                add_period,
                "add",
                |engine| {
                    engine.flush_adds();
                },
            )));
        }

        let action_period = self.inner.config.action_flush_interval;
        if !action_period.is_zero() {
            handles.push(tokio::spawn(flush_task(
                self.clone(),
                action_period,
                "action",
                |engine| {
                    engine.flush_actions();
                },
            )));
        }

        info!(
            add_interval_ms = add_period.as_millis(),
            action_interval_ms = action_period.as_millis(),
            "engine started"
        );
        Ok(())
    }

    /// Stop the timers, wait for them, then drain both buffers one last
    /// time so acknowledged mutations are not lost.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        let adds = self.flush_adds();
        let actions = self.flush_actions();
        debug!(?adds, ?actions, "engine shut down");
    }

    pub fn is_running(&self) -> bool {
        !self.inner.cancel.is_cancelled()
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Unselected items in sorted id order.
    pub fn list_available(&self, req: &PageRequest) -> Vec<Item> {
        let req = self.sized(req);
        self.inner
            .repo
            .read()
            .list_available(&req, self.inner.config.max_page_size)
    }

    /// Selected items in selection order.
    pub fn list_selected(&self, req: &PageRequest) -> Vec<Item> {
        let req = self.sized(req);
        self.inner
            .repo
            .read()
            .list_selected(&req, self.inner.config.max_page_size)
    }

    /// A page size of zero means "unspecified".
    fn sized<'a>(&self, req: &'a PageRequest) -> Cow<'a, PageRequest> {
        if req.page_size == 0 {
            Cow::Owned(PageRequest {
                page_size: self.inner.config.default_page_size,
                ..req.clone()
            })
        } else {
            Cow::Borrowed(req)
        }
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Queue a new item named `"Item {id}"`.
    pub fn add_item(&self, id: impl Into<ItemId>) -> Result<Queued, CoreError> {
        self.ensure_running()?;
        let id = id.into();
        self.inner
            .adds
            .enqueue(&self.inner.repo, Item::named(id.clone()))?;
        debug!(%id, "add queued");

        let period = self.inner.config.add_flush_interval;
        let message = if period.is_zero() {
            format!("Item {id} queued; it will appear after the next add flush")
        } else {
            format!(
                "Item {id} queued; it will appear within ~{}s",
                period.as_secs().max(1)
            )
        };
        Ok(Queued::with_message(message))
    }

    pub fn select(&self, id: impl Into<ItemId>) -> Result<Queued, CoreError> {
        self.enqueue(QueuedAction::Valid(Action::Select(id.into())))
    }

    pub fn unselect(&self, id: impl Into<ItemId>) -> Result<Queued, CoreError> {
        self.enqueue(QueuedAction::Valid(Action::Unselect(id.into())))
    }

    pub fn reorder(&self, ids: Vec<ItemId>) -> Result<Queued, CoreError> {
        self.enqueue(QueuedAction::Valid(Action::Reorder(ids)))
    }

    /// Raw `{kind, payload}` entry point. Always acknowledged while the
    /// engine runs; malformed requests are rejected by the flush.
    pub fn modify(&self, kind: &str, payload: &Value) -> Result<Queued, CoreError> {
        self.enqueue(QueuedAction::from_request(kind, payload))
    }

    fn enqueue(&self, action: QueuedAction) -> Result<Queued, CoreError> {
        self.ensure_running()?;
        trace!(?action, "action queued");
        self.inner.actions.enqueue(action);
        Ok(Queued::new())
    }

    fn ensure_running(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            Err(CoreError::EngineStopped)
        } else {
            Ok(())
        }
    }

    // ── Flushes ──────────────────────────────────────────────────

    /// Commit all pending adds now. Empty buffers skip the re-sort.
    pub fn flush_adds(&self) -> AddReport {
        let _gate = self.inner.flush_gate.lock().expect("flush gate poisoned");
        let pending = self.inner.adds.drain();
        if pending.is_empty() {
            trace!("add flush: nothing pending");
            return AddReport::default();
        }

        let queued = pending.len();
        let report = self.inner.repo.apply_adds(pending);
        info!(
            queued,
            inserted = report.inserted,
            dropped = report.dropped,
            "add flush committed"
        );
        report
    }

    /// Replay all pending actions now, in arrival order.
    pub fn flush_actions(&self) -> ActionReport {
        let _gate = self.inner.flush_gate.lock().expect("flush gate poisoned");
        let batch = self.inner.actions.drain();
        if batch.is_empty() {
            trace!("action flush: nothing pending");
            return ActionReport::default();
        }

        let queued = batch.len();
        let report = self.inner.repo.apply_actions(batch);
        info!(
            queued,
            applied = report.applied,
            noop = report.noop,
            stale = report.stale,
            invalid = report.invalid,
            "action flush committed"
        );
        report
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn stats(&self) -> CatalogStats {
        let repo = &self.inner.repo;
        CatalogStats {
            total_items: repo.item_count(),
            selected_items: repo.selected_count(),
            pending_adds: self.inner.adds.len(),
            pending_actions: self.inner.actions.len(),
            revision: repo.revision(),
            last_add_flush: repo.last_add_flush(),
            last_action_flush: repo.last_action_flush(),
        }
    }

    /// Subscribe to the repository revision, bumped by every flush that
    /// changed state.
    pub fn revisions(&self) -> watch::Receiver<u64> {
        self.inner.repo.subscribe_revisions()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Run `flush` every `period` until the engine is cancelled. A flush runs
/// to completion before the next tick is awaited, so it never re-enters.
async fn flush_task(engine: Engine, period: Duration, label: &'static str, flush: fn(&Engine)) {
    let cancel = engine.inner.cancel.clone();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                trace!(flush = label, "flush tick");
                flush(&engine);
            }
        }
    }
    debug!(flush = label, "flush task stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn add_ack_mentions_the_flush_cadence() {
        let engine = Engine::new(EngineConfig {
            seed_count: 1,
            ..EngineConfig::default()
        });
        let ack = engine.add_item(5).unwrap();
        assert!(ack.message.unwrap().contains("~10s"));
    }

    #[test]
    fn zero_page_size_uses_configured_default() {
        let engine = Engine::new(EngineConfig {
            default_page_size: 4,
            ..EngineConfig::manual(10)
        });
        assert_eq!(engine.list_available(&PageRequest::new(1, 0, "")).len(), 4);
        assert_eq!(engine.list_available(&PageRequest::new(1, 7, "")).len(), 7);
    }

    #[test]
    fn stats_count_pending_work() {
        let engine = Engine::new(EngineConfig::manual(10));
        engine.add_item(11).unwrap();
        engine.select(1).unwrap();
        engine.modify("bogus", &Value::Null).unwrap();
        let stats = engine.stats();
        assert_eq!(stats.total_items, 10);
        assert_eq!(stats.pending_adds, 1);
        assert_eq!(stats.pending_actions, 2);
        assert_eq!(stats.revision, 0);
    }
}
