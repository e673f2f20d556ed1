// ── Sync session ──
//
// Drives the available and selected reconcilers against a backend:
// periodic polls refresh the authoritative windows, user actions apply
// optimistic marks, send the request, and roll back on failure.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use picklist_core::{Item, ItemId, PageRequest, Queued, is_last_page};

use crate::backend::CatalogBackend;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::reconcile::{ListReconciler, ListSide, Snapshot};
use crate::stream::{DisplayStream, DisplayedList};

// ── List state ──────────────────────────────────────────────────────

struct ListState {
    reconciler: ListReconciler,
    /// Bumped when the window identity changes (search, resync). Any
    /// response fetched under an older epoch is discarded.
    epoch: u64,
    /// Bumped by every poll start and every local mutation. A poll only
    /// applies if nothing newer happened while it was in flight.
    poll_seq: u64,
    display: watch::Sender<DisplayedList>,
}

impl ListState {
    fn new(side: ListSide) -> Self {
        let (display, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            reconciler: ListReconciler::new(side),
            epoch: 0,
            poll_seq: 0,
            display,
        }
    }

    fn publish(&self) {
        self.display
            .send_replace(Arc::new(self.reconciler.displayed().to_vec()));
    }

    /// Invalidate in-flight polls and re-render.
    fn touch(&mut self) {
        self.poll_seq += 1;
        self.publish();
    }
}

struct Lists {
    available: ListState,
    selected: ListState,
}

impl Lists {
    fn get(&self, side: ListSide) -> &ListState {
        match side {
            ListSide::Available => &self.available,
            ListSide::Selected => &self.selected,
        }
    }

    fn get_mut(&mut self, side: ListSide) -> &mut ListState {
        match side {
            ListSide::Available => &mut self.available,
            ListSide::Selected => &mut self.selected,
        }
    }
}

// ── SyncSession ─────────────────────────────────────────────────────

/// Client view of the catalog: two reconciled lists kept in step with a
/// [`CatalogBackend`].
///
/// Cheaply cloneable. Call [`start()`](Self::start) to launch the pollers
/// and [`shutdown()`](Self::shutdown) to tear them down; responses that
/// arrive after teardown are ignored.
pub struct SyncSession<B: CatalogBackend> {
    inner: Arc<SessionInner<B>>,
}

impl<B: CatalogBackend> Clone for SyncSession<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<B> {
    backend: B,
    config: SyncConfig,
    lists: Mutex<Lists>,
    cancel: CancellationToken,
    task_handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<B: CatalogBackend> SyncSession<B> {
    pub fn new(backend: B, config: SyncConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                backend,
                config,
                lists: Mutex::new(Lists {
                    available: ListState::new(ListSide::Available),
                    selected: ListState::new(ListSide::Selected),
                }),
                cancel: CancellationToken::new(),
                task_handles: tokio::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Spawn one poller per list. The first poll runs immediately.
    pub async fn start(&self) -> Result<(), SyncError> {
        self.ensure_open()?;
        let period = self.inner.config.poll_interval;
        if period.is_zero() {
            debug!("polling disabled; lists refresh on demand");
            return Ok(());
        }

        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            return Ok(());
        }
        for side in [ListSide::Available, ListSide::Selected] {
            handles.push(tokio::spawn(poll_task(self.clone(), side, period)));
        }
        info!(interval_ms = period.as_millis(), "sync session started");
        Ok(())
    }

    /// Stop polling. In-flight responses are discarded once this returns.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("sync session shut down");
    }

    pub fn is_open(&self) -> bool {
        !self.inner.cancel.is_cancelled()
    }

    fn ensure_open(&self) -> Result<(), SyncError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(SyncError::Closed)
        }
    }

    // ── Observation ─────────────────────────────────────────────────

    /// Current rendering of one list.
    pub fn displayed(&self, side: ListSide) -> DisplayedList {
        self.lock().get(side).display.borrow().clone()
    }

    pub fn subscribe(&self, side: ListSide) -> DisplayStream {
        DisplayStream::new(side, self.lock().get(side).display.subscribe())
    }

    /// Inspect a reconciler without holding the lock past the closure.
    pub fn with_list<R>(&self, side: ListSide, f: impl FnOnce(&ListReconciler) -> R) -> R {
        f(&self.lock().get(side).reconciler)
    }

    pub fn has_more(&self, side: ListSide) -> bool {
        self.with_list(side, ListReconciler::has_more)
    }

    // ── Polling ─────────────────────────────────────────────────────

    /// Re-fetch every loaded page of `side` and reconcile.
    pub async fn poll(&self, side: ListSide) -> Result<(), SyncError> {
        self.poll_pages(side, None).await
    }

    /// Refresh both lists.
    pub async fn poll_all(&self) -> Result<(), SyncError> {
        self.poll(ListSide::Available).await?;
        self.poll(ListSide::Selected).await
    }

    async fn poll_pages(&self, side: ListSide, limit: Option<usize>) -> Result<(), SyncError> {
        self.ensure_open()?;
        let (epoch, seq, pages, search) = {
            let mut lists = self.lock();
            let list = lists.get_mut(side);
            list.poll_seq += 1;
            let loaded = list.reconciler.pages_loaded().max(1);
            (
                list.epoch,
                list.poll_seq,
                limit.map_or(loaded, |l| l.min(loaded)),
                list.reconciler.search().to_owned(),
            )
        };

        let page_size = self.page_size();
        let mut snapshot = Snapshot {
            has_more: true,
            ..Snapshot::default()
        };
        for page in 1..=pages {
            let batch = self
                .fetch(side, PageRequest::new(page, page_size, search.as_str()))
                .await?;
            let last = is_last_page(batch.len(), page_size);
            snapshot.items.extend(batch);
            snapshot.pages = page;
            if last {
                snapshot.has_more = false;
                break;
            }
        }

        let mut lists = self.lock();
        let list = lists.get_mut(side);
        if !self.is_open() || list.epoch != epoch || list.poll_seq != seq {
            debug!(%side, "discarding stale poll response");
            return Ok(());
        }
        trace!(%side, items = snapshot.items.len(), pages = snapshot.pages, "poll applied");
        list.reconciler.apply_snapshot(snapshot);
        list.publish();
        Ok(())
    }

    /// Fetch the next page of `side`. Returns `false` when the list is
    /// exhausted or the response went stale.
    pub async fn load_more(&self, side: ListSide) -> Result<bool, SyncError> {
        self.ensure_open()?;
        let (epoch, page, search) = {
            let lists = self.lock();
            let list = lists.get(side);
            if !list.reconciler.has_more() {
                return Ok(false);
            }
            (
                list.epoch,
                list.reconciler.pages_loaded() + 1,
                list.reconciler.search().to_owned(),
            )
        };

        let page_size = self.page_size();
        let batch = self
            .fetch(side, PageRequest::new(page, page_size, search))
            .await?;
        let has_more = !is_last_page(batch.len(), page_size);

        let mut lists = self.lock();
        let list = lists.get_mut(side);
        if !self.is_open() || list.epoch != epoch || list.reconciler.pages_loaded() + 1 != page {
            debug!(%side, page, "discarding stale page");
            return Ok(false);
        }
        debug!(%side, page, returned = batch.len(), "page loaded");
        list.reconciler.append_page(batch, has_more);
        list.touch();
        Ok(true)
    }

    /// Change the search filter of `side` and reload its first page.
    pub async fn set_search(&self, side: ListSide, search: &str) -> Result<(), SyncError> {
        self.ensure_open()?;
        {
            let mut lists = self.lock();
            let list = lists.get_mut(side);
            list.reconciler.set_search(search);
            list.epoch += 1;
            list.touch();
        }
        debug!(%side, search, "search changed");
        self.poll(side).await
    }

    /// Drop the order overlay and any partial window state of `side`,
    /// then re-read its first page from the backend.
    pub async fn resync(&self, side: ListSide) -> Result<(), SyncError> {
        {
            let mut lists = self.lock();
            let list = lists.get_mut(side);
            list.reconciler.clear_overlay();
            list.epoch += 1;
            list.touch();
        }
        self.poll_pages(side, Some(1)).await
    }

    async fn resync_all(&self) {
        for side in [ListSide::Available, ListSide::Selected] {
            if let Err(e) = self.resync(side).await {
                warn!(%side, error = %e, "resync failed");
            }
        }
    }

    async fn fetch(&self, side: ListSide, req: PageRequest) -> Result<Vec<Item>, SyncError> {
        match side {
            ListSide::Available => self.inner.backend.list_available(req).await,
            ListSide::Selected => self.inner.backend.list_selected(req).await,
        }
    }

    // ── User actions ────────────────────────────────────────────────

    /// Move `id` from available to selected.
    pub async fn select(&self, id: &ItemId) -> Result<Queued, SyncError> {
        self.transfer(id, ListSide::Available).await
    }

    /// Move `id` from selected back to available.
    pub async fn unselect(&self, id: &ItemId) -> Result<Queued, SyncError> {
        self.transfer(id, ListSide::Selected).await
    }

    async fn transfer(&self, id: &ItemId, from: ListSide) -> Result<Queued, SyncError> {
        self.ensure_open()?;
        let to = from.opposite();
        let (from_marks, to_marks) = {
            let mut lists = self.lock();
            let marks = (
                lists.get(from).reconciler.marks(id),
                lists.get(to).reconciler.marks(id),
            );
            let item = lists
                .get_mut(from)
                .reconciler
                .mark_removed(id)
                .unwrap_or_else(|| Item::named(id.clone()));
            lists.get_mut(to).reconciler.mark_added(item);
            lists.get_mut(from).touch();
            lists.get_mut(to).touch();
            marks
        };

        let sent = match from {
            ListSide::Available => self.inner.backend.select(id.clone()).await,
            ListSide::Selected => self.inner.backend.unselect(id.clone()).await,
        };
        match sent {
            Ok(ack) => {
                debug!(%id, %from, %to, "move queued");
                Ok(ack)
            }
            Err(e) => {
                warn!(%id, %from, error = %e, "move rejected, rolling back");
                {
                    let mut lists = self.lock();
                    lists.get_mut(from).reconciler.restore_marks(id, from_marks);
                    lists.get_mut(to).reconciler.restore_marks(id, to_marks);
                    lists.get_mut(from).touch();
                    lists.get_mut(to).touch();
                }
                self.resync_all().await;
                Err(e)
            }
        }
    }

    /// Drag the selected entry at display index `from` to index `to` and
    /// send the resulting order.
    pub async fn move_selected(&self, from: usize, to: usize) -> Result<Queued, SyncError> {
        self.ensure_open()?;
        let order = {
            let mut lists = self.lock();
            let list = lists.get_mut(ListSide::Selected);
            let len = list.reconciler.displayed().len();
            let order = list
                .reconciler
                .move_item(from, to)
                .ok_or(SyncError::InvalidMove { from, to, len })?;
            list.touch();
            order
        };

        match self.inner.backend.reorder(order).await {
            Ok(ack) => Ok(ack),
            Err(e) => {
                warn!(from, to, error = %e, "reorder rejected, rolling back");
                {
                    let mut lists = self.lock();
                    let list = lists.get_mut(ListSide::Selected);
                    list.reconciler.clear_overlay();
                    list.touch();
                }
                if let Err(resync) = self.resync(ListSide::Selected).await {
                    warn!(error = %resync, "resync failed");
                }
                Err(e)
            }
        }
    }

    /// Request a new item. It is not shown optimistically: the add flush
    /// can take several seconds and may still drop the id.
    pub async fn add_item(&self, id: ItemId) -> Result<Queued, SyncError> {
        self.ensure_open()?;
        self.inner.backend.add_item(id).await
    }

    /// The configured page size, capped at what the backend serves. The
    /// short-page rule only holds against the size actually applied.
    fn page_size(&self) -> usize {
        let wanted = self.inner.config.page_size.max(1);
        self.inner
            .backend
            .max_page_size()
            .map_or(wanted, |cap| wanted.min(cap.max(1)))
    }

    fn lock(&self) -> MutexGuard<'_, Lists> {
        self.inner.lists.lock().expect("session lists lock poisoned")
    }
}

// ── Background tasks ────────────────────────────────────────────────

async fn poll_task<B: CatalogBackend>(session: SyncSession<B>, side: ListSide, period: Duration) {
    let cancel = session.inner.cancel.clone();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = session.poll(side).await {
                    warn!(%side, error = %e, "periodic poll failed");
                }
            }
        }
    }
    debug!(%side, "poller stopped");
}
