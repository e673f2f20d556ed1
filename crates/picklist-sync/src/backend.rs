// ── Engine access seam ──
//
// The session only needs the six catalog operations. `Engine` implements
// them in-process; a networked client would implement them over its
// transport and map failures to `SyncError::Transport`.

use std::future::Future;

use picklist_core::{Engine, Item, ItemId, PageRequest, Queued};

use crate::error::SyncError;

pub trait CatalogBackend: Send + Sync + 'static {
    fn list_available(
        &self,
        req: PageRequest,
    ) -> impl Future<Output = Result<Vec<Item>, SyncError>> + Send;

    fn list_selected(
        &self,
        req: PageRequest,
    ) -> impl Future<Output = Result<Vec<Item>, SyncError>> + Send;

    fn add_item(&self, id: ItemId) -> impl Future<Output = Result<Queued, SyncError>> + Send;

    fn select(&self, id: ItemId) -> impl Future<Output = Result<Queued, SyncError>> + Send;

    fn unselect(&self, id: ItemId) -> impl Future<Output = Result<Queued, SyncError>> + Send;

    fn reorder(&self, ids: Vec<ItemId>) -> impl Future<Output = Result<Queued, SyncError>> + Send;

    /// Largest page the backend serves. Requests above it are clamped.
    fn max_page_size(&self) -> Option<usize> {
        None
    }
}

impl CatalogBackend for Engine {
    async fn list_available(&self, req: PageRequest) -> Result<Vec<Item>, SyncError> {
        Ok(Engine::list_available(self, &req))
    }

    async fn list_selected(&self, req: PageRequest) -> Result<Vec<Item>, SyncError> {
        Ok(Engine::list_selected(self, &req))
    }

    async fn add_item(&self, id: ItemId) -> Result<Queued, SyncError> {
        Ok(Engine::add_item(self, id)?)
    }

    async fn select(&self, id: ItemId) -> Result<Queued, SyncError> {
        Ok(Engine::select(self, id)?)
    }

    async fn unselect(&self, id: ItemId) -> Result<Queued, SyncError> {
        Ok(Engine::unselect(self, id)?)
    }

    async fn reorder(&self, ids: Vec<ItemId>) -> Result<Queued, SyncError> {
        Ok(Engine::reorder(self, ids)?)
    }

    fn max_page_size(&self) -> Option<usize> {
        Some(self.config().max_page_size)
    }
}
