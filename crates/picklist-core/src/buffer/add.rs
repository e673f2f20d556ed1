use std::sync::{Mutex, MutexGuard};

use indexmap::IndexMap;

use crate::error::{CoreError, DuplicateReason};
use crate::model::{Item, ItemId};
use crate::store::Repository;

/// Pending insertions, deduplicated by id and kept in arrival order.
#[derive(Default)]
pub struct AddBuffer {
    pending: Mutex<IndexMap<ItemId, Item>>,
}

impl AddBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `item` unless its id is already known or already pending.
    ///
    /// An id that becomes known between this check and the flush is
    /// resolved by the flush, not here.
    pub fn enqueue(&self, repo: &Repository, item: Item) -> Result<(), CoreError> {
        if repo.contains(&item.id) {
            return Err(CoreError::Duplicate {
                id: item.id,
                reason: DuplicateReason::AlreadyExists,
            });
        }

        let mut pending = self.lock();
        if pending.contains_key(&item.id) {
            return Err(CoreError::Duplicate {
                id: item.id,
                reason: DuplicateReason::AlreadyQueued,
            });
        }
        pending.insert(item.id.clone(), item);
        Ok(())
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take everything queued so far, leaving the buffer empty.
    pub(crate) fn drain(&self) -> IndexMap<ItemId, Item> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<ItemId, Item>> {
        self.pending.lock().expect("add buffer lock poisoned")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_known_ids() {
        let repo = Repository::seeded(5);
        let buffer = AddBuffer::new();
        let err = buffer.enqueue(&repo, Item::named(ItemId::from(3))).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Duplicate {
                reason: DuplicateReason::AlreadyExists,
                ..
            }
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn rejects_ids_already_queued() {
        let repo = Repository::seeded(5);
        let buffer = AddBuffer::new();
        buffer.enqueue(&repo, Item::named(ItemId::from(42))).unwrap();
        let err = buffer.enqueue(&repo, Item::named(ItemId::from("42"))).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Duplicate {
                reason: DuplicateReason::AlreadyQueued,
                ..
            }
        ));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn drain_empties_the_buffer() {
        let repo = Repository::seeded(1);
        let buffer = AddBuffer::new();
        buffer.enqueue(&repo, Item::named(ItemId::from("b"))).unwrap();
        buffer.enqueue(&repo, Item::named(ItemId::from("a"))).unwrap();
        let drained: Vec<_> = buffer.drain().into_keys().collect();
        assert_eq!(drained, vec![ItemId::from("b"), ItemId::from("a")]);
        assert!(buffer.is_empty());
    }
}
