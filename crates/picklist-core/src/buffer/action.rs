use std::sync::{Mutex, MutexGuard};

use crate::model::QueuedAction;

/// FIFO of pending selection mutations. No deduplication: replaying in
/// arrival order gives last-writer-wins.
#[derive(Default)]
pub struct ActionBuffer {
    queue: Mutex<Vec<QueuedAction>>,
}

impl ActionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enqueue(&self, action: QueuedAction) {
        self.lock().push(action);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Swap the queue with an empty one and return the old contents.
    pub(crate) fn drain(&self) -> Vec<QueuedAction> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<QueuedAction>> {
        self.queue.lock().expect("action buffer lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, ItemId};

    #[test]
    fn drain_preserves_arrival_order() {
        let buffer = ActionBuffer::new();
        buffer.enqueue(QueuedAction::Valid(Action::Select(ItemId::from(2))));
        buffer.enqueue(QueuedAction::Valid(Action::Unselect(ItemId::from(2))));
        let drained = buffer.drain();
        assert!(matches!(drained.first(), Some(QueuedAction::Valid(Action::Select(_)))));
        assert!(matches!(drained.get(1), Some(QueuedAction::Valid(Action::Unselect(_)))));
        assert!(buffer.is_empty());
    }
}
