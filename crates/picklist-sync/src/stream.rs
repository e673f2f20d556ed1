// ── Displayed-list subscriptions ──
//
// Each list publishes its merged rendering through a watch channel; UIs
// hold a `DisplayStream` and redraw on change.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use picklist_core::Item;

use crate::reconcile::ListSide;

/// Shared snapshot of one displayed list.
pub type DisplayedList = Arc<Vec<Item>>;

/// A subscription to one list's displayed rendering.
pub struct DisplayStream {
    side: ListSide,
    current: DisplayedList,
    receiver: watch::Receiver<DisplayedList>,
}

impl DisplayStream {
    pub(crate) fn new(side: ListSide, receiver: watch::Receiver<DisplayedList>) -> Self {
        let current = receiver.borrow().clone();
        Self {
            side,
            current,
            receiver,
        }
    }

    pub fn side(&self) -> ListSide {
        self.side
    }

    /// Snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &DisplayedList {
        &self.current
    }

    /// Latest published snapshot.
    pub fn latest(&self) -> DisplayedList {
        self.receiver.borrow().clone()
    }

    /// Wait for the next re-render. `None` once the session is dropped.
    pub async fn changed(&mut self) -> Option<DisplayedList> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> DisplayWatchStream {
        DisplayWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding every re-rendered list.
pub struct DisplayWatchStream {
    inner: WatchStream<DisplayedList>,
}

impl Stream for DisplayWatchStream {
    type Item = DisplayedList;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
