// ── Reactive device state ──
//
// Subscription type for consuming DeviceState changes without tying the
// consumer to any particular UI framework.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::DeviceState;

/// A subscription to one device's reconciled state.
///
/// Provides both point-in-time access and change notification via
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct DeviceStateStream {
    current: Arc<DeviceState>,
    receiver: watch::Receiver<Arc<DeviceState>>,
}

impl DeviceStateStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<DeviceState>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The state captured at creation time or at the last `changed()`.
    pub fn current(&self) -> &Arc<DeviceState> {
        &self.current
    }

    /// Wait for the next change, returning the new state.
    /// Returns `None` once the tracker has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<DeviceState>> {
        self.receiver.changed().await.ok()?;
        let state = self.receiver.borrow_and_update().clone();
        self.current = state.clone();
        Some(state)
    }

    /// Convert into a `Stream` yielding the current state, then every change.
    pub fn into_stream(self) -> DeviceStateWatchStream {
        DeviceStateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct DeviceStateWatchStream {
    inner: WatchStream<Arc<DeviceState>>,
}

impl Stream for DeviceStateWatchStream {
    type Item = Arc<DeviceState>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
