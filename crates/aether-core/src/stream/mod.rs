// ── Reactive subscriptions ──
//
// Consumer handle on one published view of the DataStore.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A subscription to one view of the reconciled state.
///
/// Provides point-in-time access and change notification, either via
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct Subscription<T: Clone + Send + Sync + 'static> {
    current: T,
    receiver: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    pub(crate) fn new(mut receiver: watch::Receiver<T>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The value as of creation or the last [`changed`](Self::changed).
    pub fn current(&self) -> &T {
        &self.current
    }

    /// The latest published value.
    pub fn latest(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Whether a value newer than [`current`](Self::current) is waiting.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next change, returning the new value.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        let value = self.receiver.borrow_and_update().clone();
        self.current = value.clone();
        Some(value)
    }

    /// Convert into a `Stream` that yields the current value first, then
    /// every change.
    pub fn into_stream(self) -> SubscriptionStream<T> {
        SubscriptionStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SubscriptionStream<T: Clone + Send + Sync + 'static> {
    inner: WatchStream<T>,
}

impl<T: Clone + Send + Sync + 'static> Stream for SubscriptionStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn changed_tracks_latest_value() {
        let (tx, rx) = watch::channel(1_u32);
        let mut sub = Subscription::new(rx);
        assert_eq!(*sub.current(), 1);

        tx.send_replace(2);
        assert!(sub.has_changed());
        assert_eq!(sub.changed().await, Some(2));
        assert_eq!(*sub.current(), 2);
        assert!(!sub.has_changed());

        drop(tx);
        assert_eq!(sub.changed().await, None);
    }

    #[tokio::test]
    async fn stream_yields_current_then_changes() {
        let (tx, rx) = watch::channel("a".to_string());
        let mut stream = Subscription::new(rx).into_stream();

        assert_eq!(stream.next().await.unwrap(), "a");
        tx.send_replace("b".into());
        assert_eq!(stream.next().await.unwrap(), "b");
    }
}
