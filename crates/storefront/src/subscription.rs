//! Cancellable live subscriptions.
//!
//! A remote store produces a [`Feed`] of full snapshots for one path. A
//! consumer turns the feed into state updates with [`listen`], which spawns a
//! listener task and returns a [`SubscriptionHandle`]. Cancelling or dropping
//! the handle stops the listener, which drops the feed, which in turn stops
//! the producer. Nothing is delivered after cancellation.

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};

use crate::remote::RemoteError;

/// One emission of a watched path: the full value (or `None` when the path
/// is empty), or the error that ended the feed.
pub type SnapshotEvent = Result<Option<Value>, RemoteError>;

/// Receiving end of a snapshot stream.
#[derive(Debug)]
pub struct Feed {
    rx: mpsc::UnboundedReceiver<SnapshotEvent>,
    producer: Option<AbortHandle>,
}

/// Sending end of a snapshot stream, held by the producer task.
pub type FeedSender = mpsc::UnboundedSender<SnapshotEvent>;

impl Feed {
    /// Create a connected sender/feed pair.
    ///
    /// Attach the producer task with [`Feed::with_producer`] so it is aborted
    /// together with the feed.
    #[must_use]
    pub fn channel() -> (FeedSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx, producer: None })
    }

    /// Tie the lifetime of `producer` to this feed.
    #[must_use]
    pub fn with_producer(mut self, producer: &JoinHandle<()>) -> Self {
        self.producer = Some(producer.abort_handle());
        self
    }

    /// Wait for the next snapshot. Returns `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.rx.recv().await
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

/// Handle to a running listener task.
///
/// Dropping the handle cancels the subscription. Call [`detach`] to keep the
/// listener running for the lifetime of the process instead.
///
/// [`detach`]: SubscriptionHandle::detach
#[derive(Debug)]
#[must_use = "dropping a SubscriptionHandle cancels the subscription"]
pub struct SubscriptionHandle {
    task: Option<AbortHandle>,
}

impl SubscriptionHandle {
    /// Wrap a spawned listener task.
    pub fn from_task(task: &JoinHandle<()>) -> Self {
        Self {
            task: Some(task.abort_handle()),
        }
    }

    /// Stop delivery. Writes already in flight are not affected.
    pub fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether the listener task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Let the listener run until its feed ends.
    pub fn detach(mut self) {
        self.task = None;
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Deliver every event of `feed` to `on_event` on a spawned task.
///
/// `on_event` is the explicit state-update function of the consumer. The
/// task ends when the feed ends or the returned handle is cancelled.
pub fn listen<F>(mut feed: Feed, mut on_event: F) -> SubscriptionHandle
where
    F: FnMut(SnapshotEvent) + Send + 'static,
{
    let task = tokio::spawn(async move {
        while let Some(event) = feed.next().await {
            on_event(event);
        }
    });
    SubscriptionHandle::from_task(&task)
}
