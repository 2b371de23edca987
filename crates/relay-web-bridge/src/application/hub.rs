//! Fan-out of daemon messages to independently paced subscribers.
//!
//! Each subscriber owns an unbounded queue, so a slow SSE client never holds
//! up the daemon link or the other clients.  The subscriber set sits behind a
//! mutex that is held only to insert, remove or snapshot; messages are
//! enqueued after the lock is released.
//!
//! # Membership and ordering
//!
//! A broadcast reaches every subscriber present when the snapshot is taken.
//! A subscriber that joins afterwards misses it; one that leaves concurrently
//! may still receive it (its queue is simply dropped unread).  Each
//! subscriber sees messages in broadcast order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use relay_core::protocol::summarize;
use relay_core::{Message, MessageSink};

/// One registered subscriber, as seen by the hub.
struct Subscriber {
    sender: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
}

struct HubInner {
    subscribers: Mutex<HashMap<Uuid, Subscriber>>,
    /// Parent of every subscriber token; cancelled by [`BroadcastHub::shutdown`].
    shutdown: CancellationToken,
}

/// Shared subscriber set.  Cloning yields another handle to the same hub.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Registers a new subscriber.
    ///
    /// After [`shutdown`](Self::shutdown) the returned subscription is
    /// already cancelled and never registered.
    pub fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = self.inner.shutdown.child_token();

        if !cancel.is_cancelled() {
            self.lock().insert(
                id,
                Subscriber {
                    sender,
                    cancel: cancel.clone(),
                },
            );
            debug!(subscriber = %id, "SSE subscriber added");
        }

        Subscription {
            id,
            receiver,
            cancel,
            hub: self.clone(),
        }
    }

    /// Removes a subscriber and cancels it.  Unknown ids are ignored, so this
    /// is safe to call more than once.
    pub fn unsubscribe(&self, id: Uuid) {
        let removed = self.lock().remove(&id);
        if let Some(subscriber) = removed {
            subscriber.cancel.cancel();
            debug!(subscriber = %id, "SSE subscriber removed");
        }
    }

    /// Enqueues `message` for every current subscriber and returns how many
    /// queues accepted it.
    pub fn broadcast(&self, message: &Message) -> usize {
        let targets: Vec<mpsc::UnboundedSender<Message>> =
            self.lock().values().map(|s| s.sender.clone()).collect();

        let delivered = targets
            .iter()
            .filter(|sender| sender.send(message.clone()).is_ok())
            .count();

        debug!(
            subscribers = targets.len(),
            delivered,
            "broadcast {}",
            summarize(message)
        );
        delivered
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Cancels every subscriber and refuses new ones.  Open SSE streams end.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let drained = {
            let mut subscribers = self.lock();
            let count = subscribers.len();
            subscribers.clear();
            count
        };
        info!(subscribers = drained, "broadcast hub shut down");
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Subscriber>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Daemon messages arriving on the persistent link go to every subscriber.
impl MessageSink for BroadcastHub {
    fn deliver(&self, message: &Message) {
        self.broadcast(message);
    }
}

/// A single subscriber's end of the hub.
///
/// Dropping it unsubscribes, so an SSE response that is torn down (client
/// gone) leaves no entry behind.
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
    hub: BroadcastHub,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Waits for the next message.  Returns `None` once the subscription is
    /// cancelled (unsubscribed or hub shut down).
    pub async fn next(&mut self) -> Option<Message> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            message = self.receiver.recv() => message,
        }
    }

    /// Token cancelled when this subscription ends.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
        self.cancel.cancel();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
