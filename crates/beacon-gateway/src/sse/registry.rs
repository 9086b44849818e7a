//! Subscription registry: who is listening, and how to reach them.
//!
//! One mutex guards the identity counter and the subscriber map. Delivery
//! never happens under that lock: `broadcast` copies the senders out first,
//! then pushes with `try_send` so a stalled subscriber cannot hold anyone up.
//!
//! Backpressure: every subscriber gets a bounded queue. When it is full the
//! message is dropped for that subscriber only; the subscriber stays
//! registered and picks up again with the next message once it drains.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Process-unique subscriber identity. Never reused within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client{}", self.0)
    }
}

/// Why a single subscriber missed a broadcast. Logged, never propagated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("queue for {0} is full, message dropped")]
    Full(SubscriberId),

    #[error("queue for {0} is closed")]
    Closed(SubscriberId),
}

/// Outcome of one broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers that accepted the message.
    pub delivered: usize,
    /// Subscribers whose queue was full.
    pub dropped: usize,
    /// Subscribers whose receiver was already gone; pruned from the registry.
    pub departed: usize,
}

struct Inner {
    next_id: u64,
    /// Set by `close_all`; later registrations get an already-closed queue.
    closed: bool,
    subscribers: HashMap<SubscriberId, mpsc::Sender<String>>,
}

pub struct SubscriptionRegistry {
    inner: Mutex<Inner>,
    capacity: usize,
    dropped_total: AtomicU64,
}

impl SubscriptionRegistry {
    /// `capacity` is the per-subscriber queue size; clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 0,
                closed: false,
                subscribers: HashMap::new(),
            }),
            capacity: capacity.max(1),
            dropped_total: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate an identity and a fresh queue, and start tracking them.
    ///
    /// The returned [`Subscription`] unregisters itself when dropped. After
    /// [`close_all`](Self::close_all) the subscription is not tracked and its
    /// queue is closed from the start, so its stream ends immediately.
    pub fn register(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let (id, count) = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = SubscriberId(inner.next_id);
            if inner.closed {
                drop(tx);
                (id, None)
            } else {
                inner.subscribers.insert(id, tx);
                (id, Some(inner.subscribers.len()))
            }
        };
        match count {
            Some(count) => info!(subscriber = %id, subscribers = count, "subscriber connected"),
            None => debug!(subscriber = %id, "registry closed, subscriber rejected"),
        }

        Subscription {
            id,
            rx,
            registry: Arc::clone(self),
        }
    }

    /// Stop tracking `id` and close its queue. Unknown ids are ignored.
    ///
    /// Returns whether an entry was removed.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let (removed, count) = {
            let mut inner = self.lock();
            let removed = inner.subscribers.remove(&id);
            (removed, inner.subscribers.len())
        };
        // The registry holds the only long-lived sender, so dropping it here
        // closes the queue once any in-flight broadcast snapshot is released.
        match removed {
            Some(_) => {
                info!(subscriber = %id, subscribers = count, "subscriber disconnected");
                true
            }
            None => {
                debug!(subscriber = %id, "unregister of unknown subscriber ignored");
                false
            }
        }
    }

    /// Deliver `message` to every subscriber present when the snapshot is taken.
    pub fn broadcast(&self, message: &str) -> DeliveryReport {
        let snapshot: Vec<(SubscriberId, mpsc::Sender<String>)> = self
            .lock()
            .subscribers
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut report = DeliveryReport::default();
        let mut departed = Vec::new();
        for (id, tx) in &snapshot {
            match deliver(*id, tx, message) {
                Ok(()) => report.delivered += 1,
                Err(e @ DeliveryError::Full(_)) => {
                    warn!(subscriber = %id, error = %e, "subscriber lagging");
                    report.dropped += 1;
                }
                Err(e @ DeliveryError::Closed(_)) => {
                    debug!(subscriber = %id, error = %e, "subscriber already gone");
                    departed.push(*id);
                }
            }
        }
        drop(snapshot);

        report.departed = departed.len();
        for id in departed {
            self.unregister(id);
        }
        if report.dropped > 0 {
            self.dropped_total
                .fetch_add(report.dropped as u64, Ordering::Relaxed);
        }

        debug!(
            delivered = report.delivered,
            dropped = report.dropped,
            departed = report.departed,
            "broadcast complete"
        );
        report
    }

    /// Remove every subscriber, closing all queues, and refuse new ones. Used
    /// on shutdown so each open stream ends and the server can drain.
    pub fn close_all(&self) -> usize {
        let drained = {
            let mut inner = self.lock();
            inner.closed = true;
            std::mem::take(&mut inner.subscribers)
        };
        let count = drained.len();
        drop(drained);
        info!(closed = count, "all subscribers closed");
        count
    }

    pub fn len(&self) -> usize {
        self.lock().subscribers.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.lock().subscribers.contains_key(&id)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Messages dropped across all subscribers since startup.
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }
}

fn deliver(
    id: SubscriberId,
    tx: &mpsc::Sender<String>,
    message: &str,
) -> Result<(), DeliveryError> {
    tx.try_send(message.to_string()).map_err(|e| match e {
        TrySendError::Full(_) => DeliveryError::Full(id),
        TrySendError::Closed(_) => DeliveryError::Closed(id),
    })
}

/// A registered subscriber: its identity plus the receiving end of its queue.
///
/// Dropping it unregisters the identity, whichever way the owning stream
/// ended (channel closed, write failure, client gone, shutdown).
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<String>,
    registry: Arc<SubscriptionRegistry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next queued message, or `None` once the registry has let go of us.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv); `None` when nothing is queued.
    #[cfg(test)]
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
