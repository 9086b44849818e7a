//! Record-and-announce: bump the persisted counter, then broadcast it.

use beacon_counter::{CounterStore, PersistenceError};
use tokio::sync::Mutex;
use tracing::info;

use crate::sse::broadcast::EventBroadcaster;

pub struct EventPublisher {
    /// tokio::sync::Mutex because the store is awaited while the lock is held;
    /// read-increment-write-broadcast is one critical section.
    store: Mutex<Box<dyn CounterStore>>,
    broadcaster: EventBroadcaster,
}

impl EventPublisher {
    pub fn new(store: Box<dyn CounterStore>, broadcaster: EventBroadcaster) -> Self {
        Self {
            store: Mutex::new(store),
            broadcaster,
        }
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    /// Increment the counter, persist it, then broadcast the committed value.
    ///
    /// Broadcasting inside the lock keeps broadcast order identical to commit
    /// order. It never blocks: delivery is `try_send` per subscriber.
    pub async fn trigger(&self) -> Result<u64, PersistenceError> {
        let store = self.store.lock().await;

        let current = store.read().await?;
        let next = current.checked_add(1).ok_or(PersistenceError::Overflow)?;
        store.write(next).await?;

        let report = self.broadcaster.publish(next);
        info!(
            value = next,
            delivered = report.delivered,
            dropped = report.dropped,
            "event recorded"
        );
        Ok(next)
    }
}
