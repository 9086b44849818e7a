use std::sync::Arc;

use tracing::debug;

use super::registry::{DeliveryReport, SubscriptionRegistry};

/// Fan-out of counter values to every subscriber in the registry.
#[derive(Clone)]
pub struct EventBroadcaster {
    registry: Arc<SubscriptionRegistry>,
}

impl EventBroadcaster {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Push an event value to all current subscribers as its decimal text.
    /// Per-subscriber failures are absorbed by the registry.
    pub fn publish(&self, value: u64) -> DeliveryReport {
        let report = self.registry.broadcast(&value.to_string());
        debug!(value, delivered = report.delivered, "event published");
        report
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }
}
