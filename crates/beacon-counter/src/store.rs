use async_trait::async_trait;

use crate::error::Result;

/// Durable home of the event counter.
///
/// Callers serialize access themselves: a read followed by a write is not
/// atomic across concurrent callers.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current committed value.
    async fn read(&self) -> Result<u64>;

    /// Replace the committed value.
    async fn write(&self, value: u64) -> Result<()>;
}
