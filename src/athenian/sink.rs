use async_trait::async_trait;

use crate::error::Result;
use crate::models::Release;

/// Destination for batches of release events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseSink: Send + Sync {
    async fn submit(&self, batch: &[Release]) -> Result<()>;
}
