use async_trait::async_trait;

use crate::domain::errors::NotificationError;
use crate::domain::models::FlagChange;

/// Publish side of the change notifier.
///
/// One call is one send attempt to the configured topic. Retrying is the
/// caller's business.
#[async_trait]
pub trait ChangePublisher: Send + Sync {
    async fn publish(&self, change: &FlagChange) -> Result<(), NotificationError>;
}
