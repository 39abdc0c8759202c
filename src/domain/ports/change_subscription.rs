use async_trait::async_trait;

use crate::domain::errors::NotificationError;

/// A message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Broker-assigned tag, unique per subscription
    pub tag: u64,
    pub content_type: String,
    pub payload: Vec<u8>,
    /// 1 on first delivery, incremented on each redelivery
    pub attempt: u32,
}

impl Delivery {
    pub const fn is_redelivery(&self) -> bool {
        self.attempt > 1
    }
}

/// Consume side of the change notifier.
#[async_trait]
pub trait ChangeSubscription: Send {
    /// Wait for the next delivery. `Ok(None)` means the subscription is closed.
    ///
    /// Errors are transient; the caller may keep calling `next` afterwards.
    async fn next(&mut self) -> Result<Option<Delivery>, NotificationError>;

    /// Confirm the delivery was processed.
    async fn ack(&mut self, delivery: &Delivery) -> Result<(), NotificationError>;

    /// Reject the delivery so that it is delivered again.
    async fn nack(&mut self, delivery: Delivery) -> Result<(), NotificationError>;
}
