//! Consume side of the change notifier.
//!
//! `ChangeListener` pulls deliveries off a subscription one at a time and
//! passes decoded changes to a [`FlagChangeHandler`]. With
//! [`AckMode::AfterHandle`] a delivery is acknowledged only once the handler
//! succeeds; failures are rejected and redelivered up to a limit. With
//! [`AckMode::Auto`] every delivery is acknowledged on receipt, so a crash or
//! handler failure loses the message.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use crate::adapters::messaging::decode_change;
use crate::domain::errors::NotificationError;
use crate::domain::models::{AckMode, FlagChange, NotificationConfig};
use crate::domain::ports::{ChangeSubscription, Delivery};

/// Pause after a transient subscription error before polling again.
const ERROR_PAUSE: Duration = Duration::from_millis(100);

/// Reacts to one flag change.
///
/// Under at-least-once delivery the same change may arrive more than once;
/// wrap non-idempotent handlers in [`IdempotentHandler`].
#[async_trait]
pub trait FlagChangeHandler: Send + Sync {
    async fn handle(&self, change: &FlagChange) -> anyhow::Result<()>;
}

/// Records receipt of each change and does nothing else.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    received: AtomicU64,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of changes seen so far.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlagChangeHandler for RecordingHandler {
    async fn handle(&self, change: &FlagChange) -> anyhow::Result<()> {
        self.received.fetch_add(1, Ordering::SeqCst);
        tracing::info!(event_id = %change.event_id, "Received a message: {}", change);
        Ok(())
    }
}

/// Runs the inner handler at most once per `event_id`.
///
/// Processed ids are remembered in a bounded TTL cache, so duplicates that
/// arrive after the id has been evicted are handled again.
pub struct IdempotentHandler<H> {
    inner: H,
    processed: Cache<Uuid, ()>,
}

impl<H: FlagChangeHandler> IdempotentHandler<H> {
    pub fn new(inner: H, capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            processed: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn from_config(inner: H, config: &NotificationConfig) -> Self {
        Self::new(
            inner,
            config.dedup_capacity,
            Duration::from_secs(config.dedup_ttl_secs),
        )
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

#[async_trait]
impl<H: FlagChangeHandler> FlagChangeHandler for IdempotentHandler<H> {
    async fn handle(&self, change: &FlagChange) -> anyhow::Result<()> {
        if self.processed.get(&change.event_id).await.is_some() {
            tracing::debug!(event_id = %change.event_id, "Skipping already processed change");
            return Ok(());
        }
        self.inner.handle(change).await?;
        self.processed.insert(change.event_id, ()).await;
        Ok(())
    }
}

#[async_trait]
impl<H: FlagChangeHandler + ?Sized> FlagChangeHandler for Arc<H> {
    async fn handle(&self, change: &FlagChange) -> anyhow::Result<()> {
        self.as_ref().handle(change).await
    }
}

/// Acknowledgement behaviour of a [`ChangeListener`].
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    pub ack_mode: AckMode,
    /// Redeliveries allowed after the first failed attempt
    pub max_redeliveries: u32,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self::from(&NotificationConfig::default())
    }
}

impl From<&NotificationConfig> for ListenerSettings {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            ack_mode: config.ack_mode,
            max_redeliveries: config.max_redeliveries,
        }
    }
}

/// What happened to the deliveries a listener saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Handler succeeded
    pub handled: u64,
    /// Handler failed under auto-ack; the message is gone
    pub failed: u64,
    /// Handler failed and the delivery was requeued
    pub requeued: u64,
    /// Handler kept failing past the redelivery limit
    pub dropped: u64,
    /// Payload could not be decoded
    pub discarded: u64,
    /// Messages the broker skipped because the listener lagged
    pub skipped: u64,
}

/// Long-running consumer loop for flag changes.
pub struct ChangeListener<S> {
    subscription: S,
    handler: Arc<dyn FlagChangeHandler>,
    settings: ListenerSettings,
    stats: ListenerStats,
}

impl<S: ChangeSubscription> ChangeListener<S> {
    pub fn new(
        subscription: S,
        handler: Arc<dyn FlagChangeHandler>,
        settings: ListenerSettings,
    ) -> Self {
        Self {
            subscription,
            handler,
            settings,
            stats: ListenerStats::default(),
        }
    }

    /// Consume until the subscription closes or `shutdown` turns true (or its
    /// sender is dropped).
    pub async fn listen(mut self, mut shutdown: watch::Receiver<bool>) -> ListenerStats {
        tracing::info!(ack_mode = ?self.settings.ack_mode, "Listening for flag changes");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let next = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                next = self.subscription.next() => next,
            };

            match next {
                Ok(Some(delivery)) => self.process(delivery).await,
                Ok(None) => {
                    tracing::info!("Flag change subscription closed");
                    break;
                }
                Err(NotificationError::Lagged(skipped)) => {
                    self.stats.skipped += skipped;
                    tracing::warn!(skipped, "Listener lagged behind, messages were skipped");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive flag change");
                    tokio::time::sleep(ERROR_PAUSE).await;
                }
            }
        }

        tracing::info!(
            handled = self.stats.handled,
            failed = self.stats.failed,
            dropped = self.stats.dropped,
            "Flag change listener stopped"
        );
        self.stats
    }

    async fn process(&mut self, delivery: Delivery) {
        let change = match decode_change(&delivery) {
            Ok(change) => change,
            Err(e) => {
                self.stats.discarded += 1;
                tracing::warn!(tag = delivery.tag, error = %e, "Discarding undecodable message");
                self.ack(&delivery).await;
                return;
            }
        };

        match self.settings.ack_mode {
            AckMode::Auto => {
                self.ack(&delivery).await;
                match self.handler.handle(&change).await {
                    Ok(()) => self.stats.handled += 1,
                    Err(e) => {
                        self.stats.failed += 1;
                        tracing::error!(
                            event_id = %change.event_id,
                            error = %e,
                            "Flag change handler failed; message already acknowledged"
                        );
                    }
                }
            }
            AckMode::AfterHandle => match self.handler.handle(&change).await {
                Ok(()) => {
                    self.stats.handled += 1;
                    self.ack(&delivery).await;
                }
                Err(e) if delivery.attempt <= self.settings.max_redeliveries => {
                    self.stats.requeued += 1;
                    tracing::warn!(
                        event_id = %change.event_id,
                        attempt = delivery.attempt,
                        error = %e,
                        "Flag change handler failed, requeueing"
                    );
                    if let Err(e) = self.subscription.nack(delivery).await {
                        tracing::error!(error = %e, "Failed to requeue flag change");
                    }
                }
                Err(e) => {
                    self.stats.dropped += 1;
                    tracing::error!(
                        event_id = %change.event_id,
                        attempt = delivery.attempt,
                        error = %e,
                        "Flag change handler kept failing, dropping message"
                    );
                    self.ack(&delivery).await;
                }
            },
        }
    }

    async fn ack(&mut self, delivery: &Delivery) {
        if let Err(e) = self.subscription.ack(delivery).await {
            tracing::warn!(tag = delivery.tag, error = %e, "Failed to acknowledge message");
        }
    }
}
