//! Hand-off of flag changes from the write path to the change publisher.
//!
//! Two delivery modes exist. `Strict` publishes inline, so a failed publish
//! fails the write that triggered it. `Deferred` queues the change for a
//! background worker that retries with exponential backoff; publish problems
//! then only show up in logs and in the worker's statistics.

use backoff::ExponentialBackoffBuilder;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::domain::errors::NotificationError;
use crate::domain::models::{FlagChange, NotificationConfig};
use crate::domain::ports::ChangePublisher;

/// Queue capacity used when none is configured.
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Backoff schedule for deferred delivery.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Total time spent on one change before it is abandoned
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&NotificationConfig::default())
    }
}

impl From<&NotificationConfig> for RetryPolicy {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            initial_interval: Duration::from_millis(config.initial_backoff_ms),
            max_interval: Duration::from_millis(config.max_backoff_ms),
            max_elapsed: Duration::from_millis(config.max_elapsed_ms),
        }
    }
}

/// Counters reported by a deferred worker when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub abandoned: u64,
}

#[derive(Clone)]
enum Mode {
    Strict {
        publisher: Arc<dyn ChangePublisher>,
        publish_timeout: Duration,
    },
    Deferred {
        queue: mpsc::Sender<FlagChange>,
        enqueue_timeout: Duration,
    },
}

/// Routes flag changes to a publisher according to the delivery mode.
#[derive(Clone)]
pub struct NotificationDispatcher {
    mode: Mode,
}

impl NotificationDispatcher {
    /// Publish inline, one attempt bounded by `publish_timeout`.
    pub fn strict(publisher: Arc<dyn ChangePublisher>, publish_timeout: Duration) -> Self {
        Self {
            mode: Mode::Strict {
                publisher,
                publish_timeout,
            },
        }
    }

    /// Queue changes for a background worker.
    ///
    /// Must be called from within a tokio runtime. The worker stops once
    /// every clone of the returned dispatcher has been dropped and the queue
    /// is drained.
    pub fn deferred(
        publisher: Arc<dyn ChangePublisher>,
        policy: RetryPolicy,
        publish_timeout: Duration,
    ) -> (Self, DispatchWorker) {
        Self::deferred_with_capacity(publisher, policy, publish_timeout, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn deferred_with_capacity(
        publisher: Arc<dyn ChangePublisher>,
        policy: RetryPolicy,
        publish_timeout: Duration,
        capacity: usize,
    ) -> (Self, DispatchWorker) {
        let (queue, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(receiver, publisher, policy, publish_timeout));
        let dispatcher = Self {
            mode: Mode::Deferred {
                queue,
                enqueue_timeout: publish_timeout,
            },
        };
        (dispatcher, DispatchWorker { handle })
    }

    pub const fn is_strict(&self) -> bool {
        matches!(self.mode, Mode::Strict { .. })
    }

    /// Hand `change` to the publisher.
    ///
    /// Only strict mode ever returns an error. In deferred mode a full or
    /// stopped queue is logged and the change is dropped.
    pub async fn dispatch(&self, change: FlagChange) -> Result<(), NotificationError> {
        match &self.mode {
            Mode::Strict {
                publisher,
                publish_timeout,
            } => publish_once(publisher.as_ref(), &change, *publish_timeout).await,
            Mode::Deferred {
                queue,
                enqueue_timeout,
            } => {
                match queue.send_timeout(change, *enqueue_timeout).await {
                    Ok(()) => {}
                    Err(mpsc::error::SendTimeoutError::Timeout(change)) => {
                        tracing::error!(
                            flag_id = change.flag_id,
                            action = %change.action,
                            "Notification queue full, dropping change"
                        );
                    }
                    Err(mpsc::error::SendTimeoutError::Closed(change)) => {
                        tracing::error!(
                            flag_id = change.flag_id,
                            action = %change.action,
                            "Notification worker stopped, dropping change"
                        );
                    }
                }
                Ok(())
            }
        }
    }
}

/// Handle to the background task of a deferred dispatcher.
pub struct DispatchWorker {
    handle: JoinHandle<DispatchStats>,
}

impl DispatchWorker {
    /// Wait for the worker to drain its queue and stop.
    pub async fn join(self) -> DispatchStats {
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "Notification worker terminated abnormally");
                DispatchStats::default()
            }
        }
    }
}

async fn publish_once(
    publisher: &dyn ChangePublisher,
    change: &FlagChange,
    publish_timeout: Duration,
) -> Result<(), NotificationError> {
    match timeout(publish_timeout, publisher.publish(change)).await {
        Ok(result) => result,
        Err(_) => Err(NotificationError::Timeout),
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<FlagChange>,
    publisher: Arc<dyn ChangePublisher>,
    policy: RetryPolicy,
    publish_timeout: Duration,
) -> DispatchStats {
    let mut stats = DispatchStats::default();

    while let Some(change) = receiver.recv().await {
        match publish_with_retry(publisher.as_ref(), &change, &policy, publish_timeout).await {
            Ok(()) => stats.delivered += 1,
            Err(e) => {
                stats.abandoned += 1;
                tracing::error!(
                    flag_id = change.flag_id,
                    action = %change.action,
                    event_id = %change.event_id,
                    error = %e,
                    "Giving up on flag change notification"
                );
            }
        }
    }

    tracing::debug!(
        delivered = stats.delivered,
        abandoned = stats.abandoned,
        "Notification worker stopped"
    );
    stats
}

async fn publish_with_retry(
    publisher: &dyn ChangePublisher,
    change: &FlagChange,
    policy: &RetryPolicy,
    publish_timeout: Duration,
) -> Result<(), NotificationError> {
    let schedule = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_interval)
        .with_max_interval(policy.max_interval)
        .with_max_elapsed_time(Some(policy.max_elapsed))
        .build();

    backoff::future::retry_notify(
        schedule,
        || async move {
            publish_once(publisher, change, publish_timeout)
                .await
                .map_err(|e| match e {
                    // A closed channel will not reopen.
                    NotificationError::Closed => backoff::Error::permanent(e),
                    other => backoff::Error::transient(other),
                })
        },
        |e: NotificationError, wait: Duration| {
            tracing::warn!(
                flag_id = change.flag_id,
                error = %e,
                retry_in_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "Failed to publish flag change, retrying"
            );
        },
    )
    .await
}
