//! In-process message broker with named topics.
//!
//! Every subscriber of a topic receives its own copy of each message published
//! after it subscribed. Messages published to a topic without subscribers are
//! dropped. Redelivery of rejected messages is handled per subscription.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

use super::{decode_change, encode_change, CONTENT_TYPE_JSON};
use crate::domain::errors::NotificationError;
use crate::domain::models::FlagChange;
use crate::domain::ports::{ChangePublisher, ChangeSubscription, Delivery};

/// Default per-topic channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct BrokerMessage {
    content_type: String,
    payload: Arc<[u8]>,
}

struct BrokerInner {
    topics: Mutex<HashMap<String, broadcast::Sender<BrokerMessage>>>,
    capacity: usize,
    closed: AtomicBool,
}

/// Cheaply cloneable handle to a shared broker.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<BrokerInner>,
}

impl InMemoryBroker {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                topics: Mutex::new(HashMap::new()),
                capacity: capacity.max(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<BrokerMessage> {
        let mut topics = self.inner.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .clone()
    }

    /// Send raw bytes to `topic`, returning how many subscribers received them.
    pub fn publish_raw(
        &self,
        topic: &str,
        content_type: &str,
        payload: Vec<u8>,
    ) -> Result<usize, NotificationError> {
        if self.is_closed() {
            return Err(NotificationError::Closed);
        }
        let message = BrokerMessage {
            content_type: content_type.to_string(),
            payload: payload.into(),
        };
        // A send error only means nobody is subscribed right now.
        Ok(self.sender(topic).send(message).unwrap_or(0))
    }

    pub fn publisher(&self, topic: impl Into<String>) -> BrokerPublisher {
        BrokerPublisher {
            broker: self.clone(),
            topic: topic.into(),
        }
    }

    pub fn subscribe(&self, topic: &str) -> BrokerSubscription {
        BrokerSubscription {
            receiver: self.sender(topic).subscribe(),
            redeliveries: VecDeque::new(),
            next_tag: 1,
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        let topics = self.inner.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics.get(topic).map_or(0, broadcast::Sender::receiver_count)
    }

    /// Stop accepting messages. Subscriptions drain what they already hold
    /// and then report closed.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Publishes flag changes as JSON to a single topic.
#[derive(Clone)]
pub struct BrokerPublisher {
    broker: InMemoryBroker,
    topic: String,
}

impl BrokerPublisher {
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl ChangePublisher for BrokerPublisher {
    async fn publish(&self, change: &FlagChange) -> Result<(), NotificationError> {
        let payload = encode_change(change)?;
        let receivers = self.broker.publish_raw(&self.topic, CONTENT_TYPE_JSON, payload)?;
        tracing::debug!(
            topic = %self.topic,
            receivers,
            event_id = %change.event_id,
            "Message published: {}",
            change
        );
        Ok(())
    }
}

/// One consumer's view of a topic.
pub struct BrokerSubscription {
    receiver: broadcast::Receiver<BrokerMessage>,
    redeliveries: VecDeque<Delivery>,
    next_tag: u64,
}

impl BrokerSubscription {
    /// Receive and decode the next change, acknowledging it immediately.
    pub async fn next_change(&mut self) -> Result<Option<FlagChange>, NotificationError> {
        let Some(delivery) = self.next().await? else {
            return Ok(None);
        };
        self.ack(&delivery).await?;
        decode_change(&delivery).map(Some)
    }
}

#[async_trait]
impl ChangeSubscription for BrokerSubscription {
    async fn next(&mut self) -> Result<Option<Delivery>, NotificationError> {
        if let Some(delivery) = self.redeliveries.pop_front() {
            return Ok(Some(delivery));
        }

        match self.receiver.recv().await {
            Ok(message) => {
                let tag = self.next_tag;
                self.next_tag += 1;
                Ok(Some(Delivery {
                    tag,
                    content_type: message.content_type,
                    payload: message.payload.to_vec(),
                    attempt: 1,
                }))
            }
            Err(broadcast::error::RecvError::Closed) => Ok(None),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                Err(NotificationError::Lagged(skipped))
            }
        }
    }

    async fn ack(&mut self, _delivery: &Delivery) -> Result<(), NotificationError> {
        Ok(())
    }

    async fn nack(&mut self, mut delivery: Delivery) -> Result<(), NotificationError> {
        delivery.attempt += 1;
        self.redeliveries.push_back(delivery);
        Ok(())
    }
}
