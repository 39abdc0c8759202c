//! Change notification transport.
//!
//! Flag changes travel as JSON documents. The broker here is in-process; a
//! networked broker would implement the same `ChangePublisher` and
//! `ChangeSubscription` ports.

pub mod in_memory_broker;

pub use in_memory_broker::{BrokerPublisher, BrokerSubscription, InMemoryBroker};

use crate::domain::errors::NotificationError;
use crate::domain::models::FlagChange;
use crate::domain::ports::Delivery;

/// Content type of encoded flag changes.
pub const CONTENT_TYPE_JSON: &str = "application/json";

pub fn encode_change(change: &FlagChange) -> Result<Vec<u8>, NotificationError> {
    serde_json::to_vec(change).map_err(|e| NotificationError::Publish(e.to_string()))
}

pub fn decode_change(delivery: &Delivery) -> Result<FlagChange, NotificationError> {
    if delivery.content_type != CONTENT_TYPE_JSON {
        return Err(NotificationError::Decode(format!(
            "unsupported content type {}",
            delivery.content_type
        )));
    }
    serde_json::from_slice(&delivery.payload).map_err(|e| NotificationError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(content_type: &str, payload: &[u8]) -> Delivery {
        Delivery {
            tag: 1,
            content_type: content_type.to_string(),
            payload: payload.to_vec(),
            attempt: 1,
        }
    }

    #[test]
    fn test_encoded_change_decodes() {
        let change = FlagChange::updated(12);
        let payload = encode_change(&change).unwrap();
        let decoded = decode_change(&delivery(CONTENT_TYPE_JSON, &payload)).unwrap();
        assert_eq!(decoded, change);
    }

    #[test]
    fn test_plain_text_is_rejected() {
        let result = decode_change(&delivery("text/plain", b"Feature flag 1 created"));
        assert!(matches!(result, Err(NotificationError::Decode(_))));
    }

    #[test]
    fn test_garbage_json_is_rejected() {
        let result = decode_change(&delivery(CONTENT_TYPE_JSON, b"{\"flag_id\":"));
        assert!(matches!(result, Err(NotificationError::Decode(_))));
    }
}
