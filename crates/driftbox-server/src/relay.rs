//! Ingress/egress adapter between the transport and the message store.
//!
//! Turns submit and retrieve requests into store operations and store results
//! into response payloads. Transport-agnostic: the HTTP layer only handles
//! routing, extraction and status codes.

use driftbox_core::{Drain, MessageStore, StoreError, env::Environment};
use driftbox_crypto::SealedMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Status returned with every accepted submission.
pub const STATUS_SENT: &str = "Message sent!";

/// Status returned when a retrieval delivers nothing.
pub const STATUS_EMPTY: &str = "No messages!";

/// Submit request body.
///
/// `message` is kept as raw JSON so non-string values can be rejected with
/// `InvalidInput` instead of a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
    /// Text to relay
    #[serde(default)]
    pub message: Option<Value>,
}

impl SubmitRequest {
    /// Request carrying a text message.
    pub fn text(message: impl Into<String>) -> Self {
        Self { message: Some(Value::String(message.into())) }
    }
}

/// Hex-encoded fields of a sealed record.
///
/// The key is included: every record is sealed under its own key and that key
/// is part of the submit contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    /// Ciphertext including the authentication tag
    pub ciphertext: String,
    /// Nonce
    pub nonce: String,
    /// Key
    pub key: String,
}

impl From<&SealedMessage> for EncryptedMessage {
    fn from(sealed: &SealedMessage) -> Self {
        Self {
            ciphertext: hex::encode(&sealed.ciphertext),
            nonce: hex::encode(&sealed.nonce),
            key: hex::encode(&sealed.key),
        }
    }
}

/// Acknowledgment for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    /// Always [`STATUS_SENT`]
    pub status: String,
    /// The record as sealed
    pub encrypted_message: EncryptedMessage,
}

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    /// Decrypted text
    pub text: String,
    /// Receive timestamp (ms since epoch), used as an opaque identifier
    pub message_id: u64,
}

/// Retrieve response: either a list of messages or an explicit empty status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetrieveResponse {
    /// At least one message was delivered
    Messages {
        /// Messages in insertion order
        messages: Vec<MessageView>,
    },
    /// Nothing to deliver
    Empty {
        /// Always [`STATUS_EMPTY`]
        status: String,
    },
}

impl RetrieveResponse {
    /// Delivered messages; empty for the `Empty` variant.
    pub fn messages(&self) -> &[MessageView] {
        match self {
            Self::Messages { messages } => messages,
            Self::Empty { .. } => &[],
        }
    }
}

impl From<Drain> for RetrieveResponse {
    fn from(drain: Drain) -> Self {
        if drain.is_empty() {
            return Self::Empty { status: STATUS_EMPTY.to_string() };
        }

        let messages = drain
            .messages
            .into_iter()
            .map(|m| MessageView { text: m.text, message_id: m.message_id })
            .collect();
        Self::Messages { messages }
    }
}

/// Errors surfaced to callers.
///
/// Decryption failures never appear here: they are recovered by the store and
/// only logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Submit payload is missing, empty or not a string
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Store capacity bound reached
    #[error("message store is full ({capacity} messages)")]
    CapacityExceeded {
        /// Configured capacity
        capacity: usize,
    },

    /// Caller exceeded the request rate limit
    #[error("rate limit exceeded")]
    RateLimited,

    /// Unexpected internal fault. Detail is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Message safe to show to callers.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "Invalid message format!",
            Self::CapacityExceeded { .. } => "Message store is full!",
            Self::RateLimited => "Too many requests!",
            Self::Internal(_) => "Something went wrong!",
        }
    }
}

impl From<StoreError> for RelayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CapacityExceeded { capacity } => Self::CapacityExceeded { capacity },
        }
    }
}

/// The relay adapter.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct Relay<E: Environment> {
    store: MessageStore<E>,
}

impl<E: Environment> Relay<E> {
    /// Wrap a store.
    pub fn new(store: MessageStore<E>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &MessageStore<E> {
        &self.store
    }

    /// Validate and store a message.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: `message` is missing, not a string, or empty
    /// - `CapacityExceeded`: store is bounded and full
    pub fn submit(&self, request: SubmitRequest) -> Result<SubmitReceipt, RelayError> {
        let message = match request.message {
            Some(Value::String(message)) if !message.is_empty() => message,
            Some(Value::String(_)) => {
                return Err(RelayError::InvalidInput("message is empty".to_string()));
            },
            Some(other) => {
                return Err(RelayError::InvalidInput(format!(
                    "message must be a string, got {}",
                    json_kind(&other)
                )));
            },
            None => return Err(RelayError::InvalidInput("message is missing".to_string())),
        };

        let receipt = self.store.append(&message)?;

        tracing::debug!(
            message_id = receipt.received_at,
            len = receipt.sealed.plaintext_len(),
            "message stored"
        );

        Ok(SubmitReceipt {
            status: STATUS_SENT.to_string(),
            encrypted_message: EncryptedMessage::from(&receipt.sealed),
        })
    }

    /// Deliver every visible message and mark it seen.
    pub fn retrieve(&self) -> RetrieveResponse {
        report(self.store.drain_visible())
    }
}

/// Log what a drain dropped and shape it into a response.
///
/// A drain whose only visible records failed to unseal still reports
/// [`STATUS_EMPTY`]: undecryptable records are indistinguishable from expired
/// ones to callers.
fn report(drain: Drain) -> RetrieveResponse {
    for failure in &drain.failures {
        tracing::warn!(
            message_id = failure.message_id,
            error = %failure.error,
            "dropping undecryptable message"
        );
    }

    if drain.evicted > 0 {
        tracing::debug!(evicted = drain.evicted, "evicted expired messages");
    }

    tracing::debug!(delivered = drain.messages.len(), "messages retrieved");

    RetrieveResponse::from(drain)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use driftbox_core::{DecryptFailure, Delivered};
    use driftbox_crypto::{CodecError, Field};
    use serde_json::json;

    use super::*;

    fn failure(message_id: u64) -> DecryptFailure {
        DecryptFailure { message_id, error: CodecError::MissingField(Field::Nonce) }
    }

    #[test]
    fn empty_drain_maps_to_status() {
        let response = RetrieveResponse::from(Drain::default());

        assert_eq!(response, RetrieveResponse::Empty { status: STATUS_EMPTY.to_string() });
        assert!(response.messages().is_empty());
    }

    #[test]
    fn retrieve_response_wire_shape() {
        let response = RetrieveResponse::Messages {
            messages: vec![MessageView { text: "hello".to_string(), message_id: 42 }],
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "messages": [ { "text": "hello", "messageId": 42 } ] })
        );

        let empty = RetrieveResponse::Empty { status: STATUS_EMPTY.to_string() };
        assert_eq!(serde_json::to_value(&empty).unwrap(), json!({ "status": "No messages!" }));
    }

    #[test]
    fn submit_receipt_wire_shape() {
        let receipt = SubmitReceipt {
            status: STATUS_SENT.to_string(),
            encrypted_message: EncryptedMessage {
                ciphertext: "aa".to_string(),
                nonce: "bb".to_string(),
                key: "cc".to_string(),
            },
        };

        assert_eq!(
            serde_json::to_value(&receipt).unwrap(),
            json!({
                "status": "Message sent!",
                "encryptedMessage": { "ciphertext": "aa", "nonce": "bb", "key": "cc" }
            })
        );
    }

    #[test]
    fn submit_request_accepts_missing_and_raw_values() {
        let missing: SubmitRequest = serde_json::from_value(json!({})).unwrap();
        assert!(missing.message.is_none());

        let number: SubmitRequest = serde_json::from_value(json!({ "message": 5 })).unwrap();
        assert_eq!(number.message, Some(json!(5)));
    }

    #[test]
    fn public_messages_hide_detail() {
        let err = RelayError::Internal("lock poisoned at store.rs".to_string());
        assert_eq!(err.public_message(), "Something went wrong!");

        let err = RelayError::InvalidInput("message is empty".to_string());
        assert_eq!(err.public_message(), "Invalid message format!");
    }

    #[test]
    fn capacity_error_converts() {
        let err = RelayError::from(StoreError::CapacityExceeded { capacity: 3 });
        assert_eq!(err, RelayError::CapacityExceeded { capacity: 3 });
    }

    #[test]
    fn only_undecryptable_records_report_empty_status() {
        let drain = Drain { failures: vec![failure(1), failure(2)], ..Drain::default() };

        let response = report(drain);

        assert_eq!(response, RetrieveResponse::Empty { status: STATUS_EMPTY.to_string() });
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "status": "No messages!" }));
    }

    #[test]
    fn undecryptable_records_are_omitted_from_messages() {
        let drain = Drain {
            messages: vec![Delivered { text: "kept".to_string(), message_id: 3 }],
            evicted: 2,
            failures: vec![failure(1)],
        };

        let response = report(drain);

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "messages": [ { "text": "kept", "messageId": 3 } ] })
        );
    }
}
