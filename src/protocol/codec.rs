//! Envelope codec
//!
//! The single place where raw frames become typed messages and back. Every
//! inbound frame goes through [`decode_frame`], so an unknown tag or a bad
//! payload has exactly one fallback path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoachError, Result};
use crate::types::identifiers::OperationId;
use crate::types::options::CoachOptions;

use super::kinds::InboundKind;
use super::messages::{Hello, InboundMessage, OutboundMessage, Welcome};

/// Protocol version spoken by this client
pub const PROTOCOL_VERSION: &str = "1.0";

/// Raw wire envelope, before the payload is interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Registry tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Tag-dependent payload
    #[serde(default)]
    pub payload: Value,
    /// Correlation id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,
}

impl Envelope {
    /// Decode the payload into a concrete type
    ///
    /// # Errors
    /// Returns error if the payload does not match `T`
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// Decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    /// Typed message
    pub message: InboundMessage,
    /// Envelope correlation id
    pub id: Option<String>,
    /// Envelope timestamp
    pub timestamp: i64,
}

/// Decode one inbound frame
///
/// # Errors
/// - `CoachError::JsonDecode` if the frame is not an envelope
/// - `CoachError::UnknownMessageType` if the tag is outside the registry
/// - `CoachError::MessageParse` if the payload does not fit the tag
pub fn decode_frame(frame: &str) -> Result<Received> {
    let envelope: Envelope = serde_json::from_str(frame)?;

    if InboundKind::from_tag(&envelope.kind).is_none() {
        return Err(CoachError::unknown_message_type(envelope.kind));
    }

    let payload = match envelope.payload {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    let tagged = serde_json::json!({ "type": envelope.kind, "payload": payload });

    let message = serde_json::from_value::<InboundMessage>(tagged.clone()).map_err(|e| {
        CoachError::message_parse(
            format!("Invalid payload for {}: {e}", envelope.kind),
            Some(tagged),
        )
    })?;

    Ok(Received {
        message,
        id: envelope.id,
        timestamp: envelope.timestamp,
    })
}

/// Encode an outbound message into a frame
///
/// # Errors
/// Returns error if JSON serialization fails
pub fn encode_message(message: &OutboundMessage, id: Option<&OperationId>) -> Result<String> {
    encode_envelope(message, id.map(OperationId::as_str))
}

/// Encode any tagged message into a frame
///
/// Used for outbound traffic and by the in-memory server for inbound traffic.
///
/// # Errors
/// Returns error if JSON serialization fails or the message is not tagged
pub fn encode_envelope<M: Serialize>(message: &M, id: Option<&str>) -> Result<String> {
    let mut fields = match serde_json::to_value(message)? {
        Value::Object(fields) => fields,
        other => {
            return Err(CoachError::message_parse(
                "Message did not serialize to an object",
                Some(other),
            ));
        }
    };

    let kind = match fields.remove("type") {
        Some(Value::String(kind)) => kind,
        _ => {
            return Err(CoachError::message_parse(
                "Message is missing its type tag",
                Some(Value::Object(fields)),
            ));
        }
    };

    let envelope = Envelope {
        kind,
        payload: fields.remove("payload").unwrap_or(Value::Object(Map::new())),
        id: id.map(str::to_string),
        timestamp: chrono::Utc::now().timestamp_millis(),
    };

    Ok(serde_json::to_string(&envelope)?)
}

/// Build the handshake opener for these options
#[must_use]
pub fn hello(options: &CoachOptions) -> OutboundMessage {
    OutboundMessage::Hello(Hello {
        client_name: options.client_name.clone(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: options.capabilities,
    })
}

/// Validate the handshake acceptance
///
/// # Errors
/// Returns error if the protocol version is unsupported
pub fn check_welcome(welcome: &Welcome) -> Result<()> {
    if welcome.protocol_version != PROTOCOL_VERSION {
        return Err(CoachError::protocol(format!(
            "Unsupported protocol version: {}",
            welcome.protocol_version
        )));
    }
    Ok(())
}
