//! Wire protocol shared by the agent and the controller.
//!
//! Every message in either direction is a single JSON-encoded [`Frame`].
//! Payload bytes travel as standard base64 so binary captures survive the
//! JSON envelope.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frame codec error.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Frame carries no command")]
    MissingCommand,
}

/// The single wire unit exchanged with the controller.
///
/// Frames carry no sequence number; a response is correlated with its
/// request only by in-order delivery on one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Identifier of the agent this frame belongs to.
    #[serde(default)]
    pub client_id: String,
    /// Command name. Only set on controller-to-agent frames.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,
    /// Command-specific parameter (a path, a quality level, a stream name).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parameter: String,
    /// Command output, or the error message when `has_error` is set.
    #[serde(default, with = "base64_payload")]
    pub response: Bytes,
    /// Whether `response` holds a human-readable error message.
    #[serde(default)]
    pub has_error: bool,
}

impl Frame {
    /// Build a controller request frame.
    #[must_use]
    pub fn request(command: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            parameter: parameter.into(),
            ..Self::default()
        }
    }

    /// Build a successful response frame.
    #[must_use]
    pub fn response(client_id: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            client_id: client_id.into(),
            response: payload.into(),
            ..Self::default()
        }
    }

    /// Build an error response frame carrying `message` as its payload.
    #[must_use]
    pub fn error(client_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            response: Bytes::from(message.into()),
            has_error: true,
            ..Self::default()
        }
    }

    /// Attach a payload (e.g. file contents for an upload request).
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.response = payload.into();
        self
    }

    /// Decode any frame.
    ///
    /// # Errors
    /// Returns error if the bytes are not a JSON frame.
    pub fn decode(raw: &[u8]) -> Result<Self, FrameError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Decode a controller request; a frame without a command is rejected.
    ///
    /// # Errors
    /// Returns error if the bytes are not a JSON frame or name no command.
    pub fn decode_request(raw: &[u8]) -> Result<Self, FrameError> {
        let frame = Self::decode(raw)?;
        if frame.command.is_empty() {
            return Err(FrameError::MissingCommand);
        }
        Ok(frame)
    }

    /// Encode to JSON bytes.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Payload as lossy UTF-8 text.
    #[must_use]
    pub fn response_text(&self) -> String {
        String::from_utf8_lossy(&self.response).into_owned()
    }
}

mod base64_payload {
    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => BASE64
                .decode(encoded)
                .map(Bytes::from)
                .map_err(serde::de::Error::custom),
            None => Ok(Bytes::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_without_client_id() {
        let frame =
            Frame::decode_request(br#"{"command":"start-webcam-stream","parameter":"50"}"#).unwrap();
        assert_eq!(frame.command, "start-webcam-stream");
        assert_eq!(frame.parameter, "50");
        assert!(frame.client_id.is_empty());
        assert!(frame.response.is_empty());
        assert!(!frame.has_error);
    }

    #[test]
    fn test_binary_payload_survives_encoding() {
        let payload = vec![0xff, 0x00, 0xd8, 0x80];
        let frame = Frame::response("agent-1", payload.clone());
        let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(decoded.response.as_ref(), payload.as_slice());
        assert_eq!(decoded.client_id, "agent-1");
    }

    #[test]
    fn test_response_is_base64_on_the_wire() {
        let json: serde_json::Value =
            serde_json::from_slice(&Frame::response("a", &b"hi"[..]).encode().unwrap()).unwrap();
        assert_eq!(json["response"], "aGk=");
        assert!(json.get("command").is_none());
        assert!(json.get("parameter").is_none());
    }

    #[test]
    fn test_null_response_decodes_empty() {
        let frame = Frame::decode(br#"{"client_id":"x","response":null,"has_error":false}"#).unwrap();
        assert!(frame.response.is_empty());
    }

    #[test]
    fn test_error_frame() {
        let frame = Frame::error("a", "unsupported platform");
        assert!(frame.has_error);
        assert_eq!(frame.response_text(), "unsupported platform");
    }

    #[test]
    fn test_malformed_input_rejected() {
        assert!(matches!(Frame::decode_request(b"not json"), Err(FrameError::Malformed(_))));
        assert!(matches!(Frame::decode_request(b"{\"command\":"), Err(FrameError::Malformed(_))));
        assert!(matches!(
            Frame::decode_request(br#"{"response":"!!notbase64"}"#),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(Frame::decode_request(b"{}"), Err(FrameError::MissingCommand)));
    }
}
