//! Codec trait and the JSON implementation used on the wire.
//!
//! A codec converts between Rust types and raw frame bytes. The layers
//! above only depend on the [`Codec`] trait; [`JsonCodec`] is the one the
//! graphql-ws protocol speaks.

use serde::{de::DeserializeOwned, Serialize};

use crate::{IncomingPayload, OperationMessage, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec is held by long-lived tasks
/// (the read loop, the request client) that Tokio may run on any thread.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type. The error keeps the input bytes.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ## Example
///
/// ```rust
/// use chatplug_protocol::{FrameType, GraphQlRequest, JsonCodec, OperationMessage};
///
/// let codec = JsonCodec;
/// let start = OperationMessage::Start {
///     id: "1a2b3c4d".into(),
///     payload: GraphQlRequest::new("subscription { ping }"),
/// };
///
/// let bytes = codec.encode_operation(&start).unwrap();
/// let frame = codec.decode_incoming(&bytes).unwrap();
/// assert_eq!(frame.kind, FrameType::Start);
/// assert_eq!(frame.id.as_deref(), Some("1a2b3c4d"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Encodes a client → server operation frame.
    pub fn encode_operation(
        &self,
        msg: &OperationMessage,
    ) -> Result<Vec<u8>, ProtocolError> {
        self.encode(msg)
    }

    /// Decodes the envelope of a server → client frame.
    ///
    /// Only `type` and `id` are interpreted; `payload` stays opaque until
    /// [`IncomingPayload::decode_body`] or [`IncomingPayload::response`]
    /// is called with the type the consumer expects.
    pub fn decode_incoming(
        &self,
        data: &[u8],
    ) -> Result<IncomingPayload, ProtocolError> {
        self.decode(data)
    }
}

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(|e| ProtocolError::decode("$", data, e))
    }
}
