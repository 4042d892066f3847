//! Wire-level types for the graphql-ws protocol.
//!
//! Two envelope shapes travel over the duplex connection:
//!
//! - [`OperationMessage`]: client → server control frames
//!   (`connection_init`, `start`, ...).
//! - [`IncomingPayload`]: server → client frames. Only `type` and `id`
//!   are decoded eagerly; `payload` stays raw JSON until the consumer
//!   knows which body type to expect (two-phase decode).
//!
//! The GraphQL request/response bodies shared with the HTTP path live
//! here too, since both transports carry the same `{query, variables}`
//! and `{data, errors}` shapes.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// FrameType
// ---------------------------------------------------------------------------

/// The `type` tag of a graphql-ws frame.
///
/// Covers both directions of the protocol's vocabulary. Anything the
/// server invents beyond it decodes as [`FrameType::Unknown`] instead of
/// failing the whole envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    ConnectionInit,
    ConnectionAck,
    ConnectionError,
    /// Server keep-alive, sent as `"ka"`.
    #[serde(rename = "ka")]
    KeepAlive,
    ConnectionTerminate,
    Start,
    Stop,
    Data,
    Error,
    Complete,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::ConnectionInit => "connection_init",
            Self::ConnectionAck => "connection_ack",
            Self::ConnectionError => "connection_error",
            Self::KeepAlive => "ka",
            Self::ConnectionTerminate => "connection_terminate",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Data => "data",
            Self::Error => "error",
            Self::Complete => "complete",
            Self::Unknown => "unknown",
        };
        f.write_str(tag)
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Credentials carried by `connection_init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    pub access_token: String,
}

/// A GraphQL operation body: `{query, variables}`.
///
/// Used as the `start` payload on the duplex connection and as the HTTP
/// request body for one-shot queries and mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

impl GraphQlRequest {
    /// A request with no variables.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
        }
    }

    /// A request whose variables are the fields of `variables`, which must
    /// serialize to a JSON object.
    pub fn with_variables<V: Serialize>(
        query: impl Into<String>,
        variables: &V,
    ) -> Result<Self, ProtocolError> {
        match serde_json::to_value(variables).map_err(ProtocolError::Encode)? {
            Value::Object(variables) => Ok(Self {
                query: query.into(),
                variables,
            }),
            other => Err(ProtocolError::InvalidMessage(format!(
                "variables must be an object, got {other}"
            ))),
        }
    }

    /// Sets one variable.
    pub fn var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// A client → server frame.
///
/// Internally tagged on `type`, so `Start` encodes as
/// `{"type":"start","id":"…","payload":{"query":"…","variables":{…}}}`
/// and `ConnectionInit` has no `id` at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationMessage {
    /// Opens the protocol session with the client's credentials.
    ConnectionInit { payload: InitPayload },

    /// Starts the subscription tagged `id`.
    Start { id: String, payload: GraphQlRequest },

    /// Stops the subscription tagged `id`.
    Stop { id: String },

    /// Tells the server the client is going away.
    ConnectionTerminate,
}

impl OperationMessage {
    /// The frame's `type` tag.
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::ConnectionInit { .. } => FrameType::ConnectionInit,
            Self::Start { .. } => FrameType::Start,
            Self::Stop { .. } => FrameType::Stop,
            Self::ConnectionTerminate => FrameType::ConnectionTerminate,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// A server → client frame with its payload left undecoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingPayload {
    #[serde(rename = "type")]
    pub kind: FrameType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<RawValue>>,
}

impl IncomingPayload {
    /// The raw JSON text of the payload, if there is one.
    pub fn raw_payload(&self) -> Option<&str> {
        self.payload.as_deref().map(RawValue::get)
    }

    /// Second decode phase: parses the payload as `T`.
    ///
    /// # Errors
    /// `MissingField` if the frame has no payload, `Decode` (path
    /// `payload`) if it doesn't match `T`.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        let raw = self.raw_payload().ok_or_else(|| ProtocolError::MissingField {
            path: "payload".into(),
        })?;
        serde_json::from_str(raw)
            .map_err(|e| ProtocolError::decode("payload", raw.as_bytes(), e))
    }

    /// Parses a `data` frame's payload as a GraphQL response.
    pub fn response(&self) -> Result<GraphQlResponse, ProtocolError> {
        self.decode_body()
    }

    /// Parses an `error` frame's payload.
    ///
    /// The protocol sends a list, but a single error object is accepted too.
    pub fn server_errors(&self) -> Result<Vec<GraphQlError>, ProtocolError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Errors {
            Many(Vec<GraphQlError>),
            One(GraphQlError),
        }

        Ok(match self.decode_body::<Errors>()? {
            Errors::Many(errors) => errors,
            Errors::One(error) => vec![error],
        })
    }
}

// ---------------------------------------------------------------------------
// Responses and errors
// ---------------------------------------------------------------------------

/// Source position attached to a GraphQL error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

/// One entry of a GraphQL `errors` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,
}

impl fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for loc in &self.locations {
            write!(f, " ({}:{})", loc.line, loc.column)?;
        }
        Ok(())
    }
}

/// A GraphQL response body: `{data, errors}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

impl GraphQlResponse {
    /// Decodes `data.<name>` as `T`.
    pub fn field<T: DeserializeOwned>(&self, name: &str) -> Result<T, ProtocolError> {
        let data = self.data.as_ref().ok_or_else(|| ProtocolError::MissingField {
            path: "data".into(),
        })?;
        decode_field(data, name)
    }
}

/// Decodes the top-level field `name` of a response's `data` map.
///
/// # Errors
/// `MissingField` when the field is absent or `null`, `Decode` (path
/// `data.<name>`) when it has the wrong shape.
pub fn decode_field<T: DeserializeOwned>(
    data: &Map<String, Value>,
    name: &str,
) -> Result<T, ProtocolError> {
    let path = format!("data.{name}");
    let value = match data.get(name) {
        Some(value) if !value.is_null() => value,
        _ => return Err(ProtocolError::MissingField { path }),
    };
    T::deserialize(value).map_err(|e| {
        let bytes = serde_json::to_vec(value).unwrap_or_default();
        ProtocolError::decode(path, &bytes, e)
    })
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire shapes here must match what graphql-ws servers emit and
    //! accept byte for byte, so most tests assert on raw JSON.

    use super::*;
    use serde_json::json;

    // =====================================================================
    // OperationMessage
    // =====================================================================

    #[test]
    fn test_connection_init_json_format() {
        let msg = OperationMessage::ConnectionInit {
            payload: InitPayload {
                access_token: "tok".into(),
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({"type": "connection_init", "payload": {"accessToken": "tok"}})
        );
    }

    #[test]
    fn test_start_json_format() {
        let msg = OperationMessage::Start {
            id: "0a1b2c3d".into(),
            payload: GraphQlRequest::new("subscription { x }").var("n", 2),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "start");
        assert_eq!(json["id"], "0a1b2c3d");
        assert_eq!(json["payload"]["query"], "subscription { x }");
        assert_eq!(json["payload"]["variables"], json!({"n": 2}));
    }

    #[test]
    fn test_start_with_no_variables_sends_empty_object() {
        let msg = OperationMessage::Start {
            id: "1".into(),
            payload: GraphQlRequest::new("q"),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["payload"]["variables"], json!({}));
    }

    #[test]
    fn test_connection_terminate_json_format() {
        let json = serde_json::to_value(OperationMessage::ConnectionTerminate).unwrap();
        assert_eq!(json, json!({"type": "connection_terminate"}));
    }

    #[test]
    fn test_frame_type_matches_tag() {
        let msg = OperationMessage::Stop { id: "1".into() };
        assert_eq!(msg.frame_type(), FrameType::Stop);
        assert_eq!(msg.frame_type().to_string(), "stop");
    }

    // =====================================================================
    // GraphQlRequest
    // =====================================================================

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Vars {
        origin_id: String,
    }

    #[test]
    fn test_with_variables_uses_struct_fields() {
        let req = GraphQlRequest::with_variables(
            "mutation",
            &Vars {
                origin_id: "o1".into(),
            },
        )
        .unwrap();
        assert_eq!(req.variables["originId"], "o1");
    }

    #[test]
    fn test_with_variables_rejects_non_object() {
        let err = GraphQlRequest::with_variables("q", &vec![1, 2]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    // =====================================================================
    // IncomingPayload
    // =====================================================================

    fn incoming(json: &str) -> IncomingPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_incoming_data_frame_keeps_payload_raw() {
        let frame = incoming(
            r#"{"type":"data","id":"abc1","payload":{"data":{"messageReceived":{"targetThreadId":"t1"}}}}"#,
        );
        assert_eq!(frame.kind, FrameType::Data);
        assert_eq!(frame.id.as_deref(), Some("abc1"));
        assert!(frame.raw_payload().unwrap().contains("messageReceived"));
    }

    #[test]
    fn test_incoming_unknown_type_still_decodes() {
        let frame = incoming(r#"{"type":"galaxy_brain","id":"1"}"#);
        assert_eq!(frame.kind, FrameType::Unknown);
    }

    #[test]
    fn test_incoming_keep_alive_without_id_or_payload() {
        let frame = incoming(r#"{"type":"ka"}"#);
        assert_eq!(frame.kind, FrameType::KeepAlive);
        assert!(frame.id.is_none());
        assert!(frame.payload.is_none());
    }

    #[test]
    fn test_decode_body_without_payload_is_missing_field() {
        let frame = incoming(r#"{"type":"complete","id":"1"}"#);
        let err = frame.decode_body::<Value>().unwrap_err();
        assert_eq!(err.path(), Some("payload"));
    }

    #[test]
    fn test_response_field_decodes_nested_value() {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Received {
            target_thread_id: String,
        }

        let frame = incoming(
            r#"{"type":"data","id":"abc1","payload":{"data":{"messageReceived":{"targetThreadId":"t1"}}}}"#,
        );
        let received: Received = frame.response().unwrap().field("messageReceived").unwrap();
        assert_eq!(received.target_thread_id, "t1");
    }

    #[test]
    fn test_response_field_wrong_shape_reports_path() {
        let frame = incoming(
            r#"{"type":"data","id":"1","payload":{"data":{"messageReceived":42}}}"#,
        );
        let err = frame
            .response()
            .unwrap()
            .field::<Map<String, Value>>("messageReceived")
            .unwrap_err();
        assert_eq!(err.path(), Some("data.messageReceived"));
        assert_eq!(err.offending_bytes(), Some(&b"42"[..]));
    }

    #[test]
    fn test_response_field_null_is_missing() {
        let frame = incoming(
            r#"{"type":"data","id":"1","payload":{"data":{"messageReceived":null},"errors":[{"message":"boom"}]}}"#,
        );
        let response = frame.response().unwrap();
        assert_eq!(response.errors[0].message, "boom");
        let err = response.field::<Value>("messageReceived").unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField { .. }));
    }

    #[test]
    fn test_server_errors_list() {
        let frame = incoming(
            r#"{"type":"error","id":"1","payload":[{"message":"bad query","locations":[{"line":2,"column":7}]}]}"#,
        );
        let errors = frame.server_errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].locations[0], ErrorLocation { line: 2, column: 7 });
        assert_eq!(errors[0].to_string(), "bad query (2:7)");
    }

    #[test]
    fn test_server_errors_single_object() {
        let frame = incoming(r#"{"type":"error","id":"1","payload":{"message":"nope"}}"#);
        let errors = frame.server_errors().unwrap();
        assert_eq!(errors[0].message, "nope");
    }

    #[test]
    fn test_decode_wrong_shape_envelope_fails() {
        let result: Result<IncomingPayload, _> = serde_json::from_str(r#"{"id":"1"}"#);
        assert!(result.is_err(), "type is required");
    }
}
