//! Unified error type for the chatplug client.

use chatplug_protocol::{FrameType, GraphQlError, ProtocolError};
use chatplug_subscription::SubscriptionError;
use chatplug_transport::{ConnectionState, TransportError};

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` variants let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (dial, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A subscription-level error (router gone).
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    /// The HTTP request itself failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status and no GraphQL body.
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The server answered with a GraphQL `errors` list.
    #[error("graphql: {}", first_message(.0))]
    GraphQl(Vec<GraphQlError>),

    /// The server refused `connection_init`.
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    /// No acknowledgment arrived within the configured timeout.
    #[error("handshake timed out")]
    HandshakeTimeout,

    /// The server sent something other than an ack during the handshake.
    #[error("unexpected {0} frame during handshake")]
    UnexpectedFrame(FrameType),

    /// The connection closed before the operation could complete.
    #[error("connection closed")]
    Closed,

    /// The operation needs a ready connection.
    #[error("connection not ready (state: {0})")]
    NotReady(ConnectionState),
}

fn first_message(errors: &[GraphQlError]) -> &str {
    errors.first().map_or("unknown error", |e| e.message.as_str())
}
