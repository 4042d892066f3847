//! Client configuration.

use std::time::Duration;

/// The WebSocket subprotocol spoken on the subscription connection.
pub const GRAPHQL_WS_PROTOCOL: &str = "graphql-ws";

/// Settings for connecting a plugin to the core.
///
/// Start from `ClientConfig::default()` and override what you need, or
/// go through [`ChatPlugClient::builder()`](crate::ChatPlugClient::builder).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Subscription endpoint (`ws://` or, with the `tls` feature, `wss://`).
    pub ws_url: String,

    /// Endpoint for one-shot queries and mutations.
    pub http_url: String,

    /// Token sent in `connection_init` and as the `Authentication` header.
    pub access_token: String,

    /// Value of the `Sec-WebSocket-Protocol` header.
    pub subprotocol: String,

    /// How long to wait for `connection_ack` after `connection_init`.
    pub ack_timeout: Duration,

    /// Frames buffered between the read loop and the router.
    pub frame_capacity: usize,

    /// Events buffered per delivery channel. The default of 1 keeps
    /// delivery close to a direct handoff.
    pub delivery_capacity: usize,

    /// Overall timeout for HTTP requests. `None` leaves it to the
    /// transport.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://127.0.0.1:2137/query".to_string(),
            http_url: "http://127.0.0.1:2137/query".to_string(),
            access_token: String::new(),
            subprotocol: GRAPHQL_WS_PROTOCOL.to_string(),
            ack_timeout: Duration::from_secs(10),
            frame_capacity: 1,
            delivery_capacity: 1,
            request_timeout: None,
        }
    }
}
