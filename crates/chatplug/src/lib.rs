//! # chatplug
//!
//! Client library for plugging a chat service into a chatplug core.
//!
//! A plugin holds one graphql-ws connection for the events the core pushes
//! (messages to deliver, search requests, configuration answers) and uses
//! plain HTTP for the mutations it sends back. [`ChatPlugClient`] wraps
//! both behind typed methods and channels.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatplug::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let (client, mut inbox) = ChatPlugClient::builder()
//!     .ws_url("ws://localhost:2137/query")
//!     .http_url("http://localhost:2137/query")
//!     .access_token("secret")
//!     .connect()
//!     .await?;
//!
//! client.subscribe_messages().await?;
//! while let Some(event) = inbox.messages.recv().await {
//!     tracing::info!(thread = %event.target_thread_id, "deliver {}", event.message.body);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! ChatPlugClient (here)        ← facade, mutations, Inbox
//!     ↕
//! GqlClient (here)             ← handshake, read loop, lifecycle
//!     ↕
//! chatplug-subscription        ← IDs, registry, router task
//!     ↕
//! chatplug-protocol            ← envelopes, GraphQL bodies, payload types
//!     ↕
//! chatplug-transport           ← WebSocket frames, ConnectionState
//! ```

mod client;
mod config;
mod connection;
mod error;
mod request;

pub use client::{ChatPlugClient, ChatPlugClientBuilder, Inbox};
pub use config::{ClientConfig, GRAPHQL_WS_PROTOCOL};
pub use connection::{GqlClient, IncomingStreams};
pub use error::ClientError;
pub use request::{RequestClient, AUTHENTICATION_HEADER};

pub use chatplug_protocol as protocol;
pub use chatplug_subscription as subscription;
pub use chatplug_transport as transport;

/// Convenience re-exports for plugin authors.
pub mod prelude {
    pub use crate::{ChatPlugClient, ChatPlugClientBuilder, ClientConfig, ClientError, Inbox};
    pub use chatplug_protocol::{
        AttachmentInput, ConfigurationField, ConfigurationResponse, Message,
        MessageReceived, OutgoingMessage, SearchRequest, SearchThreadInput,
    };
    pub use chatplug_subscription::SubscriptionId;
    pub use chatplug_transport::ConnectionState;
}
