//! Wire protocol for chatplug.
//!
//! This crate defines what travels between a plugin and the core:
//!
//! - **Envelopes** ([`OperationMessage`], [`IncomingPayload`],
//!   [`FrameType`]): graphql-ws frames on the duplex connection.
//! - **GraphQL bodies** ([`GraphQlRequest`], [`GraphQlResponse`],
//!   [`GraphQlError`]): shared by the duplex and HTTP paths.
//! - **Chat payloads** ([`MessageReceived`], [`SearchRequest`],
//!   [`ConfigurationResponse`], the `*Input` types, ...).
//! - **Operations** ([`operations`]): the fixed query texts.
//! - **Codec** ([`Codec`], [`JsonCodec`]) and [`ProtocolError`].
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (envelopes, bodies) → Subscription routing
//! ```

mod codec;
mod domain;
mod error;
pub mod operations;
mod types;

pub use codec::{Codec, JsonCodec};
pub use domain::{
    Attachment, AttachmentInput, ConfigurationField, ConfigurationRequest,
    ConfigurationResponse, InstanceStatus, Message, MessageAuthor,
    MessageReceived, OutgoingMessage, SearchRequest, SearchResponse,
    SearchThread, SearchThreadInput, SentMessage, Thread,
};
pub use error::ProtocolError;
pub use types::{
    decode_field, ErrorLocation, FrameType, GraphQlError, GraphQlRequest,
    GraphQlResponse, IncomingPayload, InitPayload, OperationMessage,
};
