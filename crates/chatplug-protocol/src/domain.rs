//! Chat payloads exchanged with the core server.
//!
//! Subscriptions select only a subset of each object's fields, so every
//! struct tolerates missing fields (`#[serde(default)]`). Fields the core
//! may send as `null` are `Option`s.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Received objects
// ---------------------------------------------------------------------------

/// Author of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageAuthor {
    pub id: String,
    pub username: String,
    pub origin_id: String,
    pub avatar_url: Option<String>,
}

/// A file or media item attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub origin_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source_url: String,
}

/// A conversation thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub name: String,
    pub origin_id: String,
    pub thread_group_id: Option<String>,
    pub icon_url: Option<String>,
    pub service_instance_id: Option<String>,
}

/// A chat message as stored by the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub origin_id: String,
    pub author: MessageAuthor,
    pub thread: Thread,
    pub body: String,
    pub thread_group_id: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Body of a `messageReceived` subscription event: a message the plugin
/// should deliver into `target_thread_id` on its own service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageReceived {
    pub message: Message,
    pub target_thread_id: String,
}

/// Body of a `subscribeToSearchRequests` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: String,
}

/// Body of a `configurationReceived` event: one value per requested field,
/// in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigurationResponse {
    pub field_values: Vec<String>,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// An attachment on an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    pub origin_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source_url: String,
}

/// One thread offered in answer to a search request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchThreadInput {
    pub origin_id: String,
    pub name: String,
    pub icon_url: String,
}

/// A message the plugin received on its service and forwards to the core.
///
/// Serializes to exactly the `sendMessage` mutation variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub body: String,
    pub origin_id: String,
    pub origin_thread_id: String,
    pub username: String,
    pub author_origin_id: String,
    pub author_avatar_url: String,
    pub attachments: Vec<AttachmentInput>,
}

/// One configuration input the plugin asks the core's user to fill in.
///
/// `mask` marks the value as secret; it is a UI hint only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationField {
    #[serde(rename = "type")]
    pub kind: String,
    pub default_value: String,
    pub optional: bool,
    pub hint: String,
    pub mask: bool,
}

/// Variables of the `configurationReceived` subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRequest {
    pub fields: Vec<ConfigurationField>,
}

// ---------------------------------------------------------------------------
// Mutation results
// ---------------------------------------------------------------------------

/// Result of `sendMessage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentMessage {
    pub id: String,
}

/// A thread echoed back by `setSearchResponse`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchThread {
    pub origin_id: String,
    pub name: String,
    pub icon_url: Option<String>,
}

/// Result of `setSearchResponse`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchResponse {
    pub threads: Vec<SearchThread>,
    pub for_query: String,
}

/// Result of `setInstanceStatus`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceStatus {
    pub status: String,
    pub name: String,
}
