//! Fixed GraphQL operations understood by the core server.
//!
//! Each subscription's top-level field name is exported alongside its text
//! because the router decodes `data.<field>` from every `data` frame.

/// Pushes a message received on the plugin's service into the core.
pub const SEND_MESSAGE: &str = r#"
mutation sendMessage($body: String!, $originId: String!, $originThreadId: String!, $username: String!, $authorOriginId: String!, $authorAvatarUrl: String!, $attachments: [AttachmentInput!]!) {
  sendMessage(
    input: {
      body: $body,
      originId: $originId,
      originThreadId: $originThreadId,
      author: {
        username: $username,
        originId: $authorOriginId,
        avatarUrl: $authorAvatarUrl
      },
      attachments: $attachments
    }
  ) {
    id
  }
}"#;

/// Result field of [`SEND_MESSAGE`].
pub const SEND_MESSAGE_FIELD: &str = "sendMessage";

/// Answers a search request with the threads that matched it.
pub const SET_SEARCH_RESPONSE: &str = r#"
mutation setSearchResponse($q: String!, $res: [ThreadSearchResultInput!]!) {
  setSearchResponse(forQuery: $q, threads: $res) {
    threads {
      originId
      name
      iconUrl
    }
    forQuery
  }
}"#;

/// Result field of [`SET_SEARCH_RESPONSE`].
pub const SET_SEARCH_RESPONSE_FIELD: &str = "setSearchResponse";

/// Tells the core this instance finished starting up.
pub const SET_INSTANCE_STATUS: &str = r#"
mutation {
  setInstanceStatus(status: INITIALIZED) {
    status
    name
  }
}"#;

/// Result field of [`SET_INSTANCE_STATUS`].
pub const SET_INSTANCE_STATUS_FIELD: &str = "setInstanceStatus";

/// Messages the core wants delivered to the plugin's service.
pub const MESSAGE_RECEIVED: &str = r#"
subscription {
  messageReceived {
    message {
      body
      id
      originId
      attachments {
        type
        sourceUrl
        originId
        id
      }
      thread {
        id
        originId
        name
      }
      threadGroupId
      author {
        username
        originId
        avatarUrl
      }
    }
    targetThreadId
  }
}"#;

/// Event field of [`MESSAGE_RECEIVED`].
pub const MESSAGE_RECEIVED_FIELD: &str = "messageReceived";

/// Thread search queries typed by the core's user.
pub const SEARCH_REQUESTS: &str = r#"
subscription {
  subscribeToSearchRequests {
    query
  }
}"#;

/// Event field of [`SEARCH_REQUESTS`].
pub const SEARCH_REQUESTS_FIELD: &str = "subscribeToSearchRequests";

/// Asks the core's user to fill in the given fields; the answer arrives as
/// one event. Variables: `{fields: [ConfigurationField!]!}`.
pub const CONFIGURATION_RECEIVED: &str = r#"
subscription confRequest($fields: [ConfigurationField!]!) {
  configurationReceived(configuration: {fields: $fields}) {
    fieldValues
  }
}"#;

/// Event field of [`CONFIGURATION_RECEIVED`].
pub const CONFIGURATION_RECEIVED_FIELD: &str = "configurationReceived";
