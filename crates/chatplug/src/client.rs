//! `ChatPlugClient`: the plugin-facing facade.
//!
//! Ties the layers together: connection manager → router → typed
//! delivery channels, plus the mutations a plugin sends to the core.

use std::time::Duration;

use chatplug_protocol::{
    operations, ConfigurationField, ConfigurationRequest, ConfigurationResponse,
    GraphQlRequest, InstanceStatus, MessageReceived, OutgoingMessage,
    SearchRequest, SearchResponse, SearchThreadInput, SentMessage,
};
use chatplug_subscription::{
    delivery_channels, generate_id, spawn_router, RouterHandle, SubscriptionId,
    SubscriptionKind,
};
use chatplug_transport::ConnectionState;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::{ClientConfig, ClientError, GqlClient};

/// Everything the core pushes to the plugin.
///
/// Every receiver yields `None` once the connection is closed. `errors`
/// carries at most one item: the read failure that ended the connection.
#[derive(Debug)]
pub struct Inbox {
    pub messages: mpsc::Receiver<MessageReceived>,
    pub configuration: mpsc::Receiver<ConfigurationResponse>,
    pub search_requests: mpsc::Receiver<SearchRequest>,
    pub errors: mpsc::Receiver<ClientError>,
}

/// Builder for a connected [`ChatPlugClient`].
///
/// # Example
///
/// ```rust,no_run
/// use chatplug::prelude::*;
///
/// # async fn run() -> Result<(), ClientError> {
/// let (client, mut inbox) = ChatPlugClient::builder()
///     .ws_url("ws://localhost:2137/query")
///     .http_url("http://localhost:2137/query")
///     .access_token("secret")
///     .connect()
///     .await?;
/// client.subscribe_messages().await?;
/// while let Some(event) = inbox.messages.recv().await {
///     println!("{}", event.message.body);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChatPlugClientBuilder {
    config: ClientConfig,
}

impl ChatPlugClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subscription endpoint.
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.config.ws_url = url.into();
        self
    }

    /// Sets the HTTP endpoint for queries and mutations.
    pub fn http_url(mut self, url: impl Into<String>) -> Self {
        self.config.http_url = url.into();
        self
    }

    /// Sets the token used on both paths.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = token.into();
        self
    }

    /// Sets how long to wait for `connection_ack`.
    pub fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.config.ack_timeout = timeout;
        self
    }

    /// Sets how many events each delivery channel buffers.
    pub fn delivery_capacity(mut self, capacity: usize) -> Self {
        self.config.delivery_capacity = capacity;
        self
    }

    /// Sets an overall timeout for HTTP requests.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Connects, runs the handshake and starts routing.
    pub async fn connect(self) -> Result<(ChatPlugClient, Inbox), ClientError> {
        ChatPlugClient::connect(self.config).await
    }
}

/// A plugin's connection to the core.
///
/// Subscriptions are started with the `subscribe_*` methods and deliver
/// into the [`Inbox`] returned by [`connect`](Self::connect). Mutations go
/// over HTTP and return their result.
pub struct ChatPlugClient {
    gql: GqlClient,
    router: RouterHandle,
}

impl ChatPlugClient {
    /// Creates a new builder.
    pub fn builder() -> ChatPlugClientBuilder {
        ChatPlugClientBuilder::new()
    }

    /// Connects to the core described by `config`.
    pub async fn connect(config: ClientConfig) -> Result<(Self, Inbox), ClientError> {
        let (gql, incoming) = GqlClient::connect(&config).await?;
        let (outlets, channels) = delivery_channels(config.delivery_capacity);
        let router = spawn_router(incoming.frames, outlets, gql.lifecycle());

        let inbox = Inbox {
            messages: channels.messages,
            configuration: channels.configuration,
            search_requests: channels.search_requests,
            errors: incoming.errors,
        };
        Ok((Self { gql, router }, inbox))
    }

    /// Subscribes to messages the core wants sent on the plugin's service.
    pub async fn subscribe_messages(&self) -> Result<SubscriptionId, ClientError> {
        self.subscribe(SubscriptionKind::Messages, Map::new()).await
    }

    /// Subscribes to thread search requests.
    pub async fn subscribe_search_requests(
        &self,
    ) -> Result<SubscriptionId, ClientError> {
        self.subscribe(SubscriptionKind::SearchRequests, Map::new()).await
    }

    /// Asks the core's user for configuration; answers arrive on
    /// [`Inbox::configuration`].
    pub async fn subscribe_configuration(
        &self,
        fields: &[ConfigurationField],
    ) -> Result<SubscriptionId, ClientError> {
        let request = GraphQlRequest::with_variables(
            operations::CONFIGURATION_RECEIVED,
            &ConfigurationRequest {
                fields: fields.to_vec(),
            },
        )?;
        self.subscribe(SubscriptionKind::Configuration, request.variables)
            .await
    }

    async fn subscribe(
        &self,
        kind: SubscriptionKind,
        variables: Map<String, Value>,
    ) -> Result<SubscriptionId, ClientError> {
        let state = self.state();
        if !state.is_ready() {
            return Err(ClientError::NotReady(state));
        }
        let id = generate_id();
        // Registered before `start` goes out so the first frame is routed.
        self.router.register(id.clone(), kind).await?;
        let request = GraphQlRequest {
            query: kind.query().to_string(),
            variables,
        };
        if let Err(e) = self.gql.start(&id, request).await {
            // The router is gone too if the connection closed meanwhile.
            let _ = self.router.deregister(id).await;
            return Err(e);
        }
        tracing::info!(%id, %kind, "subscribed");
        Ok(id)
    }

    /// Forwards a message from the plugin's service into the core.
    pub async fn send_message(
        &self,
        message: &OutgoingMessage,
    ) -> Result<SentMessage, ClientError> {
        let request = GraphQlRequest::with_variables(operations::SEND_MESSAGE, message)?;
        self.mutate(&request, operations::SEND_MESSAGE_FIELD)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    thread = %message.origin_thread_id,
                    error = %e,
                    "sendMessage failed"
                );
            })
    }

    /// Answers the search request `for_query` with `threads`.
    pub async fn set_search_response(
        &self,
        for_query: &str,
        threads: &[SearchThreadInput],
    ) -> Result<SearchResponse, ClientError> {
        let res = serde_json::to_value(threads)
            .map_err(chatplug_protocol::ProtocolError::Encode)?;
        let request = GraphQlRequest::new(operations::SET_SEARCH_RESPONSE)
            .var("q", for_query)
            .var("res", res);
        self.mutate(&request, operations::SET_SEARCH_RESPONSE_FIELD)
            .await
            .inspect_err(|e| {
                tracing::warn!(query = for_query, error = %e, "setSearchResponse failed");
            })
    }

    /// Reports this instance as initialized.
    pub async fn set_instance_initialized(
        &self,
    ) -> Result<InstanceStatus, ClientError> {
        let request = GraphQlRequest::new(operations::SET_INSTANCE_STATUS);
        self.mutate(&request, operations::SET_INSTANCE_STATUS_FIELD)
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, "setInstanceStatus failed");
            })
    }

    async fn mutate<T: DeserializeOwned>(
        &self,
        request: &GraphQlRequest,
        field: &str,
    ) -> Result<T, ClientError> {
        self.gql.requests().request_field(request, field).await
    }

    /// Runs an arbitrary query or mutation over HTTP.
    pub async fn request(
        &self,
        query: &str,
        variables: Map<String, Value>,
    ) -> Result<Map<String, Value>, ClientError> {
        self.gql.request(query, variables).await
    }

    /// The current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.gql.state()
    }

    /// Closes the connection. Every [`Inbox`] receiver then yields `None`.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.gql.close().await
    }
}
