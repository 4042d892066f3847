//! Router actor: demultiplexes inbound frames into typed delivery channels.
//!
//! The router runs in its own Tokio task and owns the [`Registry`] and the
//! sending half of every delivery channel. Registrations come in as
//! commands through a [`RouterHandle`], so nothing is shared and no lock
//! is needed even when subscribing while frames are flowing.
//!
//! Deliveries await receiver capacity. A slow consumer therefore stalls
//! routing for every kind (and, through the bounded frame channel, the
//! read loop). Closing the connection releases a stalled delivery.

use chatplug_protocol::{
    ConfigurationResponse, FrameType, GraphQlResponse, IncomingPayload,
    MessageReceived, SearchRequest,
};
use chatplug_transport::ConnectionState;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};

use crate::{Registry, SubscriptionError, SubscriptionId, SubscriptionKind};

/// Command channel size for the router actor.
const COMMAND_CHANNEL_SIZE: usize = 16;

/// Receiving halves of the three delivery channels, handed to the caller.
///
/// Each `recv()` returns `None` once the router has stopped, which
/// happens when the connection closes.
#[derive(Debug)]
pub struct DeliveryChannels {
    pub messages: mpsc::Receiver<MessageReceived>,
    pub configuration: mpsc::Receiver<ConfigurationResponse>,
    pub search_requests: mpsc::Receiver<SearchRequest>,
}

/// Sending halves of the delivery channels, moved into the router.
#[derive(Debug)]
pub struct Outlets {
    messages: mpsc::Sender<MessageReceived>,
    configuration: mpsc::Sender<ConfigurationResponse>,
    search_requests: mpsc::Sender<SearchRequest>,
}

/// Creates the three delivery channels, each holding `capacity` items.
pub fn delivery_channels(capacity: usize) -> (Outlets, DeliveryChannels) {
    let capacity = capacity.max(1);
    let (messages_tx, messages_rx) = mpsc::channel(capacity);
    let (configuration_tx, configuration_rx) = mpsc::channel(capacity);
    let (search_tx, search_rx) = mpsc::channel(capacity);
    (
        Outlets {
            messages: messages_tx,
            configuration: configuration_tx,
            search_requests: search_tx,
        },
        DeliveryChannels {
            messages: messages_rx,
            configuration: configuration_rx,
            search_requests: search_rx,
        },
    )
}

/// Commands sent to the router actor.
enum RouterCommand {
    /// Route `data` frames tagged `id` to the channel for `kind`.
    Register {
        id: SubscriptionId,
        kind: SubscriptionKind,
    },
    /// Stop routing frames tagged `id`.
    Deregister { id: SubscriptionId },
}

/// Handle to a running router. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RouterHandle {
    sender: mpsc::Sender<RouterCommand>,
}

impl RouterHandle {
    /// Registers `id` for `kind`.
    ///
    /// Returns once the command is queued. Commands are handled ahead of
    /// frames, so registering before sending `start` guarantees the first
    /// answering frame finds the registration.
    pub async fn register(
        &self,
        id: SubscriptionId,
        kind: SubscriptionKind,
    ) -> Result<(), SubscriptionError> {
        self.sender
            .send(RouterCommand::Register { id, kind })
            .await
            .map_err(|_| SubscriptionError::RouterStopped)
    }

    /// Drops the registration for `id`, if it is still the live one.
    ///
    /// Used when a subscription registered ahead of its `start` never
    /// actually went out.
    pub async fn deregister(&self, id: SubscriptionId) -> Result<(), SubscriptionError> {
        self.sender
            .send(RouterCommand::Deregister { id })
            .await
            .map_err(|_| SubscriptionError::RouterStopped)
    }

    /// Returns `true` once the router task has exited.
    pub fn is_stopped(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Spawns the router task.
///
/// It stops when `frames` ends or `lifecycle` reaches
/// [`ConnectionState::Closed`], dropping the outlets so every
/// [`DeliveryChannels`] receiver observes `None`.
pub fn spawn_router(
    frames: mpsc::Receiver<IncomingPayload>,
    outlets: Outlets,
    lifecycle: watch::Receiver<ConnectionState>,
) -> RouterHandle {
    let (sender, commands) = mpsc::channel(COMMAND_CHANNEL_SIZE);
    let router = Router {
        registry: Registry::new(),
        outlets,
        commands,
        frames,
        lifecycle,
    };
    tokio::spawn(router.run());
    RouterHandle { sender }
}

/// The internal router state. Runs inside a Tokio task.
struct Router {
    registry: Registry,
    outlets: Outlets,
    commands: mpsc::Receiver<RouterCommand>,
    frames: mpsc::Receiver<IncomingPayload>,
    lifecycle: watch::Receiver<ConnectionState>,
}

impl Router {
    async fn run(mut self) {
        tracing::debug!("subscription router started");

        loop {
            tokio::select! {
                biased;

                Some(cmd) = self.commands.recv() => self.handle_command(cmd),
                frame = self.frames.recv() => match frame {
                    Some(frame) => {
                        if !self.route(frame).await {
                            break;
                        }
                    }
                    None => break,
                },
                () = wait_closed(&mut self.lifecycle) => break,
            }
        }

        tracing::debug!(
            registrations = self.registry.len(),
            "subscription router stopped"
        );
    }

    fn handle_command(&mut self, cmd: RouterCommand) {
        match cmd {
            RouterCommand::Register { id, kind } => {
                tracing::debug!(%id, %kind, "subscription registered");
                if let Some(old) = self.registry.register(id, kind) {
                    tracing::debug!(%old, %kind, "replaced previous subscription");
                }
            }
            RouterCommand::Deregister { id } => {
                if let Some(kind) = self.registry.remove(id.as_str()) {
                    tracing::debug!(%id, %kind, "subscription deregistered");
                }
            }
        }
    }

    /// Routes one frame. Returns `false` if the router must stop.
    async fn route(&mut self, frame: IncomingPayload) -> bool {
        let Some(id) = frame.id.as_deref() else {
            tracing::debug!(frame = %frame.kind, "dropping frame without id");
            return true;
        };
        let Some(kind) = self.registry.lookup(id) else {
            tracing::debug!(id, frame = %frame.kind, "no subscription for frame, dropping");
            return true;
        };

        match frame.kind {
            FrameType::Data => self.deliver(id, kind, &frame).await,
            FrameType::Complete => {
                self.registry.remove(id);
                tracing::info!(id, %kind, "subscription completed by server");
                true
            }
            FrameType::Error => {
                match frame.server_errors() {
                    Ok(errors) => {
                        for error in &errors {
                            tracing::warn!(id, %kind, %error, "subscription error");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(id, %kind, error = %e, "undecodable subscription error");
                    }
                }
                true
            }
            other => {
                tracing::debug!(id, %kind, frame = %other, "ignoring frame");
                true
            }
        }
    }

    async fn deliver(
        &mut self,
        id: &str,
        kind: SubscriptionKind,
        frame: &IncomingPayload,
    ) -> bool {
        let response = match frame.response() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    id, %kind, error = %e, body = %e.snippet(),
                    "dropping undecodable data frame"
                );
                return true;
            }
        };
        for error in &response.errors {
            tracing::warn!(id, %kind, %error, "server reported error in data frame");
        }

        let lifecycle = &mut self.lifecycle;
        match kind {
            SubscriptionKind::Messages => {
                forward(id, kind, &response, &self.outlets.messages, lifecycle).await
            }
            SubscriptionKind::Configuration => {
                forward(id, kind, &response, &self.outlets.configuration, lifecycle)
                    .await
            }
            SubscriptionKind::SearchRequests => {
                forward(id, kind, &response, &self.outlets.search_requests, lifecycle)
                    .await
            }
        }
    }
}

/// Decodes `kind`'s body out of `response` and sends it on `tx`.
///
/// Returns `false` only if the connection closed while waiting for the
/// receiver. A decode failure or a dropped receiver loses this one event.
async fn forward<T: DeserializeOwned>(
    id: &str,
    kind: SubscriptionKind,
    response: &GraphQlResponse,
    tx: &mpsc::Sender<T>,
    lifecycle: &mut watch::Receiver<ConnectionState>,
) -> bool {
    let body: T = match response.field(kind.field()) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(
                id, %kind, error = %e, body = %e.snippet(),
                "dropping data frame with bad body"
            );
            return true;
        }
    };

    tokio::select! {
        result = tx.send(body) => {
            if result.is_err() {
                tracing::debug!(id, %kind, "delivery receiver dropped");
            }
            true
        }
        () = wait_closed(lifecycle) => {
            tracing::debug!(id, %kind, "connection closed, discarding pending delivery");
            false
        }
    }
}

/// Resolves once the connection is closed (or its state sender is gone).
async fn wait_closed(lifecycle: &mut watch::Receiver<ConnectionState>) {
    let _ = lifecycle.wait_for(ConnectionState::is_closed).await;
}
