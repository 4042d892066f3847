//! The graphql-ws connection manager.
//!
//! [`GqlClient`] owns one duplex connection to the core. Connecting runs
//! the `connection_init` / `connection_ack` handshake, then a background
//! read loop decodes every inbound frame's envelope and hands it on
//! through [`IncomingStreams`]. Sorting frames by subscription happens one
//! layer up.

use std::sync::Arc;

use chatplug_protocol::{
    FrameType, GraphQlRequest, IncomingPayload, InitPayload, JsonCodec,
    OperationMessage,
};
use chatplug_subscription::{generate_id, SubscriptionId};
use chatplug_transport::{Connection, ConnectionState, WebSocketConnection};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};

use crate::{ClientConfig, ClientError, RequestClient};

/// What the read loop produces.
///
/// `frames` ends when the connection closes. `errors` carries at most one
/// terminal error, sent just before the read loop stops.
#[derive(Debug)]
pub struct IncomingStreams {
    pub frames: mpsc::Receiver<IncomingPayload>,
    pub errors: mpsc::Receiver<ClientError>,
}

/// A ready graphql-ws connection plus the HTTP client for one-shot
/// requests.
///
/// Dropping it closes the lifecycle, which stops the read loop.
pub struct GqlClient<C: Connection = WebSocketConnection> {
    conn: Arc<C>,
    codec: JsonCodec,
    requests: RequestClient,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl GqlClient<WebSocketConnection> {
    /// Dials `config.ws_url` with the configured subprotocol and performs
    /// the handshake.
    pub async fn connect(
        config: &ClientConfig,
    ) -> Result<(Self, IncomingStreams), ClientError> {
        tracing::info!(url = %config.ws_url, "connecting to core");
        let conn =
            WebSocketConnection::connect(&config.ws_url, Some(&config.subprotocol))
                .await?;
        Self::with_connection(conn, config).await
    }
}

impl<C: Connection> GqlClient<C> {
    /// Performs the handshake over an already-open connection and starts
    /// the read loop.
    ///
    /// # Errors
    /// `HandshakeRejected` on `connection_error`, `UnexpectedFrame` for
    /// any other frame before the ack, `HandshakeTimeout` if no ack
    /// arrives within `config.ack_timeout`, and `Closed` if the server
    /// hangs up first.
    pub async fn with_connection(
        conn: C,
        config: &ClientConfig,
    ) -> Result<(Self, IncomingStreams), ClientError> {
        let client = Self {
            conn: Arc::new(conn),
            codec: JsonCodec,
            requests: RequestClient::new(config)?,
            state: Arc::new(watch::Sender::new(ConnectionState::Connecting)),
        };
        client.transition(ConnectionState::Initializing);

        let handshake = tokio::time::timeout(
            config.ack_timeout,
            client.handshake(&config.access_token),
        )
        .await
        .unwrap_or_else(|_| Err(ClientError::HandshakeTimeout));
        if let Err(e) = handshake {
            tracing::warn!(id = %client.conn.id(), error = %e, "handshake failed");
            mark_closed(&client.state);
            let _ = client.conn.close().await;
            return Err(e);
        }

        client.transition(ConnectionState::Ready);
        tracing::info!(id = %client.conn.id(), "connection ready");

        let (frames_tx, frames_rx) = mpsc::channel(config.frame_capacity.max(1));
        let (errors_tx, errors_rx) = mpsc::channel(1);
        tokio::spawn(read_loop(
            Arc::clone(&client.conn),
            client.codec,
            frames_tx,
            errors_tx,
            Arc::clone(&client.state),
        ));

        Ok((
            client,
            IncomingStreams {
                frames: frames_rx,
                errors: errors_rx,
            },
        ))
    }

    async fn handshake(&self, access_token: &str) -> Result<(), ClientError> {
        self.send_operation(&OperationMessage::ConnectionInit {
            payload: InitPayload {
                access_token: access_token.to_string(),
            },
        })
        .await?;

        loop {
            let Some(bytes) = self.conn.recv().await? else {
                return Err(ClientError::Closed);
            };
            let frame = self.codec.decode_incoming(&bytes)?;
            match frame.kind {
                FrameType::ConnectionAck => return Ok(()),
                FrameType::KeepAlive => {
                    tracing::trace!(id = %self.conn.id(), "keep-alive during handshake");
                }
                FrameType::ConnectionError => {
                    let reason = frame.raw_payload().unwrap_or_default().to_string();
                    return Err(ClientError::HandshakeRejected(reason));
                }
                other => return Err(ClientError::UnexpectedFrame(other)),
            }
        }
    }

    /// Starts a subscription under a fresh ID and returns the ID.
    ///
    /// Returns as soon as `start` is written; events arrive on the frame
    /// stream tagged with the returned ID.
    pub async fn subscribe(
        &self,
        query: &str,
        variables: Map<String, Value>,
    ) -> Result<SubscriptionId, ClientError> {
        let id = generate_id();
        let request = GraphQlRequest {
            query: query.to_string(),
            variables,
        };
        self.start(&id, request).await?;
        Ok(id)
    }

    /// Sends `start` for a caller-chosen ID.
    ///
    /// Use this when the ID must be known (registered for routing, say)
    /// before the first frame can answer it.
    pub async fn start(
        &self,
        id: &SubscriptionId,
        request: GraphQlRequest,
    ) -> Result<(), ClientError> {
        self.ensure_ready()?;
        self.send_operation(&OperationMessage::Start {
            id: id.to_string(),
            payload: request,
        })
        .await?;
        tracing::debug!(conn = %self.conn.id(), %id, "subscription started");
        Ok(())
    }

    /// Asks the server to stop the subscription `id`. The server answers
    /// with `complete`.
    pub async fn stop(&self, id: &SubscriptionId) -> Result<(), ClientError> {
        self.ensure_ready()?;
        self.send_operation(&OperationMessage::Stop { id: id.to_string() })
            .await?;
        tracing::debug!(conn = %self.conn.id(), %id, "subscription stop sent");
        Ok(())
    }

    /// Runs a one-shot query or mutation over HTTP.
    pub async fn request(
        &self,
        query: &str,
        variables: Map<String, Value>,
    ) -> Result<Map<String, Value>, ClientError> {
        let request = GraphQlRequest {
            query: query.to_string(),
            variables,
        };
        self.requests.request(&request).await
    }

    /// The HTTP client used by [`request`](Self::request).
    pub fn requests(&self) -> &RequestClient {
        &self.requests
    }

    /// The current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every lifecycle change.
    pub fn lifecycle(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Closes the connection. Calling it again only re-releases the socket.
    ///
    /// The lifecycle moves to `Closed` first, so the read loop and any
    /// blocked delivery stop even if the goodbye below fails.
    pub async fn close(&self) -> Result<(), ClientError> {
        if !mark_closed(&self.state) {
            // Already closed, possibly by the read loop after the server
            // went away. The socket may still be held open on our side.
            if let Err(e) = self.conn.close().await {
                tracing::trace!(id = %self.conn.id(), error = %e, "socket already released");
            }
            return Ok(());
        }
        tracing::info!(id = %self.conn.id(), "closing connection");

        if let Err(e) = self
            .send_operation(&OperationMessage::ConnectionTerminate)
            .await
        {
            tracing::debug!(id = %self.conn.id(), error = %e, "connection_terminate not sent");
        }
        self.conn.close().await?;
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), ClientError> {
        let state = self.state();
        if state.is_ready() {
            Ok(())
        } else {
            Err(ClientError::NotReady(state))
        }
    }

    async fn send_operation(&self, msg: &OperationMessage) -> Result<(), ClientError> {
        let bytes = self.codec.encode_operation(msg)?;
        tracing::trace!(id = %self.conn.id(), frame = %msg.frame_type(), "sending");
        self.conn.send(&bytes).await?;
        Ok(())
    }

    fn transition(&self, next: ConnectionState) {
        self.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        });
    }
}

impl<C: Connection> Drop for GqlClient<C> {
    fn drop(&mut self) {
        mark_closed(&self.state);
    }
}

/// Moves the lifecycle to `Closed`. Returns `false` if it already was.
fn mark_closed(state: &watch::Sender<ConnectionState>) -> bool {
    state.send_if_modified(|s| {
        if s.is_closed() {
            false
        } else {
            *s = ConnectionState::Closed;
            true
        }
    })
}

async fn wait_closed(lifecycle: &mut watch::Receiver<ConnectionState>) {
    let _ = lifecycle.wait_for(ConnectionState::is_closed).await;
}

/// Reads frames until the connection or the lifecycle closes.
///
/// A read error is reported once on `errors` and ends the loop. Either
/// way the lifecycle ends up `Closed` and both channels are dropped.
async fn read_loop<C: Connection>(
    conn: Arc<C>,
    codec: JsonCodec,
    frames: mpsc::Sender<IncomingPayload>,
    errors: mpsc::Sender<ClientError>,
    state: Arc<watch::Sender<ConnectionState>>,
) {
    let id = conn.id();
    let mut lifecycle = state.subscribe();
    tracing::debug!(%id, "read loop started");

    loop {
        let received = tokio::select! {
            received = conn.recv() => received,
            () = wait_closed(&mut lifecycle) => break,
        };

        let bytes = match received {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::info!(%id, "server closed the connection");
                break;
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "read failed, stopping read loop");
                let _ = errors.try_send(e.into());
                break;
            }
        };

        let frame = match codec.decode_incoming(&bytes) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(%id, error = %e, body = %e.snippet(), "skipping undecodable frame");
                continue;
            }
        };

        match frame.kind {
            FrameType::KeepAlive => {
                tracing::trace!(%id, "keep-alive");
                continue;
            }
            // Errors tagged with a subscription are the router's to report.
            FrameType::Error | FrameType::ConnectionError if frame.id.is_none() => {
                log_server_errors(&frame);
                continue;
            }
            _ => {}
        }

        tokio::select! {
            sent = frames.send(frame) => {
                if sent.is_err() {
                    tracing::debug!(%id, "frame receiver dropped");
                    break;
                }
            }
            () = wait_closed(&mut lifecycle) => break,
        }
    }

    mark_closed(&state);
    tracing::debug!(%id, "read loop stopped");
}

fn log_server_errors(frame: &IncomingPayload) {
    match frame.server_errors() {
        Ok(errors) => {
            for error in &errors {
                tracing::warn!(frame = %frame.kind, %error, "server error");
            }
        }
        Err(e) => {
            tracing::warn!(frame = %frame.kind, error = %e, "undecodable server error");
        }
    }
}
