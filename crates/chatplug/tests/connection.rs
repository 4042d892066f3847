//! `GqlClient` over a scripted in-memory connection.
//!
//! The script decides what each `recv` returns, so read failures and
//! exact frame sequences can be driven without a socket.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatplug::protocol::FrameType;
use chatplug::subscription::SubscriptionId;
use chatplug::transport::{Connection, ConnectionId, ConnectionState, TransportError};
use chatplug::{ClientConfig, ClientError, GqlClient, IncomingStreams};
use serde_json::{json, Map, Value};

// =========================================================================
// Scripted connection
// =========================================================================

type Reply = Result<Option<Vec<u8>>, TransportError>;

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<Value>>,
    recv_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

/// Plays back `Script::replies`, then parks every further `recv`.
struct Scripted(Arc<Script>);

impl Connection for Scripted {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let frame = serde_json::from_slice(data).expect("client sends JSON");
        self.0.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        self.0.recv_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.0.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => std::future::pending().await,
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.0.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        ConnectionId::new(99)
    }
}

fn text(value: Value) -> Reply {
    Ok(Some(value.to_string().into_bytes()))
}

fn ack() -> Reply {
    text(json!({"type": "connection_ack"}))
}

fn read_failure() -> Reply {
    Err(TransportError::ReceiveFailed(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "dead",
    )))
}

async fn connect(
    replies: Vec<Reply>,
) -> (GqlClient<Scripted>, IncomingStreams, Arc<Script>) {
    let script = Arc::new(Script {
        replies: Mutex::new(replies.into()),
        ..Script::default()
    });
    let config = ClientConfig {
        ack_timeout: Duration::from_secs(2),
        ..ClientConfig::default()
    };
    let (client, streams) = GqlClient::with_connection(Scripted(Arc::clone(&script)), &config)
        .await
        .expect("handshake should succeed");
    (client, streams, script)
}

async fn next<T>(rx: &mut tokio::sync::mpsc::Receiver<T>) -> Option<T> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for channel")
}

fn sent(script: &Script) -> Vec<Value> {
    script.sent.lock().unwrap().clone()
}

// =========================================================================
// Read loop termination
// =========================================================================

#[tokio::test]
async fn test_read_failure_reports_once_and_closes() {
    let (client, mut streams, script) = connect(vec![
        ack(),
        text(json!({"type": "data", "id": "abcd0123", "payload": {"data": {}}})),
        read_failure(),
    ])
    .await;

    let frame = next(&mut streams.frames).await.expect("frame before failure");
    assert_eq!(frame.kind, FrameType::Data);
    assert_eq!(frame.id.as_deref(), Some("abcd0123"));

    let error = next(&mut streams.errors).await.expect("terminal error");
    assert!(matches!(
        error,
        ClientError::Transport(TransportError::ReceiveFailed(_))
    ));
    assert!(next(&mut streams.errors).await.is_none());
    assert!(next(&mut streams.frames).await.is_none());
    assert_eq!(client.state(), ConnectionState::Closed);

    // Handshake, data frame, failure. Nothing is read after the failure.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(script.recv_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_close_after_read_failure_still_releases_socket() {
    let (client, mut streams, script) = connect(vec![ack(), read_failure()]).await;
    assert!(next(&mut streams.errors).await.is_some());
    assert_eq!(client.state(), ConnectionState::Closed);

    client.close().await.unwrap();

    assert_eq!(script.close_calls.load(Ordering::SeqCst), 1);
    // No goodbye on a connection the server already dropped.
    assert!(sent(&script).iter().all(|f| f["type"] != "connection_terminate"));
}

#[tokio::test]
async fn test_clean_eof_closes_without_error() {
    let (client, mut streams, _script) = connect(vec![ack(), Ok(None)]).await;

    assert!(next(&mut streams.frames).await.is_none());
    assert!(next(&mut streams.errors).await.is_none());
    assert_eq!(client.state(), ConnectionState::Closed);
}

// =========================================================================
// Outbound operations
// =========================================================================

#[tokio::test]
async fn test_subscribe_sends_start_with_fresh_id() {
    let (client, _streams, script) = connect(vec![ack()]).await;

    let mut variables = Map::new();
    variables.insert("room".into(), json!("general"));
    let id = client
        .subscribe("subscription { ping }", variables)
        .await
        .unwrap();

    assert_eq!(id.as_str().len(), 8);
    let frames = sent(&script);
    assert_eq!(frames[0]["type"], "connection_init");
    assert_eq!(
        frames[1],
        json!({
            "type": "start",
            "id": id.as_str(),
            "payload": {"query": "subscription { ping }", "variables": {"room": "general"}}
        })
    );
}

#[tokio::test]
async fn test_stop_sends_stop_frame() {
    let (client, _streams, script) = connect(vec![ack()]).await;
    let id = SubscriptionId::new("0badf00d");

    client.stop(&id).await.unwrap();

    assert_eq!(
        sent(&script).last(),
        Some(&json!({"type": "stop", "id": "0badf00d"}))
    );
}

#[tokio::test]
async fn test_operations_after_close_are_not_ready() {
    let (client, _streams, script) = connect(vec![ack()]).await;

    client.close().await.unwrap();
    client.close().await.unwrap();

    assert_eq!(
        sent(&script).last(),
        Some(&json!({"type": "connection_terminate"}))
    );
    assert!(matches!(
        client.subscribe("subscription { ping }", Map::new()).await,
        Err(ClientError::NotReady(ConnectionState::Closed))
    ));
    assert!(matches!(
        client.stop(&SubscriptionId::new("0badf00d")).await,
        Err(ClientError::NotReady(ConnectionState::Closed))
    ));
}
