//! Integration tests for the router actor.
//!
//! Frames are pushed straight into the router's input channel, so these
//! tests exercise routing, decoding and teardown without any network.

use std::time::Duration;

use chatplug_protocol::IncomingPayload;
use chatplug_subscription::{
    delivery_channels, spawn_router, DeliveryChannels, RouterHandle,
    SubscriptionId, SubscriptionKind,
};
use chatplug_transport::ConnectionState;
use serde_json::json;
use tokio::sync::{mpsc, watch};

// =========================================================================
// Helpers
// =========================================================================

struct Harness {
    frames: mpsc::Sender<IncomingPayload>,
    lifecycle: watch::Sender<ConnectionState>,
    router: RouterHandle,
    channels: DeliveryChannels,
}

fn start(capacity: usize) -> Harness {
    let (frames_tx, frames_rx) = mpsc::channel(8);
    let (lifecycle, lifecycle_rx) = watch::channel(ConnectionState::Ready);
    let (outlets, channels) = delivery_channels(capacity);
    let router = spawn_router(frames_rx, outlets, lifecycle_rx);
    Harness {
        frames: frames_tx,
        lifecycle,
        router,
        channels,
    }
}

fn frame(value: serde_json::Value) -> IncomingPayload {
    // RawValue needs a text deserializer, so go through a string.
    serde_json::from_str(&value.to_string()).expect("valid frame")
}

fn message_frame(id: &str, target: &str) -> IncomingPayload {
    frame(json!({
        "type": "data",
        "id": id,
        "payload": {"data": {"messageReceived": {
            "message": {"body": "hello", "author": {"username": "bob"}},
            "targetThreadId": target
        }}}
    }))
}

fn search_frame(id: &str, query: &str) -> IncomingPayload {
    frame(json!({
        "type": "data",
        "id": id,
        "payload": {"data": {"subscribeToSearchRequests": {"query": query}}}
    }))
}

async fn recv<T>(rx: &mut mpsc::Receiver<T>) -> Option<T> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for delivery")
}

async fn register(h: &Harness, id: &str, kind: SubscriptionKind) {
    h.router
        .register(SubscriptionId::new(id), kind)
        .await
        .expect("router running");
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_data_frame_delivered_on_registered_kind() {
    let mut h = start(1);
    register(&h, "abc1", SubscriptionKind::Messages).await;

    h.frames.send(message_frame("abc1", "t1")).await.unwrap();

    let received = recv(&mut h.channels.messages).await.unwrap();
    assert_eq!(received.target_thread_id, "t1");
    assert_eq!(received.message.body, "hello");
}

#[tokio::test]
async fn test_unmatched_id_dropped_and_later_frames_delivered() {
    let mut h = start(1);
    register(&h, "abc1", SubscriptionKind::Messages).await;

    h.frames.send(message_frame("zzzz", "lost")).await.unwrap();
    h.frames.send(message_frame("abc1", "t2")).await.unwrap();

    let received = recv(&mut h.channels.messages).await.unwrap();
    assert_eq!(received.target_thread_id, "t2");
}

#[tokio::test]
async fn test_malformed_body_dropped_and_next_frame_delivered() {
    let mut h = start(1);
    register(&h, "s1", SubscriptionKind::SearchRequests).await;

    // `query` has the wrong type: the body fails to decode.
    h.frames
        .send(frame(json!({
            "type": "data",
            "id": "s1",
            "payload": {"data": {"subscribeToSearchRequests": {"query": 12}}}
        })))
        .await
        .unwrap();
    // No `data` at all.
    h.frames
        .send(frame(json!({"type": "data", "id": "s1", "payload": {"errors": [{"message": "x"}]}})))
        .await
        .unwrap();
    h.frames.send(search_frame("s1", "cats")).await.unwrap();

    let request = recv(&mut h.channels.search_requests).await.unwrap();
    assert_eq!(request.query, "cats");
    assert!(h.channels.search_requests.try_recv().is_err());
}

#[tokio::test]
async fn test_frames_routed_to_their_own_kind() {
    let mut h = start(1);
    register(&h, "m", SubscriptionKind::Messages).await;
    register(&h, "c", SubscriptionKind::Configuration).await;
    register(&h, "s", SubscriptionKind::SearchRequests).await;

    h.frames
        .send(frame(json!({
            "type": "data",
            "id": "c",
            "payload": {"data": {"configurationReceived": {"fieldValues": ["token", "42"]}}}
        })))
        .await
        .unwrap();
    h.frames.send(search_frame("s", "dogs")).await.unwrap();
    h.frames.send(message_frame("m", "t9")).await.unwrap();

    let config = recv(&mut h.channels.configuration).await.unwrap();
    assert_eq!(config.field_values, vec!["token", "42"]);
    assert_eq!(recv(&mut h.channels.search_requests).await.unwrap().query, "dogs");
    assert_eq!(recv(&mut h.channels.messages).await.unwrap().target_thread_id, "t9");
}

#[tokio::test]
async fn test_resubscribing_a_kind_replaces_the_old_id() {
    let mut h = start(1);
    register(&h, "old", SubscriptionKind::Messages).await;
    register(&h, "new", SubscriptionKind::Messages).await;

    h.frames.send(message_frame("old", "stale")).await.unwrap();
    h.frames.send(message_frame("new", "fresh")).await.unwrap();

    assert_eq!(recv(&mut h.channels.messages).await.unwrap().target_thread_id, "fresh");
}

#[tokio::test]
async fn test_complete_removes_registration() {
    let mut h = start(1);
    register(&h, "m", SubscriptionKind::Messages).await;

    h.frames.send(frame(json!({"type": "complete", "id": "m"}))).await.unwrap();
    h.frames.send(message_frame("m", "after-complete")).await.unwrap();
    register(&h, "m2", SubscriptionKind::Messages).await;
    h.frames.send(message_frame("m2", "t3")).await.unwrap();

    assert_eq!(recv(&mut h.channels.messages).await.unwrap().target_thread_id, "t3");
}

#[tokio::test]
async fn test_deregister_drops_frames_for_that_id() {
    let mut h = start(1);
    register(&h, "gone", SubscriptionKind::Messages).await;
    h.router
        .deregister(SubscriptionId::new("gone"))
        .await
        .expect("router running");

    h.frames.send(message_frame("gone", "never")).await.unwrap();
    register(&h, "live", SubscriptionKind::Messages).await;
    h.frames.send(message_frame("live", "t5")).await.unwrap();

    assert_eq!(recv(&mut h.channels.messages).await.unwrap().target_thread_id, "t5");
}

#[tokio::test]
async fn test_deregister_of_replaced_id_keeps_current_registration() {
    let mut h = start(1);
    register(&h, "old", SubscriptionKind::Messages).await;
    register(&h, "new", SubscriptionKind::Messages).await;
    h.router
        .deregister(SubscriptionId::new("old"))
        .await
        .expect("router running");

    h.frames.send(message_frame("new", "t6")).await.unwrap();

    assert_eq!(recv(&mut h.channels.messages).await.unwrap().target_thread_id, "t6");
}

#[tokio::test]
async fn test_error_frame_does_not_stop_routing() {
    let mut h = start(1);
    register(&h, "m", SubscriptionKind::Messages).await;

    h.frames
        .send(frame(json!({"type": "error", "id": "m", "payload": [{"message": "boom"}]})))
        .await
        .unwrap();
    h.frames.send(message_frame("m", "t4")).await.unwrap();

    assert_eq!(recv(&mut h.channels.messages).await.unwrap().target_thread_id, "t4");
}

#[tokio::test]
async fn test_closing_lifecycle_closes_delivery_channels() {
    let mut h = start(1);
    register(&h, "m", SubscriptionKind::Messages).await;

    h.lifecycle.send_replace(ConnectionState::Closed);

    assert!(recv(&mut h.channels.messages).await.is_none());
    assert!(recv(&mut h.channels.configuration).await.is_none());
    assert!(recv(&mut h.channels.search_requests).await.is_none());
    assert!(
        h.router
            .register(SubscriptionId::new("late"), SubscriptionKind::Messages)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_close_releases_a_blocked_delivery() {
    let mut h = start(1);
    register(&h, "m", SubscriptionKind::Messages).await;

    // First frame fills the channel, second one blocks the router.
    h.frames.send(message_frame("m", "first")).await.unwrap();
    h.frames.send(message_frame("m", "second")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    h.lifecycle.send_replace(ConnectionState::Closed);

    assert_eq!(recv(&mut h.channels.messages).await.unwrap().target_thread_id, "first");
    assert!(recv(&mut h.channels.messages).await.is_none());
}

#[tokio::test]
async fn test_end_of_frames_stops_router() {
    let mut h = start(1);
    drop(h.frames);

    assert!(recv(&mut h.channels.messages).await.is_none());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(h.router.is_stopped());
}
