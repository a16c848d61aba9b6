//! Client transport against a live engine

mod common;

use assert_matches::assert_matches;
use common::{eventually, test_config, TestEngine, WAIT};
use deck_engine::backend::protocol::{endpoint, Reply};
use deck_engine::client::{Client, ClientError};
use deck_engine::shared::rpc_names::push;
use deck_engine::shared::ClientConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn start_with_slow_endpoint(delay: Duration) -> TestEngine {
    TestEngine::start_with(test_config(), move |builder| {
        builder.endpoint(
            "slow",
            endpoint(move |_| async move {
                tokio::time::sleep(delay).await;
                Reply::new("done")
            }),
        )
    })
    .await
}

async fn connect(engine: &TestEngine, timeout: Duration) -> Client {
    let config = ClientConfig::new(engine.url("")).with_timeout(timeout);
    Client::connect(config).await.expect("client connects")
}

#[tokio::test]
async fn test_call_returns_decoded_payload() {
    let engine = TestEngine::start().await;
    let client = connect(&engine, WAIT).await;

    let pong: String = client.call("ping?", &()).await.expect("ping answers");
    assert_eq!(pong, "Pong!");
    assert_eq!(client.pending_requests(), 0);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_error_frame_becomes_remote_error() {
    let engine = TestEngine::start().await;
    let client = connect(&engine, WAIT).await;

    let result: Result<Value, _> = client.call("nope", &json!({})).await;
    assert_matches!(result, Err(ClientError::Remote(ref text)) if text == "RPC nope not found");

    engine.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_calls_are_matched_by_ack() {
    let engine = start_with_slow_endpoint(Duration::from_millis(50)).await;
    let client = Arc::new(connect(&engine, WAIT).await);

    let slow = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.call::<_, String>("slow", &()).await })
    };
    let pong: String = client.call("ping?", &()).await.expect("ping answers");
    assert_eq!(pong, "Pong!");
    assert_eq!(slow.await.expect("task joins").expect("slow answers"), "done");

    engine.shutdown().await;
}

#[tokio::test]
async fn test_zero_timeout_fails_and_clears_pending() {
    let engine = start_with_slow_endpoint(Duration::from_millis(200)).await;
    let client = connect(&engine, Duration::ZERO).await;

    let result: Result<String, _> = client.call("slow", &()).await;
    assert_matches!(result, Err(ClientError::Timeout));
    assert_eq!(client.pending_requests(), 0);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_pushes_reach_subscribers() {
    let engine = TestEngine::start().await;
    let client = connect(&engine, WAIT).await;
    let mut pushes = client.subscribe_pushes();

    let registry = engine.engine.registry().clone();
    eventually(|| {
        let registry = registry.clone();
        async move { registry.count() == 1 }
    })
    .await;

    engine
        .engine
        .pusher()
        .update_card(&json!({ "id": "c1", "score": 2 }))
        .await
        .expect("push succeeds");

    let frame = tokio::time::timeout(WAIT, pushes.recv())
        .await
        .expect("push arrives in time")
        .expect("listener open");
    assert_eq!(frame.rpc, push::UPDATE_CARD);
    assert_eq!(frame.data, Some(json!({ "id": "c1", "score": 2 })));
    assert_eq!(client.pending_requests(), 0);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_server_shutdown_fails_pending_requests() {
    let engine = start_with_slow_endpoint(Duration::from_secs(10)).await;
    let client = Arc::new(connect(&engine, WAIT * 4).await);

    let call = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.call::<_, String>("slow", &()).await })
    };
    let waiting = Arc::clone(&client);
    eventually(|| {
        let waiting = Arc::clone(&waiting);
        async move { waiting.pending_requests() == 1 }
    })
    .await;

    engine.shutdown().await;

    let result = tokio::time::timeout(WAIT, call)
        .await
        .expect("call finishes in time")
        .expect("task joins");
    assert_matches!(result, Err(ClientError::ConnectionLost));
    assert_eq!(client.pending_requests(), 0);
    assert!(!client.is_connected());

    let after: Result<String, _> = client.call("ping?", &()).await;
    assert_matches!(after, Err(ClientError::ConnectionLost));
}
