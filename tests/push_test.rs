//! Push delivery tests over real sockets

mod common;

use common::{assert_silent, eventually, recv_envelope, test_config, TestEngine};
use deck_engine::shared::rpc_names::push;
use deck_engine::shared::User;
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

async fn wait_for_user(engine: &TestEngine, user_id: Uuid, writers: usize) {
    let registry = engine.engine.registry().clone();
    eventually(|| {
        let registry = registry.clone();
        async move { registry.writers_by_user(user_id).len() == writers }
    })
    .await;
}

#[tokio::test]
async fn test_push_to_user_reaches_every_connection_of_that_user() {
    let engine = TestEngine::start().await;
    let session = engine.session_for(User::new("chad")).await;
    let query = format!("session={}", session.id);

    let mut first = engine.connect(&query).await;
    let mut second = engine.connect(&query).await;
    let mut anonymous = engine.connect("").await;
    wait_for_user(&engine, session.user_id, 2).await;
    assert_eq!(engine.engine.registry().count(), 3);

    engine
        .engine
        .pusher()
        .push_to_user(session.user_id, push::NEW_CARD, &json!({ "id": "c1" }))
        .await
        .expect("push succeeds");

    for socket in [&mut first, &mut second] {
        let frame = recv_envelope(socket).await;
        assert_eq!(frame.rpc, push::NEW_CARD);
        assert_eq!(frame.data, Some(json!({ "id": "c1" })));
        assert_eq!(frame.ack, "");
        assert!(!frame.request_id.is_empty());
    }
    assert_silent(&mut anonymous).await;

    engine.shutdown().await;
}

#[tokio::test]
async fn test_push_to_all_reaches_anonymous_connections() {
    let engine = TestEngine::start().await;
    let mut anonymous = engine.connect("").await;

    engine.engine.pusher().delete_card("c9").await.expect("push succeeds");

    let frame = recv_envelope(&mut anonymous).await;
    assert_eq!(frame.rpc, push::DELETE_CARD);
    assert_eq!(frame.data, Some(json!("c9")));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_engagement_skips_anonymous_connections() {
    let engine = TestEngine::start().await;
    let session = engine.session_for(User::new("chad")).await;
    let mut signed_in = engine.connect(&format!("session={}", session.id)).await;
    let mut anonymous = engine.connect("").await;
    wait_for_user(&engine, session.user_id, 1).await;

    engine
        .engine
        .pusher()
        .update_engagement("c1", &json!({ "likes": 3 }))
        .await
        .expect("push succeeds");

    let frame = recv_envelope(&mut signed_in).await;
    assert_eq!(frame.rpc, push::UPDATE_ENGAGEMENT);
    assert_eq!(frame.data, Some(json!({ "cardID": "c1", "engagement": { "likes": 3 } })));
    assert_silent(&mut anonymous).await;

    engine.shutdown().await;
}

#[tokio::test]
async fn test_fan_out_delivers_locally_and_through_the_bus() {
    let mut config = test_config();
    config.push.fan_out = true;
    config.push.bus_url = "local".to_string();
    let engine = TestEngine::start_with(config, |builder| builder).await;
    let mut socket = engine.connect("").await;

    engine
        .engine
        .pusher()
        .push_to_all(push::NEW_CARD, &json!({ "id": "c1" }))
        .await
        .expect("push succeeds");

    let direct = recv_envelope(&mut socket).await;
    let relayed = recv_envelope(&mut socket).await;
    assert_eq!(direct, relayed);
    assert_eq!(direct.rpc, push::NEW_CARD);
    assert_silent(&mut socket).await;

    engine.shutdown().await;
}
