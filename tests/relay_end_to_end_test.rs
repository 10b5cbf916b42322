//! Worker pool draining a shared in-memory queue.

mod common;

use command_relay::config::RelayConfig;
use command_relay::execution::{CommandInvocation, MemoryWorkQueue, QueueError, WorkerPool};
use command_relay::messaging::{BroadcastPublisher, ExecutionResponse, ResponseStatus};
use common::*;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_replies_once_per_request() {
    let fixture = Fixture::new(ScriptedEngine::succeeding("pong")).with_bundles(&[
        ("ops", "1.0.0"),
        ("ops", "1.1.0"),
    ]);
    let mut config = RelayConfig::default();
    config.worker.pool_size = 4;
    config.queue.capacity = Some(64);
    let queue = Arc::new(MemoryWorkQueue::from_config(&config.queue));
    let pool = WorkerPool::from_config(&config, queue.clone());

    for i in 0..40 {
        let bundle = if i % 5 == 0 { "unknown" } else { "ops" };
        let invocation = fixture.invocation(&json!({
            "bundle_name": bundle,
            "pipeline_id": format!("pipe-{i}"),
            "reply_to": format!("reply.{i}")
        }));
        queue.enqueue(invocation.into()).unwrap();
    }
    queue
        .enqueue(fixture.raw_invocation(b"not json".to_vec()).into())
        .unwrap();

    queue.close();
    let exits = tokio::time::timeout(Duration::from_secs(5), pool.join())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(exits.len(), 4);
    assert!(exits.iter().all(|exit| exit.error == QueueError::Closed));
    assert_eq!(exits.iter().map(|exit| exit.processed).sum::<u64>(), 41);

    let responses = fixture.publisher.responses();
    assert_eq!(responses.len(), 40);
    let topics: HashSet<&str> = responses.iter().map(|(topic, _)| topic.as_str()).collect();
    assert_eq!(topics.len(), 40);

    let errors = responses
        .iter()
        .filter(|(_, response)| response.status == ResponseStatus::Error)
        .count();
    assert_eq!(errors, 8);

    assert_eq!(fixture.engine.acquired(), 32);
    assert_eq!(fixture.engine.released(), 32);
    assert!(fixture
        .engine
        .acquired_bundles()
        .iter()
        .all(|bundle| bundle == "ops@1.1.0"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_configured_queue_rejects_overflow_and_pool_drains_it() {
    let fixture = Fixture::new(ScriptedEngine::succeeding("pong")).with_bundles(&[("ops", "1.0.0")]);
    let config = RelayConfig::load_from_sources(
        None,
        Some(
            [
                ("RELAY_QUEUE__CAPACITY".to_string(), "3".to_string()),
                ("RELAY_WORKER__POOL_SIZE".to_string(), "2".to_string()),
            ]
            .into_iter()
            .collect(),
        ),
    )
    .unwrap();
    assert_eq!(config.queue.capacity, Some(3));

    let queue = Arc::new(MemoryWorkQueue::from_config(&config.queue));
    for i in 0..3 {
        let invocation = fixture.invocation(&json!({
            "bundle_name": "ops",
            "reply_to": format!("reply.{i}")
        }));
        queue.enqueue(invocation.into()).unwrap();
    }
    let overflow = fixture.invocation(&json!({"bundle_name": "ops", "reply_to": "reply.x"}));
    assert_eq!(
        queue.enqueue(overflow.into()).unwrap_err(),
        QueueError::Full { capacity: 3 }
    );

    let pool = WorkerPool::from_config(&config, queue.clone());
    assert_eq!(pool.len(), 2);
    queue.close();
    tokio::time::timeout(Duration::from_secs(5), pool.join())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(fixture.publisher.count(), 3);
}

#[tokio::test]
async fn test_broadcast_publisher_delivers_reply() {
    let fixture = Fixture::new(ScriptedEngine::succeeding("hello")).with_bundles(&[("ops", "1.0.0")]);
    let mut config = RelayConfig::default();
    config.worker.pool_size = 1;
    config.publisher.channel_capacity = 16;
    let publisher = Arc::new(BroadcastPublisher::from_config(&config.publisher));
    let mut replies = publisher.subscribe();

    let queue = Arc::new(MemoryWorkQueue::from_config(&config.queue));
    let pool = WorkerPool::from_config(&config, queue.clone());

    let payload = serde_json::to_vec(&json!({"bundle_name": "ops", "reply_to": "reply.a"})).unwrap();
    let invocation = CommandInvocation::new(
        "relay.commands",
        payload,
        fixture.catalog.clone(),
        fixture.engines.clone(),
        publisher.clone(),
    );
    queue.enqueue(invocation.into()).unwrap();

    let message = tokio::time::timeout(Duration::from_secs(2), replies.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.topic, "reply.a");
    let response: ExecutionResponse = serde_json::from_slice(&message.payload).unwrap();
    assert!(response.is_ok());
    assert_eq!(response.body, Some(json!(["hello"])));

    queue.close();
    pool.join().await.unwrap();
}
