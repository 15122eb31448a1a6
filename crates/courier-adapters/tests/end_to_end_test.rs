//! Client wired to the real HTTP transport and file store

use courier_adapters::{FileStore, HttpTransport, ServerProbe};
use courier_core::{BackoffConfig, Client, Config, Store};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(endpoint: String) -> Config {
    Config::new(endpoint, "secret")
        .with_max_batch_size(50)
        .with_max_retries(2)
        .with_flush_interval_ms(60_000)
        .with_backoff(BackoffConfig {
            base_delay_ms: 1,
            max_jitter_ms: 0,
            max_delay_ms: 5,
        })
}

fn build_client(endpoint: String, store: Arc<FileStore>) -> Client {
    Client::builder(fast_config(endpoint), Arc::new(HttpTransport::new()))
        .store(store)
        .probe(Arc::new(ServerProbe))
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_events_reach_collector_with_wire_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events"))
        .and(header("X-API-Key", "secret"))
        .and(body_partial_json(json!({
            "events": [{"name": "signup", "platform": {"type": "server"}}]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(temp_dir.path().join("events.json")));
    let client = build_client(format!("{}/v1/events", server.uri()), store.clone());

    client.init().await.unwrap();
    client.track("signup", None, None).unwrap();
    let summary = client.flush_sync().await;
    assert_eq!(summary.sent, 1);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let event = &body["events"][0];
    assert!(event["issuedAt"].is_i64());
    assert!(event["sessionId"].is_string());

    client.dispose().await;
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_backlog_survives_outage_and_restart() {
    let server = MockServer::start().await;
    let endpoint = format!("{}/v1/events", server.uri());
    let temp_dir = TempDir::new().unwrap();
    let store_path = temp_dir.path().join("events.json");

    // Collector is down: retries run out and the batch is persisted
    let outage = Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount_as_scoped(&server)
        .await;

    let store = Arc::new(FileStore::new(&store_path));
    let client = build_client(endpoint.clone(), store.clone());
    client.init().await.unwrap();
    client.track("first", None, None).unwrap();
    client.track("second", None, None).unwrap();

    let summary = client.flush_sync().await;
    assert_eq!(summary.requeued, 2);
    assert_eq!(client.queue_size(), 2);
    client.dispose().await;
    drop(outage);

    let persisted = FileStore::new(&store_path).load().await.unwrap();
    assert_eq!(persisted.len(), 2);

    // Collector recovers: a fresh process restores and delivers in order
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "events": [{"name": "first"}, {"name": "second"}, {"name": "third"}]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(FileStore::new(&store_path));
    let client = build_client(endpoint, store.clone());
    client.init().await.unwrap();
    assert_eq!(client.queue_size(), 2);
    client.track("third", None, None).unwrap();

    let summary = client.flush_sync().await;
    assert_eq!(summary.sent, 3);
    assert!(store.load().await.unwrap().is_empty());
    client.dispose().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejected_batch_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(temp_dir.path().join("events.json")));
    let client = build_client(server.uri(), store.clone());
    client.init().await.unwrap();
    client.track("bad", None, None).unwrap();

    let summary = client.flush_sync().await;
    assert_eq!(summary.dropped, 1);
    assert_eq!(client.queue_size(), 0);
    client.dispose().await;
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduled_flush_delivers_without_explicit_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(temp_dir.path().join("events.json")));
    let config = fast_config(server.uri()).with_flush_interval_ms(20);
    let client = Client::builder(config, Arc::new(HttpTransport::new()))
        .store(store)
        .build()
        .unwrap();

    client.init().await.unwrap();
    client.track("tick", None, None).unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while server.received_requests().await.unwrap().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "scheduled flush never ran");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    client.dispose().await;
}
