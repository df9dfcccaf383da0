//! End-to-end requests through the reqwest transport against a mock server.

mod common;

use ai_lib_dispatch::adapter::{Adapter, MapEnv};
use ai_lib_dispatch::transport::TransportPolicy;
use ai_lib_dispatch::types::{Message, Payload};
use ai_lib_dispatch::{ClientBuilder, LogLevel, RequestOptions, RequestStatus};
use common::{artifact_count, Journal};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn payload() -> Payload {
    Payload::new(vec![Message::user("hi")])
}

fn no_retries() -> TransportPolicy {
    TransportPolicy {
        retries: 0,
        retry_delay: Duration::ZERO,
        ..Default::default()
    }
}

#[tokio::test]
async fn successful_response_is_delivered_once_and_artifact_removed() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "messages": [{"role": "user", "content": "hi"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices":[{"message":{"content":"hello"}}]}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::default();
    let adapter = Adapter::new("mock", format!("{}/v1/chat", server.url()))
        .with_handlers(journal.handlers());
    let client = ClientBuilder::new(adapter)
        .event_bus(Arc::new(journal.clone()))
        .artifact_dir(dir.path())
        .log_level(LogLevel::Info)
        .build()
        .unwrap();

    let status = client
        .request(payload(), journal.actions(), RequestOptions::new())
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(status, RequestStatus::Success);
    assert_eq!(
        journal.count(r#"complete:200:{"choices":[{"message":{"content":"hello"}}]}"#),
        1
    );
    assert_eq!(journal.count("event:RequestFinished:success"), 1);
    assert_eq!(artifact_count(dir.path()), 0);
}

#[tokio::test]
async fn server_error_is_passed_through_as_data_and_artifact_kept() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat")
        .with_status(503)
        .with_body(r#"{"error":"overloaded"}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::default();
    let adapter = Adapter::new("mock", format!("{}/v1/chat", server.url()))
        .with_handlers(journal.handlers());
    let client = ClientBuilder::new(adapter)
        .event_bus(Arc::new(journal.clone()))
        .artifact_dir(dir.path())
        .log_level(LogLevel::Info)
        .build()
        .unwrap();

    let status = client
        .request(payload(), journal.actions(), RequestOptions::new())
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(status, RequestStatus::Error);
    assert_eq!(journal.count(r#"complete:503:{"error":"overloaded"}"#), 1);
    assert_eq!(journal.count("error"), 0);
    assert_eq!(journal.count("on_exit:503"), 1);
    assert_eq!(journal.count("event:RequestFinished:error"), 1);
    assert_eq!(artifact_count(dir.path()), 1);
}

#[tokio::test]
async fn streamed_body_arrives_as_chunks() {
    let mut server = Server::new_async().await;
    let body = "data: {\"delta\":\"Hel\"}\n\ndata: {\"delta\":\"lo\"}\n\ndata: [DONE]\n\n";
    let mock = server
        .mock("POST", "/v1/chat")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let adapter = Adapter::new("mock", format!("{}/v1/chat", server.url()))
        .streaming(true)
        .with_handlers(ai_lib_dispatch::adapter::Handlers::passthrough());
    let client = ClientBuilder::new(adapter)
        .artifact_dir(dir.path())
        .build()
        .unwrap();

    let completed = client.send(payload(), RequestOptions::new()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(completed.status, RequestStatus::Success);
    assert!(!completed.chunks.is_empty());
    assert_eq!(completed.text(), body);
    assert!(completed.response.is_none());
}

#[tokio::test]
async fn resolved_headers_and_method_reach_the_wire() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/models")
        .match_header("authorization", "Bearer sk-live")
        .match_header("x-extra", "from-raw")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let adapter = Adapter::new("mock", format!("{}/models", server.url()))
        .with_env("key", "PROVIDER_KEY")
        .with_header("Authorization", "Bearer ${key}")
        .with_raw_flag("-H")
        .with_raw_flag("X-Extra: from-raw")
        .with_method("GET");
    let client = ClientBuilder::new(adapter)
        .env_source(Arc::new(MapEnv::new().with_var("PROVIDER_KEY", "sk-live")))
        .artifact_dir(dir.path())
        .build()
        .unwrap();

    let completed = client.send(payload(), RequestOptions::new()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(completed.text(), "[]");
}

#[tokio::test]
async fn connection_refused_goes_to_callback_without_cleanup() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::default();
    let adapter = Adapter::new("mock", format!("http://127.0.0.1:{}/v1/chat", port))
        .with_handlers(journal.handlers());
    let client = ClientBuilder::new(adapter)
        .event_bus(Arc::new(journal.clone()))
        .transport_policy(no_retries())
        .artifact_dir(dir.path())
        .log_level(LogLevel::Info)
        .build()
        .unwrap();

    let status = client
        .request(payload(), journal.actions(), RequestOptions::new())
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(status, RequestStatus::Error);
    assert_eq!(journal.count("error"), 1);
    assert_eq!(journal.count("event:RequestFinished:error"), 1);
    assert!(!journal.entries().iter().any(|e| e.starts_with("on_exit")));
    assert_eq!(journal.count("teardown"), 0);
    assert_eq!(journal.count("done"), 0);
    assert_eq!(artifact_count(dir.path()), 1);
}

#[tokio::test]
async fn send_returns_transport_errors_after_retries() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let dir = tempfile::tempdir().unwrap();
    let adapter = Adapter::new("mock", format!("http://127.0.0.1:{}/", port));
    let client = ClientBuilder::new(adapter)
        .retry_delay(Duration::from_millis(1))
        .artifact_dir(dir.path())
        .build()
        .unwrap();

    let err = client
        .send(payload(), RequestOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn connect_failures_are_retried_with_the_configured_delay() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let dir = tempfile::tempdir().unwrap();
    let adapter = Adapter::new("mock", format!("http://127.0.0.1:{}/", port));
    let client = ClientBuilder::new(adapter)
        .transport_policy(TransportPolicy {
            retries: 2,
            retry_delay: Duration::from_millis(150),
            ..Default::default()
        })
        .artifact_dir(dir.path())
        .build()
        .unwrap();

    let started = Instant::now();
    let err = client
        .send(payload(), RequestOptions::new())
        .await
        .unwrap_err();

    assert!(err.is_transport());
    // two waits between three attempts
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn http_error_statuses_are_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat")
        .with_status(500)
        .with_body("x")
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let adapter = Adapter::new("mock", format!("{}/v1/chat", server.url()));
    let client = ClientBuilder::new(adapter)
        .retry_delay(Duration::from_millis(1))
        .artifact_dir(dir.path())
        .build()
        .unwrap();
    assert_eq!(client.config().policy.retries, 3);

    let completed = client.send(payload(), RequestOptions::new()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(completed.status, RequestStatus::Error);
    assert_eq!(completed.text(), "x");
}
