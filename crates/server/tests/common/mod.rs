//! Common test utilities for API testing with a mock session.
//!
//! This module provides a test fixture that runs the real sync runner
//! against a [`MockSession`] and serves the router in-process, enabling
//! end-to-end API tests without a Transmission daemon.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use trmote_core::sync::SchedulerStats;
use trmote_core::testing::MockSession;
use trmote_core::{
    Config, ServerConfig, SessionConfig, SnapshotSink, SyncConfig, SyncHandle, SyncOrchestrator,
    SyncRunner, TorrentRecord,
};

/// Re-export fixtures for test convenience
pub use trmote_core::testing::fixtures;

/// In-process server wired to a mock session.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test(start_paused = true)]
/// async fn test_dashboard() {
///     let fixture = TestFixture::with_torrents(vec![/* records */]).await;
///     let response = fixture.get("/api/v1/dashboard").await;
///     assert_eq!(response.status, StatusCode::OK);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock session - configure torrents, files and failures
    pub session: Arc<MockSession>,
    pub handle: SyncHandle,
    runner: JoinHandle<SchedulerStats>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_torrents(Vec::new()).await
    }

    /// Start the runner with `torrents` loaded and wait for the first fetch.
    pub async fn with_torrents(torrents: Vec<TorrentRecord>) -> Self {
        let session = Arc::new(MockSession::new());
        session.set_torrents(torrents).await;

        let config = Config {
            session: SessionConfig {
                url: "http://mock:9091/transmission/rpc".to_string(),
                username: Some("admin".to_string()),
                password: Some("secret".to_string()),
                timeout_secs: 30,
            },
            sync: SyncConfig {
                page_size: 2,
                ..SyncConfig::default()
            },
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
        };

        let (sink, view_rx) = SnapshotSink::new();
        let orchestrator = SyncOrchestrator::new(&config.sync, Box::new(sink));
        let (runner, handle) = SyncRunner::new(&config.sync, session.clone(), orchestrator);
        let runner = tokio::spawn(runner.run());

        let state = Arc::new(trmote_server::state::AppState::new(
            config,
            handle.clone(),
            view_rx,
        ));
        let router = trmote_server::api::create_router(state);

        settle().await;

        Self {
            router,
            session,
            handle,
            runner,
        }
    }

    /// Stop the runner and wait for it.
    pub async fn shutdown(self) -> SchedulerStats {
        self.handle.shutdown();
        self.runner.await.expect("runner panicked")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Let the runner process queued commands. Tests run on a paused clock, so
/// this never reaches the 5 s poll deadline by accident.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
