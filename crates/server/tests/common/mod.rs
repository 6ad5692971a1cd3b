//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock producers and real plan stores in a temporary directory.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use waypoint_core::{
    testing::{MockChunkProducer, MockOutlineProducer},
    Config, DatabaseConfig, FallbackSink, GenerationConfig, GenerationCoordinator,
    GenerationHandle, JsonFilePlanStore, ProgressSnapshot, SqlitePlanStore,
};

/// Re-export fixtures for test convenience
#[allow(unused_imports)]
pub use waypoint_core::testing::fixtures;

/// Test fixture for API testing with mock producers.
///
/// Plans are saved to a real sqlite file and a real local directory inside
/// `temp_dir`, so persistence and read-back go through the same code as
/// production.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock outline producer
    pub outline: Arc<MockOutlineProducer>,
    /// Mock chunk producer - configure failures and delays
    pub chunks: Arc<MockChunkProducer>,
    /// Handle to the running coordinator
    pub generation: GenerationHandle,
    /// Temporary directory for the database and local plans
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default generation settings.
    pub async fn new() -> Self {
        Self::with_generation(GenerationConfig::default()).await
    }

    pub async fn with_generation(generation_config: GenerationConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let local_dir = temp_dir.path().join("plans");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            generation: generation_config.clone(),
            ..Default::default()
        };

        let durable = Arc::new(SqlitePlanStore::new(&db_path).expect("Failed to create plan store"));
        let local =
            Arc::new(JsonFilePlanStore::new(&local_dir).expect("Failed to create local store"));
        let plans = Arc::new(FallbackSink::new(durable, local));

        let outline = Arc::new(MockOutlineProducer::new());
        let chunks = Arc::new(MockChunkProducer::new());
        let (generation, coordinator) = GenerationCoordinator::new(
            generation_config,
            Arc::clone(&outline) as Arc<dyn waypoint_core::generation::OutlineProducer>,
            Arc::clone(&chunks) as Arc<dyn waypoint_core::generation::ChunkProducer>,
            Arc::clone(&plans) as Arc<dyn waypoint_core::PersistenceSink>,
        );
        tokio::spawn(coordinator.run());

        let state = Arc::new(waypoint_server::state::AppState::new(
            config,
            generation.clone(),
            plans,
        ));
        let router = waypoint_server::api::create_router(state);

        Self {
            router,
            outline,
            chunks,
            generation,
            temp_dir,
        }
    }

    /// Wait for a snapshot matching `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ProgressSnapshot) -> bool,
    ) -> ProgressSnapshot {
        tokio::time::timeout(Duration::from_secs(5), self.generation.wait_until(predicate))
            .await
            .expect("Timed out waiting for snapshot")
            .expect("Coordinator closed")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a POST request with JSON body and an upstream user header.
    pub async fn post_as(&self, path: &str, body: Value, user_id: &str) -> TestResponse {
        self.request("POST", path, Some(body), Some(user_id)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None, None).await
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

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        user_id: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        if let Some(user_id) = user_id {
            request_builder = request_builder.header("x-user-id", user_id);
        }

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
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into_owned()))
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
