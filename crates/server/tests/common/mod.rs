//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock episode source injected, enabling E2E testing of the HTTP
//! API without an external fetcher.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use tsuiseki_core::{
    testing::MockEpisodeSource, Config, DatabaseConfig, RefreshConfig, RefreshScheduler,
    SeriesCatalog, ServerConfig, SqliteCatalog, SqliteDownloadQueue, SqliteScriptRegistry,
    SqliteSubscriptionStore, SubscriptionService,
};

/// Re-export fixtures for test convenience
pub use tsuiseki_core::testing::fixtures;

/// Test fixture for E2E testing with a mock episode source.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_follow() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/subscriptions", json!({
///         "name": "Show A"
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock episode source - configure observed episodes
    pub source: Arc<MockEpisodeSource>,
    /// Series catalog, seeded with "Show A", "Show B" and "Another Story"
    pub catalog: Arc<SqliteCatalog>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub async fn new() -> Self {
        Self::with_debug(false).await
    }

    /// Create a test fixture whose service surfaces raw errors.
    pub async fn with_debug(debug: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let source = Arc::new(MockEpisodeSource::new());

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            refresh: RefreshConfig::default(),
            debug,
        };

        let catalog = Arc::new(SqliteCatalog::new(&db_path).expect("Failed to create catalog"));
        catalog
            .store_series(&[
                fixtures::series("Show A", &["g1", "g2"]),
                fixtures::series("Show B", &["g1"]),
                fixtures::series("Another Story", &["g3"]),
            ])
            .expect("Failed to seed catalog");

        let store = Arc::new(
            SqliteSubscriptionStore::new(&db_path).expect("Failed to create subscription store"),
        );
        let downloads =
            Arc::new(SqliteDownloadQueue::new(&db_path).expect("Failed to create download queue"));
        let scripts = Arc::new(
            SqliteScriptRegistry::new(&db_path).expect("Failed to create script registry"),
        );

        let service = Arc::new(
            SubscriptionService::new(
                catalog.clone(),
                source.clone(),
                store,
                downloads,
                config.refresh.clone(),
            )
            .with_scripts(scripts)
            .with_debug(debug),
        );
        let scheduler = Arc::new(RefreshScheduler::from_config(Arc::clone(&service)));

        let state = Arc::new(tsuiseki_server::state::AppState::new(
            config, service, scheduler,
        ));

        let router = tsuiseki_server::api::create_router(state);

        Self {
            router,
            source,
            catalog,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a GET request and return the raw text body.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

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

        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

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
