//! Common test utilities for in-process API testing.
//!
//! The fixture builds the real router over a temporary SQLite database, so
//! requests exercise the same store, queue service and auth layer as production.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use pila_core::{
    create_audit_system, create_authenticator, AuditStore, AuthConfig, AuthMethod, Authenticator,
    Config, DatabaseConfig, QueueConfig, QueueService, SqliteAuditStore, SqliteTicketStore,
    StaticTransactionTypes, TicketStore,
};
use pila_server::state::AppState;

/// Re-export fixtures for test convenience
pub use pila_core::testing::fixtures;

/// Configuration for a [`TestFixture`].
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub auth_method: AuthMethod,
    pub queue: QueueConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            auth_method: AuthMethod::None,
            queue: QueueConfig::default(),
        }
    }
}

/// In-process server over a temporary database.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Audit store sharing the fixture database
    pub audit_store: Arc<dyn AuditStore>,
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
    /// Fixture with no authentication: every caller is an administrator.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Fixture expecting `X-User-Id` and `X-User-Role` headers.
    pub async fn with_trusted_headers() -> Self {
        Self::with_config(TestConfig {
            auth_method: AuthMethod::TrustedHeader,
            ..TestConfig::default()
        })
        .await
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let mut config: Config = fixtures::config();
        config.auth = AuthConfig::new(test_config.auth_method);
        config.queue = test_config.queue;
        config.database = DatabaseConfig {
            path: db_path.clone(),
        };

        let audit_store: Arc<dyn AuditStore> = Arc::new(
            SqliteAuditStore::new(&db_path).expect("Failed to create audit store"),
        );
        let ticket_store: Arc<dyn TicketStore> = Arc::new(
            SqliteTicketStore::new(&db_path).expect("Failed to create ticket store"),
        );

        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let queue = QueueService::new(
            ticket_store,
            Arc::new(StaticTransactionTypes::from_config(&config.transaction_types)),
            &config.queue,
            config.board,
        )
        .with_audit(audit_handle);

        let authenticator: Arc<dyn Authenticator> = Arc::from(
            create_authenticator(&config.auth).expect("Failed to create authenticator"),
        );

        let state = Arc::new(AppState::new(config, authenticator, queue));
        let router = pila_server::api::create_router(state);

        Self {
            router,
            audit_store,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, &[]).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    /// Send a GET request as a teller (trusted header auth).
    pub async fn get_as(&self, user: &str, role: &str, path: &str) -> TestResponse {
        self.request("GET", path, None, &Self::identity(user, role))
            .await
    }

    /// Send a POST request as a teller (trusted header auth).
    pub async fn post_as(&self, user: &str, role: &str, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &Self::identity(user, role))
            .await
    }

    fn identity<'a>(user: &'a str, role: &'a str) -> [(&'static str, &'a str); 2] {
        [("x-user-id", user), ("x-user-role", role)]
    }

    /// Send a request with optional JSON body and extra headers.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, body }
    }

    /// Issue a ticket and return its id.
    pub async fn issue(&self, transaction_type: i64, is_priority: bool) -> i64 {
        let response = self
            .post_as(
                "kiosk",
                "Administrator",
                "/api/v1/tickets",
                serde_json::json!({
                    "transaction_type": transaction_type,
                    "is_priority": is_priority,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_i64().expect("ticket id")
    }
}
