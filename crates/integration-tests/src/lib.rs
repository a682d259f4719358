//! Integration tests for Carlot.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory flows, no services needed
//! cargo test -p carlot-integration-tests
//!
//! # PostgreSQL-backed flows
//! TEST_DATABASE_URL=postgres://localhost/carlot_test \
//!   cargo test -p carlot-integration-tests -- --ignored --test-threads=1
//! ```
//!
//! # Test Categories
//!
//! - `user_flow` - Registration, login, and the admin gate
//! - `order_flow` - Order creation, duplicate rejection, and listings
//! - `postgres_store` - The same guarantees against a real database

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use carlot_core::{Email, SubjectId};
use carlot_storefront::config::{AuthConfig, StorefrontConfig};
use carlot_storefront::db::{InMemoryStore, PgOrderStore, PgUserDirectory, create_pool};
use carlot_storefront::services::TOKEN_TTL;
use carlot_storefront::state::AppState;

/// Signing secret used by every test context.
pub const TEST_SECRET: &str = "k9$Xq2!vLm7#Rt4@Wp8&Zc1^Nb6*Hy3%";

/// Admin email used by every test context.
pub const ADMIN_EMAIL: &str = "admin@carlot.test";

/// A response with its body decoded as JSON (`Null` when not JSON).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `message` field of the body.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// The `token` field of the body.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.body.get("token").and_then(Value::as_str)
    }
}

/// The full application router plus the state behind it.
pub struct TestContext {
    pub app: Router,
    pub state: AppState,
}

impl TestContext {
    /// Build a context over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(require_token_expiry: bool) -> (Self, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::in_memory(test_config(require_token_expiry), Arc::clone(&store));
        (Self::from_state(state), store)
    }

    /// Build a context over `PostgreSQL`, migrating and emptying the tables first.
    ///
    /// Returns `None` when `TEST_DATABASE_URL` is unset.
    pub async fn postgres() -> Option<Self> {
        let url = SecretString::from(std::env::var("TEST_DATABASE_URL").ok()?);
        let pool = create_pool(&url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("../storefront/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");
        sqlx::query("TRUNCATE carlot.orders, carlot.users")
            .execute(&pool)
            .await
            .expect("Failed to reset tables");

        let state = AppState::new(
            test_config(false),
            Arc::new(PgOrderStore::new(pool.clone())),
            Arc::new(PgUserDirectory::new(pool)),
        );
        Some(Self::from_state(state))
    }

    fn from_state(state: AppState) -> Self {
        Self {
            app: carlot_storefront::app(state.clone(), None),
            state,
        }
    }

    /// Sign a one-hour token for `subject` with the context's secret.
    #[must_use]
    pub fn token_for(&self, subject: &str) -> String {
        self.state
            .tokens()
            .issue(&SubjectId::new(subject), Some(TOKEN_TTL))
            .expect("Failed to sign token")
    }

    /// Send a request through the whole router.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("Failed to encode body"))
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).expect("Failed to build request"))
            .await
            .expect("Router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
        }
    }

    /// Register a user and return the issued token.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> String {
        let response = self
            .send(
                "POST",
                "/user/register",
                None,
                Some(serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": password,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.token().expect("register returns a token").to_owned()
    }
}

fn test_config(require_token_expiry: bool) -> StorefrontConfig {
    StorefrontConfig::with_memory_store(AuthConfig {
        jwt_secret: SecretString::from(TEST_SECRET),
        require_token_expiry,
        admin_email: Email::parse(ADMIN_EMAIL).expect("valid admin email"),
    })
}
