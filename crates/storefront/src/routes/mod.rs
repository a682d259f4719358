//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (order store ping)
//!
//! # Users
//! POST /user/register          - Register, returns a token (rate limited)
//! POST /user/login             - Login, returns a token (rate limited)
//! POST /user/adminpanellogin   - Admin panel login (rate limited)
//! GET  /user/isadmin           - Admin check (requires admin)
//! GET  /user/me                - Caller profile (requires auth)
//!
//! # Orders
//! POST /order/create           - Create an order (requires auth)
//! GET  /order/list             - All orders (requires admin)
//! GET  /order/mine             - Caller's orders (requires auth)
//! ```

pub mod orders;
pub mod users;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};

use crate::error::AppError;
use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// Handlers take `Result<Json<T>, JsonRejection>` so malformed bodies get the
/// same `{ success, message }` shape as every other error.
///
/// # Errors
///
/// Returns `AppError::BadRequest` with the rejection text.
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Create the user routes router.
///
/// `auth_limiter` wraps the three credential routes when given.
pub fn user_routes(auth_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/adminpanellogin", post(users::admin_panel_login));
    let credentials = match auth_limiter {
        Some(layer) => credentials.layer(layer),
        None => credentials,
    };

    Router::new()
        .route("/isadmin", get(users::is_admin))
        .route("/me", get(users::me))
        .merge(credentials)
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(orders::create))
        .route("/list", get(orders::list))
        .route("/mine", get(orders::mine))
}

/// Create all routes for the storefront, including health checks.
pub fn routes(auth_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/user", user_routes(auth_limiter))
        .nest("/order", order_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the order store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.orders().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, header};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use carlot_core::{Email, SubjectId};

    use super::*;
    use crate::config::{AuthConfig, StorefrontConfig};
    use crate::db::InMemoryStore;
    use crate::models::UserProfile;

    const SECRET: &str = "k9$Xq2!vLm7#Rt4@Wp8&Zc1^Nb6*Hy3%";

    fn test_app() -> (Router, AppState, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        store.put_user(
            UserProfile {
                id: SubjectId::new("u1"),
                name: "Ada Lovelace".to_owned(),
                email: Email::parse("ada@example.com").unwrap(),
                profile_image: String::new(),
                created_at: Utc::now(),
            },
            "unused",
        );
        let config = StorefrontConfig::with_memory_store(AuthConfig {
            jwt_secret: SecretString::from(SECRET),
            require_token_expiry: false,
            admin_email: Email::parse("admin@gmail.com").unwrap(),
        });
        let state = AppState::in_memory(config, Arc::clone(&store));
        (routes(None).with_state(state.clone()), state, store)
    }

    fn bearer(state: &AppState, subject: &str) -> String {
        let token = state
            .tokens()
            .issue(&SubjectId::new(subject), None)
            .unwrap();
        format!("Bearer {token}")
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn roadster() -> Value {
        json!({
            "carId": "car-42",
            "carName": "Roadster",
            "quantity": 2,
            "price": 15000,
            "orderDate": "2024-01-01"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, _) = send(&test_app().0, "GET", "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_order_then_duplicate() {
        let (app, state, store) = test_app();
        let auth = bearer(&state, "u1");

        let (status, body) =
            send(&app, "POST", "/order/create", Some(&auth), Some(roadster())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["order"]["total_price"], "30000");
        assert_eq!(body["order"]["status"], "Processing");
        assert_eq!(body["order"]["customer_name"], "Ada Lovelace");

        let (status, body) =
            send(&app, "POST", "/order/create", Some(&auth), Some(roadster())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "Order already exists for this car, quantity, price, and order date combination"
        );
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_create_order_requires_token() {
        let (app, _, store) = test_app();

        let (status, body) = send(&app, "POST", "/order/create", None, Some(roadster())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "No token, authorization denied");
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_order_body() {
        let (app, state, _) = test_app();
        let auth = bearer(&state, "u1");

        let (status, body) = send(
            &app,
            "POST",
            "/order/create",
            Some(&auth),
            Some(json!({ "carId": "car-42" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_isadmin_rejects_regular_user() {
        let (app, state, _) = test_app();
        let auth = bearer(&state, "u1");

        let (status, body) = send(&app, "GET", "/user/isadmin", Some(&auth), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Not authorized as an admin");
    }

    #[tokio::test]
    async fn test_order_list_is_admin_only_and_mine_is_scoped() {
        let (app, state, _) = test_app();
        let auth = bearer(&state, "u1");
        send(&app, "POST", "/order/create", Some(&auth), Some(roadster())).await;

        let (status, _) = send(&app, "GET", "/order/list", Some(&auth), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "GET", "/order/mine", Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_login_and_me() {
        let (app, _, _) = test_app();
        let form = json!({
            "name": "Grace Hopper",
            "email": "Grace@Example.com",
            "password": "cobol-forever"
        });

        let (status, body) = send(&app, "POST", "/user/register", None, Some(form)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User registered successfully");
        assert!(body["token"].as_str().is_some());

        let (status, body) = send(
            &app,
            "POST",
            "/user/login",
            None,
            Some(json!({ "email": "grace@example.com", "password": "cobol-forever" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_owned();

        let (status, body) = send(
            &app,
            "GET",
            "/user/me",
            Some(&format!("Bearer {token}")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "grace@example.com");
        assert_eq!(body["user"]["name"], "Grace Hopper");
    }

    #[tokio::test]
    async fn test_me_for_unknown_subject_is_not_found() {
        let (app, state, _) = test_app();
        let auth = bearer(&state, "deleted-user");

        let (status, body) = send(&app, "GET", "/user/me", Some(&auth), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Not found: user");
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let (app, _, _) = test_app();
        send(
            &app,
            "POST",
            "/user/register",
            None,
            Some(json!({ "name": "Grace", "email": "grace@example.com", "password": "cobol-forever" })),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/user/login",
            None,
            Some(json!({ "email": "grace@example.com", "password": "fortran" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid credentials");
    }
}
