//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//!
//! Every error response has the body `{ "success": false, "message": ".." }`.
//! Messages are generic; internal details only go to logs and Sentry.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::middleware::auth::AuthRejection;
use crate::services::{AuthError, OrderError, TokenError};

/// Message returned for every 5xx response.
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Registration or login failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order creation or listing failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// The access gate rejected the request.
    #[error("Access denied: {0}")]
    Gate(#[from] AuthRejection),

    /// Token issuance failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

/// Build a `{ success: false, message }` response.
#[must_use]
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        success: false,
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Order(err) => match err {
                OrderError::Validation(_) | OrderError::Duplicate => StatusCode::BAD_REQUEST,
                OrderError::UnknownCustomer => StatusCode::NOT_FOUND,
                OrderError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Gate(rejection) => rejection.status_code(),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            return INTERNAL_MESSAGE.to_string();
        }

        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::UserAlreadyExists => "User already exists".to_string(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::MissingName => "Name is required".to_string(),
                AuthError::IncorrectAdminEmail => "Incorrect email".to_string(),
                AuthError::IncorrectAdminPassword => "Incorrect password".to_string(),
                _ => "Authentication error".to_string(),
            },
            Self::Order(err) => match err {
                OrderError::Duplicate => {
                    "Order already exists for this car, quantity, price, and order date combination"
                        .to_string()
                }
                OrderError::UnknownCustomer => "Customer not found".to_string(),
                other => other.to_string(),
            },
            Self::Gate(rejection) => rejection.to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        error_response(status, self.public_message())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("order", "Order created", Some(&[("item_id", "car-42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order-123".to_string());
        assert_eq!(err.to_string(), "Not found: order-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: impl Into<AppError>) -> StatusCode {
            err.into().into_response().status()
        }

        assert_eq!(get_status(OrderError::Duplicate), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(AuthError::InvalidCredentials),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthRejection::Unauthenticated),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthRejection::InvalidToken),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AuthRejection::NotAdmin), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(RepositoryError::Conflict("users_email_key".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::NotFound("user".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let body = body_json(AppError::from(OrderError::Duplicate).into_response()).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "Order already exists for this car, quantity, price, and order date combination"
        );
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let err = AppError::Order(OrderError::StoreUnavailable(
            RepositoryError::DataCorruption("secret table layout".to_string()),
        ));
        let body = body_json(err.into_response()).await;
        assert_eq!(body["message"], INTERNAL_MESSAGE);
    }
}
