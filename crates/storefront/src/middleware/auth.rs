//! Authentication extractors.
//!
//! Both guards read `Authorization: Bearer <token>` and verify it with the
//! [`TokenAuthenticator`](crate::services::TokenAuthenticator) held in
//! [`AppState`]. A rejection short-circuits the request before the handler
//! runs.
//!
//! - [`RequireAuth`] - any caller with a valid token
//! - [`RequireAdmin`] - a caller whose account is the configured admin email

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::error::{AppError, set_sentry_user};
use crate::models::{Identity, UserProfile};
use crate::services::TokenError;
use crate::state::AppState;

/// Error returned when the access gate rejects a request.
#[derive(Debug, Error)]
pub enum AuthRejection {
    /// No credential presented.
    #[error("No token, authorization denied")]
    Unauthenticated,

    /// Credential malformed, wrongly signed, or expired.
    #[error("Token is not valid")]
    InvalidToken,

    /// Valid credential, but not the administrative account.
    #[error("Not authorized as an admin")]
    NotAdmin,

    /// The user directory failed while resolving the admin check.
    #[error("user directory error: {0}")]
    Directory(#[from] RepositoryError),
}

impl AuthRejection {
    /// HTTP status for this rejection.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::NotAdmin => StatusCode::BAD_REQUEST,
            Self::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

/// Pull the bearer credential out of the request headers.
///
/// # Errors
///
/// Returns `AuthRejection::Unauthenticated` if the header is absent or empty,
/// and `AuthRejection::InvalidToken` if it is not a `Bearer` credential.
pub fn extract_credential(headers: &HeaderMap) -> Result<&str, AuthRejection> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Err(AuthRejection::Unauthenticated);
    };
    let value = value
        .to_str()
        .map_err(|_| AuthRejection::InvalidToken)?
        .trim();
    if value.is_empty() {
        return Err(AuthRejection::Unauthenticated);
    }

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthRejection::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthRejection::InvalidToken);
    }

    Ok(token.trim())
}

/// Verify the request's credential and return the caller.
fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<Identity, AuthRejection> {
    let credential = extract_credential(headers)?;

    state.tokens().verify(credential).map_err(|e| match e {
        TokenError::Missing => AuthRejection::Unauthenticated,
        other => {
            tracing::warn!(reason = %other, "credential rejected");
            AuthRejection::InvalidToken
        }
    })
}

/// Extractor that requires a valid bearer token.
///
/// The verified [`Identity`] is also inserted into the request extensions.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(identity): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", identity.subject_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub Identity);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let identity = authenticate(&parts.headers, &state)?;

        set_sentry_user(&identity.subject_id, None);
        parts.extensions.insert(identity.clone());

        Ok(Self(identity))
    }
}

/// A verified caller whose account is the administrative account.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub identity: Identity,
    pub profile: UserProfile,
}

/// Extractor that requires a valid bearer token for the admin account.
///
/// The admin is the user whose email equals `ADMIN_EMAIL`. An unknown
/// subject is treated the same as a non-admin one.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AdminIdentity);

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let identity = authenticate(&parts.headers, &state)?;

        let profile = state
            .users()
            .find_by_id(&identity.subject_id)
            .await?
            .filter(|profile| profile.email == state.config().auth.admin_email)
            .ok_or_else(|| {
                tracing::warn!(subject_id = %identity.subject_id, "admin access denied");
                AuthRejection::NotAdmin
            })?;

        set_sentry_user(&identity.subject_id, Some(profile.email.as_str()));
        parts.extensions.insert(identity.clone());

        Ok(Self(AdminIdentity { identity, profile }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{Extension, Router, body::Body, http::Request, routing::get};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use secrecy::SecretString;
    use tower::ServiceExt;

    use carlot_core::{Email, SubjectId};

    use super::*;
    use crate::config::{AuthConfig, StorefrontConfig};
    use crate::db::InMemoryStore;

    const SECRET: &str = "k9$Xq2!vLm7#Rt4@Wp8&Zc1^Nb6*Hy3%";

    fn state() -> AppState {
        let store = Arc::new(InMemoryStore::new());
        for (id, email) in [("u1", "ada@example.com"), ("admin", "admin@gmail.com")] {
            store.put_user(
                UserProfile {
                    id: SubjectId::new(id),
                    name: id.to_owned(),
                    email: Email::parse(email).unwrap(),
                    profile_image: String::new(),
                    created_at: Utc::now(),
                },
                "unused",
            );
        }
        let config = StorefrontConfig::with_memory_store(AuthConfig {
            jwt_secret: SecretString::from(SECRET),
            require_token_expiry: false,
            admin_email: Email::parse("admin@gmail.com").unwrap(),
        });
        AppState::in_memory(config, store)
    }

    fn bearer(state: &AppState, subject: &str) -> String {
        let token = state
            .tokens()
            .issue(&SubjectId::new(subject), None)
            .unwrap();
        format!("Bearer {token}")
    }

    async fn send(app: Router, authorization: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().uri("/");
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn counting_app(state: AppState, calls: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/",
                get(move |RequireAuth(identity): RequireAuth| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    axum::Json(serde_json::json!({ "subject": identity.subject_id }))
                }),
            )
            .with_state(state)
    }

    #[test]
    fn test_extract_credential() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            extract_credential(&headers),
            Err(AuthRejection::Unauthenticated)
        ));

        headers.insert(AUTHORIZATION, "".parse().unwrap());
        assert!(matches!(
            extract_credential(&headers),
            Err(AuthRejection::Unauthenticated)
        ));

        headers.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(matches!(
            extract_credential(&headers),
            Err(AuthRejection::InvalidToken)
        ));

        headers.insert(AUTHORIZATION, "raw-token-without-scheme".parse().unwrap());
        assert!(matches!(
            extract_credential(&headers),
            Err(AuthRejection::InvalidToken)
        ));

        headers.insert(AUTHORIZATION, "bearer abc.def.ghi".parse().unwrap());
        assert_eq!(extract_credential(&headers).unwrap(), "abc.def.ghi");
    }

    #[tokio::test]
    async fn test_missing_header_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (status, body) = send(counting_app(state(), Arc::clone(&calls)), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "No token, authorization denied");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_token_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (status, body) = send(
            counting_app(state(), Arc::clone(&calls)),
            Some("Bearer not.a.token"),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Token is not valid");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_without_expiry_yields_identity() {
        let state = state();
        let calls = Arc::new(AtomicUsize::new(0));
        let authorization = bearer(&state, "u1");

        let (status, body) = send(
            counting_app(state, Arc::clone(&calls)),
            Some(&authorization),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"], "u1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_identity_is_inserted_into_extensions() {
        let state = state();
        let authorization = bearer(&state, "u1");
        let app = Router::new()
            .route(
                "/",
                get(
                    |_auth: RequireAuth, Extension(identity): Extension<Identity>| async move {
                        axum::Json(serde_json::json!({ "subject": identity.subject_id }))
                    },
                ),
            )
            .with_state(state);

        let (status, body) = send(app, Some(&authorization)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"], "u1");
    }

    fn admin_app(state: AppState) -> Router {
        Router::new()
            .route(
                "/",
                get(|RequireAdmin(admin): RequireAdmin| async move {
                    axum::Json(serde_json::json!({ "email": admin.profile.email }))
                }),
            )
            .with_state(state)
    }

    #[tokio::test]
    async fn test_require_admin() {
        let state = state();

        let admin = bearer(&state, "admin");
        let (status, body) = send(admin_app(state.clone()), Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "admin@gmail.com");

        let user = bearer(&state, "u1");
        let (status, body) = send(admin_app(state.clone()), Some(&user)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Not authorized as an admin");

        let ghost = bearer(&state, "ghost");
        let (status, _) = send(admin_app(state.clone()), Some(&ghost)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(admin_app(state), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
