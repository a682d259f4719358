//! User account routes.
//!
//! JSON endpoints for registration, login, the admin panel login, and the
//! admin check used by the admin panel.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::UserProfile;
use crate::routes::extract_json;
use crate::services::{AuthService, Registration, TOKEN_TTL};
use crate::state::AppState;

/// Registration form.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// Email and password login form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response carrying a freshly issued token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    pub message: &'static str,
}

/// Plain success response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Response carrying the caller's profile.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserProfile,
}

fn issue_token(state: &AppState, user: &UserProfile) -> Result<String> {
    Ok(state.tokens().issue(&user.id, Some(TOKEN_TTL))?)
}

/// Register a new user.
///
/// POST /user/register
///
/// # Errors
///
/// Returns 400 for an invalid form or an already registered email.
pub async fn register(
    State(state): State<AppState>,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    let form = extract_json(body)?;

    let user = AuthService::new(state.users())
        .register(Registration {
            name: form.name,
            email: form.email,
            password: form.password,
            profile_image: form.profile_image,
        })
        .await?;
    let token = issue_token(&state, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            success: true,
            token,
            message: "User registered successfully",
        }),
    ))
}

/// Login with email and password.
///
/// POST /user/login
///
/// # Errors
///
/// Returns 400 "Invalid credentials" for an unknown email or wrong password.
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let form = extract_json(body)?;

    let user = AuthService::new(state.users())
        .login(&form.email, &form.password)
        .await?;
    let token = issue_token(&state, &user)?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse {
        success: true,
        token,
        message: "User logged in successfully",
    }))
}

/// Login to the admin panel.
///
/// POST /user/adminpanellogin
///
/// # Errors
///
/// Returns 400 "Incorrect email" for any account other than the admin, and
/// 400 "Incorrect password" for a wrong password.
pub async fn admin_panel_login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let form = extract_json(body)?;

    let admin = AuthService::new(state.users())
        .admin_login(&form.email, &form.password, &state.config().auth.admin_email)
        .await?;
    let token = issue_token(&state, &admin)?;

    tracing::info!(user_id = %admin.id, "admin logged in");
    Ok(Json(TokenResponse {
        success: true,
        token,
        message: "Admin logged in successfully",
    }))
}

/// Confirm that the caller is the admin.
///
/// GET /user/isadmin
pub async fn is_admin(RequireAdmin(_admin): RequireAdmin) -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: "Admin verified successfully",
    })
}

/// The caller's profile.
///
/// GET /user/me
///
/// # Errors
///
/// Returns 404 if the token's subject no longer resolves to a user.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<ProfileResponse>> {
    let user = state
        .users()
        .find_by_id(&identity.subject_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        user,
    }))
}
