//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! CARLOT_ADMIN_PASSWORD='...' carlot-cli admin create -e admin@example.com -n "Admin Name"
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)
//! - `CARLOT_ADMIN_PASSWORD` - Password for the new account
//! - `ADMIN_EMAIL` - Email the server treats as the admin; a mismatch is
//!   reported but not fatal

use carlot_core::{Email, SubjectId};
use carlot_storefront::config::DEFAULT_ADMIN_EMAIL;
use carlot_storefront::db::{PgUserDirectory, create_pool};
use carlot_storefront::services::{AuthError, AuthService, Registration};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use super::database_url;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// Registration rejected (weak password, blank name, storage failure).
    #[error("Registration failed: {0}")]
    Registration(AuthError),
}

/// Create the admin account.
///
/// The account is an ordinary user; what makes it the admin is that its
/// email matches the server's `ADMIN_EMAIL`.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `AdminError` if configuration is missing, the email is taken, or
/// the password is rejected.
pub async fn create_user(email: &str, name: &str) -> Result<SubjectId, AdminError> {
    dotenvy::dotenv().ok();

    let parsed = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;

    let password = std::env::var("CARLOT_ADMIN_PASSWORD")
        .map(SecretString::from)
        .map_err(|_| AdminError::MissingEnvVar("CARLOT_ADMIN_PASSWORD"))?;

    let configured =
        std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_owned());
    if Email::parse(&configured).ok().as_ref() != Some(&parsed) {
        tracing::warn!(
            "{parsed} is not ADMIN_EMAIL ({configured}); the server will not treat it as admin"
        );
    }

    let database_url =
        database_url().ok_or(AdminError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    let pool = create_pool(&database_url).await?;
    let users = PgUserDirectory::new(pool);

    tracing::info!("Creating admin account: {parsed}");
    let user = AuthService::new(&users)
        .register(Registration {
            name: name.to_owned(),
            email: parsed.to_string(),
            password: password.expose_secret().to_owned(),
            profile_image: None,
        })
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => AdminError::UserExists(parsed.to_string()),
            AuthError::InvalidEmail(_) => AdminError::InvalidEmail(email.to_owned()),
            other => AdminError::Registration(other),
        })?;

    tracing::info!("Admin account created");
    Ok(user.id)
}
