//! Authentication service.
//!
//! Password registration and login for buyers, and the admin panel login.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use carlot_core::Email;

use crate::db::{RepositoryError, UserDirectory};
use crate::models::user::DEFAULT_PROFILE_IMAGE;
use crate::models::{NewUser, UserProfile};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub profile_image: Option<String>,
}

/// Authentication service.
///
/// Handles user registration and password login.
pub struct AuthService<'a> {
    users: &'a dyn UserDirectory,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserDirectory) -> Self {
        Self { users }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, form: Registration) -> Result<UserProfile, AuthError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        let email = Email::parse(&form.email)?;
        validate_password(&form.password)?;

        let password_hash = hash_password(&form.password)?;
        let profile_image = form
            .profile_image
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE_IMAGE.to_owned());

        let user = self
            .users
            .create(NewUser {
                name: name.to_owned(),
                email,
                password_hash,
                profile_image,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::InvalidCredentials);
        };

        let (user, password_hash) = self
            .users
            .find_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Login to the admin panel.
    ///
    /// Only `admin_email` may log in here.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IncorrectAdminEmail` for any other email (or if the
    /// admin account has not been created), and
    /// `AuthError::IncorrectAdminPassword` for a wrong password.
    pub async fn admin_login(
        &self,
        email: &str,
        password: &str,
        admin_email: &Email,
    ) -> Result<UserProfile, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::IncorrectAdminEmail)?;
        if &email != admin_email {
            return Err(AuthError::IncorrectAdminEmail);
        }

        let Some((user, password_hash)) = self.users.find_credentials(&email).await? else {
            tracing::warn!("admin panel login attempted before the admin account exists");
            return Err(AuthError::IncorrectAdminEmail);
        };

        verify_password(password, &password_hash)
            .map_err(|_| AuthError::IncorrectAdminPassword)?;

        Ok(user)
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
