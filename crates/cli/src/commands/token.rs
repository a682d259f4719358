//! Bearer token commands.
//!
//! # Usage
//!
//! ```bash
//! carlot-cli token issue --subject <user-id>
//! carlot-cli token issue --subject <user-id> --ttl-secs 600
//! carlot-cli token issue --subject <user-id> --no-expiry
//! ```
//!
//! # Environment Variables
//!
//! - `JWT_SECRET` - Signing secret shared with the server
//! - `AUTH_REQUIRE_TOKEN_EXPIRY` - When true, `--no-expiry` is refused since
//!   the server would reject the token

use std::time::Duration;

use carlot_core::SubjectId;
use carlot_storefront::config::{AuthConfig, ConfigError};
use carlot_storefront::services::{TOKEN_TTL, TokenAuthenticator, TokenError};
use thiserror::Error;

/// Errors that can occur while issuing a token.
#[derive(Debug, Error)]
pub enum IssueError {
    /// Secret or related settings are missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Subject is empty.
    #[error("Subject must not be blank")]
    BlankSubject,

    /// The server is configured to reject tokens without `exp`.
    #[error("AUTH_REQUIRE_TOKEN_EXPIRY is set; a token without expiry would be rejected")]
    ExpiryRequired,

    /// Signing failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

/// How long an issued token stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Expires after the given duration.
    Expires(Duration),
    /// No `exp` claim.
    Unbounded,
}

impl Lifetime {
    /// Map command-line flags to a lifetime; no flags means the default TTL.
    #[must_use]
    pub const fn from_args(ttl_secs: Option<u64>, no_expiry: bool) -> Self {
        if no_expiry {
            return Self::Unbounded;
        }
        match ttl_secs {
            Some(secs) => Self::Expires(Duration::from_secs(secs)),
            None => Self::Expires(TOKEN_TTL),
        }
    }

    const fn ttl(self) -> Option<Duration> {
        match self {
            Self::Expires(ttl) => Some(ttl),
            Self::Unbounded => None,
        }
    }
}

/// Issue a token signed with the configured `JWT_SECRET`.
///
/// # Errors
///
/// Returns `IssueError` if configuration is invalid or signing fails.
pub fn issue(subject: &str, lifetime: Lifetime) -> Result<String, IssueError> {
    dotenvy::dotenv().ok();

    let config = AuthConfig::from_env()?;
    if config.require_token_expiry && lifetime == Lifetime::Unbounded {
        return Err(IssueError::ExpiryRequired);
    }

    let authenticator = TokenAuthenticator::new(&config.jwt_secret, config.require_token_expiry);
    let token = sign(&authenticator, subject, lifetime)?;

    tracing::info!(subject, ?lifetime, "Token issued");
    Ok(token)
}

fn sign(
    authenticator: &TokenAuthenticator,
    subject: &str,
    lifetime: Lifetime,
) -> Result<String, IssueError> {
    let subject = SubjectId::new(subject.trim());
    if subject.is_blank() {
        return Err(IssueError::BlankSubject);
    }
    Ok(authenticator.issue(&subject, lifetime.ttl())?)
}
