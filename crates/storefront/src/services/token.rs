//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs with the claim set `{ "user": { "id": .. }, "iat": .., "exp"?: .. }`,
//! compatible with tokens issued by the previous storefront backend.
//!
//! Verification is a pure function of the token, the signing secret, and the
//! instant passed to [`TokenAuthenticator::verify_at`]. The library's own
//! wall-clock expiry check is disabled and replaced by a comparison against
//! that instant.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use carlot_core::SubjectId;

use crate::models::Identity;

/// Lifetime of tokens handed out by the login endpoints.
pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Why a credential was not accepted.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No credential was presented.
    #[error("no token presented")]
    Missing,

    /// Malformed, wrongly signed, wrong algorithm, or missing a required claim.
    #[error("token is not valid")]
    Invalid,

    /// The `exp` claim is at or before the verification instant.
    #[error("token has expired")]
    Expired,

    /// Encoding a new token failed.
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClaimUser {
    id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    user: ClaimUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Issues and verifies bearer tokens under one process-wide secret.
///
/// Implements `Debug` manually so key material never reaches logs.
#[derive(Clone)]
pub struct TokenAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    require_expiry: bool,
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("keys", &"[REDACTED]")
            .field("require_expiry", &self.require_expiry)
            .finish()
    }
}

impl TokenAuthenticator {
    /// Create an authenticator for the given HS256 secret.
    ///
    /// With `require_expiry`, tokens that carry no `exp` claim are rejected.
    #[must_use]
    pub fn new(secret: &SecretString, require_expiry: bool) -> Self {
        let bytes = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
            require_expiry,
        }
    }

    /// Verify a credential against the current time.
    ///
    /// # Errors
    ///
    /// See [`TokenAuthenticator::verify_at`].
    pub fn verify(&self, credential: &str) -> Result<Identity, TokenError> {
        self.verify_at(credential, Utc::now())
    }

    /// Verify a credential as of `now`.
    ///
    /// # Errors
    ///
    /// - `TokenError::Missing` for an empty credential
    /// - `TokenError::Expired` if `exp` is present and `now >= exp`
    /// - `TokenError::Invalid` for anything else that fails
    pub fn verify_at(&self, credential: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(TokenError::Missing);
        }

        let data = jsonwebtoken::decode::<Claims>(credential, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                TokenError::Invalid
            })?;
        let claims = data.claims;

        match claims.exp {
            Some(exp) if now.timestamp() >= exp => return Err(TokenError::Expired),
            None if self.require_expiry => {
                tracing::debug!("token rejected: no exp claim");
                return Err(TokenError::Invalid);
            }
            _ => {}
        }

        let subject = SubjectId::new(claims.user.id);
        if subject.is_blank() {
            tracing::debug!("token rejected: blank subject");
            return Err(TokenError::Invalid);
        }

        Ok(Identity { subject_id: subject })
    }

    /// Issue a token for `subject` valid for `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, subject: &SubjectId, ttl: Option<Duration>) -> Result<String, TokenError> {
        self.issue_at(subject, ttl, Utc::now())
    }

    /// Issue a token as of `now`. `None` produces a token without `exp`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_at(
        &self,
        subject: &SubjectId,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let exp = ttl.map(|ttl| {
            let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
            iat.saturating_add(secs)
        });

        let claims = Claims {
            user: ClaimUser {
                id: subject.as_str().to_owned(),
            },
            iat: Some(iat),
            exp,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const SECRET: &str = "k9$Xq2!vLm7#Rt4@Wp8&Zc1^Nb6*Hy3%";

    fn authenticator() -> TokenAuthenticator {
        TokenAuthenticator::new(&SecretString::from(SECRET), false)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn sign_raw(claims: &serde_json::Value, alg: Algorithm, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issued_token_verifies_to_subject() {
        let auth = authenticator();
        let token = auth
            .issue_at(&SubjectId::new("u1"), Some(TOKEN_TTL), now())
            .unwrap();

        let identity = auth.verify_at(&token, now()).unwrap();
        assert_eq!(identity.subject_id.as_str(), "u1");
    }

    #[test]
    fn test_other_secret_is_invalid() {
        let other = TokenAuthenticator::new(
            &SecretString::from("another-signing-key-0123456789abcdef"),
            false,
        );
        let token = other.issue_at(&SubjectId::new("u1"), None, now()).unwrap();

        let err = authenticator().verify_at(&token, now()).unwrap_err();
        assert!(matches!(err, TokenError::Invalid));
    }

    #[test]
    fn test_expired_token() {
        let auth = authenticator();
        let token = auth
            .issue_at(&SubjectId::new("u1"), Some(TOKEN_TTL), now())
            .unwrap();

        let at_expiry = now() + chrono::TimeDelta::hours(1);
        assert!(matches!(
            auth.verify_at(&token, at_expiry),
            Err(TokenError::Expired)
        ));
        let just_before = at_expiry - chrono::TimeDelta::seconds(1);
        assert!(auth.verify_at(&token, just_before).is_ok());
    }

    #[test]
    fn test_token_without_expiry() {
        let token = sign_raw(&json!({ "user": { "id": "u1" } }), Algorithm::HS256, SECRET);

        let identity = authenticator().verify_at(&token, now()).unwrap();
        assert_eq!(identity.subject_id.as_str(), "u1");

        let strict = TokenAuthenticator::new(&SecretString::from(SECRET), true);
        assert!(matches!(
            strict.verify_at(&token, now()),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_empty_credential_is_missing() {
        assert!(matches!(
            authenticator().verify_at("", now()),
            Err(TokenError::Missing)
        ));
        assert!(matches!(
            authenticator().verify_at("   ", now()),
            Err(TokenError::Missing)
        ));
    }

    #[test]
    fn test_malformed_credentials_are_invalid() {
        let auth = authenticator();
        let alg_none = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJ1c2VyIjp7ImlkIjoidTEifX0.";
        for credential in ["garbage", "a.b.c", alg_none] {
            assert!(
                matches!(auth.verify_at(credential, now()), Err(TokenError::Invalid)),
                "{credential} should be invalid"
            );
        }
    }

    #[test]
    fn test_other_algorithm_is_invalid() {
        let token = sign_raw(&json!({ "user": { "id": "u1" } }), Algorithm::HS512, SECRET);
        assert!(matches!(
            authenticator().verify_at(&token, now()),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_blank_or_missing_subject_is_invalid() {
        let auth = authenticator();
        let blank = sign_raw(&json!({ "user": { "id": " " } }), Algorithm::HS256, SECRET);
        let missing = sign_raw(&json!({ "sub": "u1" }), Algorithm::HS256, SECRET);

        assert!(matches!(auth.verify_at(&blank, now()), Err(TokenError::Invalid)));
        assert!(matches!(auth.verify_at(&missing, now()), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let output = format!("{:?}", authenticator());
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains(SECRET));
    }
}
