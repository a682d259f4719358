//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use carlot_core::{Email, SubjectId};

/// Avatar assigned when a user registers without one.
pub const DEFAULT_PROFILE_IMAGE: &str =
    "https://www.pngitem.com/pimgs/m/146-1468479_my-profile-icon-blank-profile-picture-circle-hd.png";

/// A storefront user as seen by the rest of the service.
///
/// The password hash is deliberately absent; only the login path reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    /// Subject ID carried in issued tokens.
    pub id: SubjectId,
    /// Display name, copied onto orders as the customer name.
    pub name: String,
    /// Normalized email address.
    pub email: Email,
    /// Avatar URL.
    pub profile_image: String,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

/// A user about to be stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub profile_image: String,
}
