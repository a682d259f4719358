//! Business logic services for storefront.
//!
//! # Services
//!
//! - `token` - Bearer token issuance and verification
//! - `auth` - Password registration and login
//! - `orders` - Order creation with duplicate detection, order listing

pub mod auth;
pub mod orders;
pub mod token;

pub use auth::{AuthError, AuthService, Registration};
pub use orders::{OrderError, OrderService};
pub use token::{TOKEN_TTL, TokenAuthenticator, TokenError};
