//! Domain models for the storefront.
//!
//! Order types are shared with the CLI and live in `carlot-core`; this module
//! holds the types that only the HTTP service needs.

pub mod identity;
pub mod user;

pub use identity::Identity;
pub use user::{NewUser, UserProfile};
