//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod token;

use secrecy::SecretString;

/// `STOREFRONT_DATABASE_URL`, or `DATABASE_URL` when unset.
fn database_url() -> Option<SecretString> {
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
