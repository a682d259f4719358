//! Persistence for the storefront.
//!
//! The order service and the access gate only see the two collaborator
//! traits defined here:
//!
//! - [`OrderStore`] - owns order records and enforces the deduplication key
//! - [`UserDirectory`] - resolves subject IDs to user profiles
//!
//! Two implementations are provided: `PostgreSQL` ([`orders::PgOrderStore`],
//! [`users::PgUserDirectory`]) and process-local maps ([`memory::InMemoryStore`]).
//!
//! # Database schema `carlot`
//!
//! - `users` - registered buyers and the administrative account
//! - `orders` - vehicle orders, `UNIQUE (item_id, quantity, unit_price, order_date)`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p carlot-cli -- migrate
//! ```

pub mod memory;
pub mod orders;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use carlot_core::{DedupKey, Email, Order, SubjectId};

use crate::models::{NewUser, UserProfile};

pub use memory::InMemoryStore;
pub use orders::PgOrderStore;
pub use users::PgUserDirectory;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (duplicate order key, duplicate email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Persistent order storage.
///
/// `insert` must reject an order whose [`DedupKey`] is already stored with
/// `RepositoryError::Conflict`, atomically with respect to concurrent inserts.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Find the order stored under a deduplication key.
    async fn find_by_key(&self, key: &DedupKey) -> Result<Option<Order>, RepositoryError>;

    /// Store a new order.
    async fn insert(&self, order: Order) -> Result<Order, RepositoryError>;

    /// All orders, newest first.
    async fn list(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Orders placed by one customer, newest first.
    async fn list_by_customer(
        &self,
        customer: &SubjectId,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Cheap connectivity check for the readiness endpoint.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// User lookup and registration.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a token subject to a user profile.
    async fn find_by_id(&self, id: &SubjectId) -> Result<Option<UserProfile>, RepositoryError>;

    /// Profile plus password hash, for login only.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(UserProfile, String)>, RepositoryError>;

    /// Register a user. Fails with `Conflict` if the email is taken.
    async fn create(&self, user: NewUser) -> Result<UserProfile, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_or_database(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}
