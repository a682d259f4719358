//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::{InMemoryStore, OrderStore, UserDirectory};
use crate::services::TokenAuthenticator;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// token authenticator and the two persistence collaborators.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    tokens: TokenAuthenticator,
    orders: Arc<dyn OrderStore>,
    users: Arc<dyn UserDirectory>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The token authenticator is built once from `config.auth`.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        orders: Arc<dyn OrderStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        let tokens = TokenAuthenticator::new(
            &config.auth.jwt_secret,
            config.auth.require_token_expiry,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                tokens,
                orders,
                users,
            }),
        }
    }

    /// State backed by a single [`InMemoryStore`] serving as both collaborators.
    #[must_use]
    pub fn in_memory(config: StorefrontConfig, store: Arc<InMemoryStore>) -> Self {
        Self::new(config, store.clone(), store)
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the token authenticator.
    #[must_use]
    pub fn tokens(&self) -> &TokenAuthenticator {
        &self.inner.tokens
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    /// Get a reference to the user directory.
    #[must_use]
    pub fn users(&self) -> &dyn UserDirectory {
        self.inner.users.as_ref()
    }
}
