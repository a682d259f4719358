//! Order creation with duplicate-submission detection.
//!
//! A submission is a duplicate when an order with the same
//! `(item_id, quantity, unit_price, order_date)` is already stored. The
//! lookup in [`OrderService::create_order`] catches sequential replays
//! cheaply; concurrent identical submissions are settled by the store, whose
//! insert rejects a second order with the same key.

use chrono::{DateTime, Utc};
use thiserror::Error;

use carlot_core::{Order, OrderRequest, OrderValidationError};

use crate::db::{OrderStore, RepositoryError, UserDirectory};
use crate::models::Identity;

/// Why an order was not created.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request failed validation.
    #[error("invalid order: {0}")]
    Validation(#[from] OrderValidationError),

    /// An order with the same dedup key already exists.
    #[error("order already exists for this car, quantity, price, and order date combination")]
    Duplicate,

    /// The caller's subject does not resolve to a user.
    #[error("customer not found")]
    UnknownCustomer,

    /// The order store or user directory failed. Safe to retry.
    #[error("order store unavailable: {0}")]
    StoreUnavailable(#[source] RepositoryError),
}

/// Order operations for route handlers.
pub struct OrderService<'a> {
    orders: &'a dyn OrderStore,
    users: &'a dyn UserDirectory,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(orders: &'a dyn OrderStore, users: &'a dyn UserDirectory) -> Self {
        Self { orders, users }
    }

    /// Create an order for the caller.
    ///
    /// # Errors
    ///
    /// See [`OrderService::create_order_at`].
    pub async fn create_order(
        &self,
        identity: &Identity,
        request: OrderRequest,
    ) -> Result<Order, OrderError> {
        self.create_order_at(identity, request, Utc::now()).await
    }

    /// Create an order for the caller as of `now`.
    ///
    /// `now` stamps `created_at`/`updated_at` and stands in for a missing
    /// order date.
    ///
    /// # Errors
    ///
    /// - `OrderError::Validation` if the request is malformed
    /// - `OrderError::Duplicate` if the dedup key is taken, including when a
    ///   concurrent request wins the insert
    /// - `OrderError::UnknownCustomer` if the caller is not a stored user
    /// - `OrderError::StoreUnavailable` on collaborator failure
    pub async fn create_order_at(
        &self,
        identity: &Identity,
        request: OrderRequest,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let validated = request.validate(now)?;
        let key = validated.dedup_key();

        if self
            .orders
            .find_by_key(&key)
            .await
            .map_err(OrderError::StoreUnavailable)?
            .is_some()
        {
            tracing::info!(
                customer_id = %identity.subject_id,
                item_id = %key.item_id,
                "duplicate order rejected"
            );
            return Err(OrderError::Duplicate);
        }

        let customer = self
            .users
            .find_by_id(&identity.subject_id)
            .await
            .map_err(OrderError::StoreUnavailable)?
            .ok_or(OrderError::UnknownCustomer)?;

        let order = Order::place(
            identity.subject_id.clone(),
            customer.name,
            customer.email,
            validated,
            now,
        );

        match self.orders.insert(order).await {
            Ok(order) => {
                tracing::info!(
                    order_id = %order.id,
                    customer_id = %order.customer_id,
                    item_id = %order.item_id,
                    total_price = %order.total_price,
                    "order created"
                );
                Ok(order)
            }
            Err(RepositoryError::Conflict(_)) => {
                tracing::info!(
                    customer_id = %identity.subject_id,
                    item_id = %key.item_id,
                    "duplicate order lost insert race"
                );
                Err(OrderError::Duplicate)
            }
            Err(e) => Err(OrderError::StoreUnavailable(e)),
        }
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::StoreUnavailable` if the store fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, OrderError> {
        self.orders.list().await.map_err(OrderError::StoreUnavailable)
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::StoreUnavailable` if the store fails.
    pub async fn list_for(&self, identity: &Identity) -> Result<Vec<Order>, OrderError> {
        self.orders
            .list_by_customer(&identity.subject_id)
            .await
            .map_err(OrderError::StoreUnavailable)
    }
}
