//! Process-local implementations of [`OrderStore`] and [`UserDirectory`].
//!
//! Used by the test suites and by `STOREFRONT_STORE=memory` for local runs.
//! Locks are only held for the synchronous map operations, never across an
//! `.await`, and the dedup check and insert happen under one lock.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use carlot_core::{DedupKey, Email, Order, SubjectId};

use super::{OrderStore, RepositoryError, UserDirectory};
use crate::models::{NewUser, UserProfile};

#[derive(Debug, Default)]
struct OrderTable {
    by_key: HashMap<DedupKey, usize>,
    rows: Vec<Order>,
}

#[derive(Debug, Clone)]
struct UserRecord {
    profile: UserProfile,
    password_hash: String,
}

/// In-memory order store and user directory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    orders: Mutex<OrderTable>,
    users: RwLock<HashMap<SubjectId, UserRecord>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user with a caller-chosen subject ID.
    ///
    /// Replaces any user already stored under the same ID.
    pub fn put_user(&self, profile: UserProfile, password_hash: impl Into<String>) {
        self.users.write().insert(
            profile.id.clone(),
            UserRecord {
                profile,
                password_hash: password_hash.into(),
            },
        );
    }

    /// Number of stored orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.lock().rows.len()
    }

    fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn find_by_key(&self, key: &DedupKey) -> Result<Option<Order>, RepositoryError> {
        let table = self.orders.lock();
        Ok(table
            .by_key
            .get(key)
            .and_then(|&idx| table.rows.get(idx))
            .cloned())
    }

    async fn insert(&self, order: Order) -> Result<Order, RepositoryError> {
        let key = order.dedup_key();
        let mut table = self.orders.lock();
        if table.by_key.contains_key(&key) {
            return Err(RepositoryError::Conflict("order already exists".to_owned()));
        }
        let idx = table.rows.len();
        table.by_key.insert(key, idx);
        table.rows.push(order.clone());
        Ok(order)
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = self.orders.lock().rows.clone();
        Ok(Self::newest_first(rows))
    }

    async fn list_by_customer(
        &self,
        customer: &SubjectId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = self
            .orders
            .lock()
            .rows
            .iter()
            .filter(|o| &o.customer_id == customer)
            .cloned()
            .collect();
        Ok(Self::newest_first(rows))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_by_id(&self, id: &SubjectId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.users.read().get(id).map(|r| r.profile.clone()))
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(UserProfile, String)>, RepositoryError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|r| &r.profile.email == email)
            .map(|r| (r.profile.clone(), r.password_hash.clone())))
    }

    async fn create(&self, user: NewUser) -> Result<UserProfile, RepositoryError> {
        let mut users = self.users.write();
        if users.values().any(|r| r.profile.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let profile = UserProfile {
            id: SubjectId::new(Uuid::new_v4().to_string()),
            name: user.name,
            email: user.email,
            profile_image: user.profile_image,
            created_at: Utc::now(),
        };
        users.insert(
            profile.id.clone(),
            UserRecord {
                profile: profile.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(profile)
    }
}
