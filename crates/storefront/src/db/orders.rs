//! `PostgreSQL` order store.
//!
//! The deduplication invariant is enforced by the unique index
//! `orders_dedup_key` on `(item_id, quantity, unit_price, order_date)`.
//! Inserts use `ON CONFLICT DO NOTHING`, so of several concurrent inserts
//! with the same key exactly one returns a row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use carlot_core::{DedupKey, Email, ItemId, Order, OrderId, OrderStatus, SubjectId};

use super::{OrderStore, RepositoryError, conflict_or_database};

const ORDER_COLUMNS: &str = r"
    id, customer_id, item_id, item_name, customer_name, customer_email,
    phone, delivery_address, payment_method, quantity, unit_price,
    total_price, order_date, status, created_at, updated_at
";

/// Order store backed by the `carlot.orders` table.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: String,
    item_id: String,
    item_name: String,
    customer_name: String,
    customer_email: String,
    phone: Option<String>,
    delivery_address: Option<String>,
    payment_method: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    order_date: DateTime<Utc>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let customer_email = Email::parse(&row.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid customer email in database: {e}"))
        })?;
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid quantity in database: {}", row.quantity))
        })?;

        Ok(Self {
            id: OrderId::from_uuid(row.id),
            customer_id: SubjectId::new(row.customer_id),
            item_id: ItemId::new(row.item_id),
            item_name: row.item_name,
            customer_name: row.customer_name,
            customer_email,
            phone: row.phone,
            delivery_address: row.delivery_address,
            payment_method: row.payment_method,
            quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            order_date: row.order_date,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn quantity_param(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("quantity {quantity} out of range")))
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_by_key(&self, key: &DedupKey) -> Result<Option<Order>, RepositoryError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM carlot.orders
             WHERE item_id = $1 AND quantity = $2 AND unit_price = $3 AND order_date = $4
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(key.item_id.as_str())
            .bind(quantity_param(key.quantity)?)
            .bind(key.unit_price)
            .bind(key.order_date)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    async fn insert(&self, order: Order) -> Result<Order, RepositoryError> {
        let query = format!(
            "INSERT INTO carlot.orders ({ORDER_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             ON CONFLICT (item_id, quantity, unit_price, order_date) DO NOTHING
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(order.id.as_uuid())
            .bind(order.customer_id.as_str())
            .bind(order.item_id.as_str())
            .bind(&order.item_name)
            .bind(&order.customer_name)
            .bind(order.customer_email.as_str())
            .bind(&order.phone)
            .bind(&order.delivery_address)
            .bind(&order.payment_method)
            .bind(quantity_param(order.quantity)?)
            .bind(order.unit_price)
            .bind(order.total_price)
            .bind(order.order_date)
            .bind(order.status)
            .bind(order.created_at)
            .bind(order.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_or_database(e, "order already exists"))?;

        // No row back means the dedup index swallowed the insert.
        let row = row.ok_or_else(|| RepositoryError::Conflict("order already exists".to_owned()))?;
        Order::try_from(row)
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM carlot.orders ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list_by_customer(
        &self,
        customer: &SubjectId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM carlot.orders
             WHERE customer_id = $1
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(customer.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
