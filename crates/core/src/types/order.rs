//! Vehicle order types and request validation.
//!
//! An [`OrderRequest`] is what a buyer submits. [`OrderRequest::validate`]
//! turns it into a [`ValidatedOrder`] whose total is recomputed from
//! `quantity * unit_price`, and whose [`DedupKey`] identifies duplicate
//! submissions.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::email::Email;
use super::id::{ItemId, OrderId, SubjectId};
use super::price::{line_total, totals_match};
use super::status::OrderStatus;

/// Payment method recorded when the buyer does not name one.
pub const DEFAULT_PAYMENT_METHOD: &str = "Card";

/// Largest quantity a single order may carry (the store keeps a signed 32-bit column).
pub const MAX_QUANTITY: u32 = 0x7FFF_FFFF;

/// Why an order request was rejected before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderValidationError {
    #[error("item id is required")]
    MissingItemId,

    #[error("item name is required")]
    MissingItemName,

    #[error("quantity must be a positive integer (got {0})")]
    NonPositiveQuantity(i64),

    #[error("quantity {0} is too large")]
    QuantityTooLarge(i64),

    #[error("unit price cannot be negative")]
    NegativeUnitPrice,

    #[error("order total overflows")]
    TotalOverflow,

    #[error("total price {claimed} does not match quantity x unit price ({computed})")]
    TotalMismatch { claimed: Decimal, computed: Decimal },
}

/// Order submission as received from a buyer.
///
/// Field aliases accept the camelCase names used by the existing web client
/// (`carId`, `carName`, `price`, `totalPrice`, `orderDate`).
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    #[serde(alias = "carId")]
    pub item_id: String,
    #[serde(alias = "carName")]
    pub item_name: String,
    pub quantity: i64,
    #[serde(alias = "price")]
    pub unit_price: Decimal,
    #[serde(default, alias = "totalPrice")]
    pub total_price: Option<Decimal>,
    #[serde(default, alias = "orderDate", deserialize_with = "deserialize_order_date")]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "deliveryAddress")]
    pub delivery_address: Option<String>,
    #[serde(default, alias = "paymentMethod")]
    pub payment_method: Option<String>,
}

/// An order request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub order_date: DateTime<Utc>,
    pub phone: Option<String>,
    pub delivery_address: Option<String>,
    pub payment_method: String,
}

/// Natural deduplication key of an order.
///
/// Two orders with equal keys are the same purchase submitted twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub item_id: ItemId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub order_date: DateTime<Utc>,
}

/// A stored vehicle order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: SubjectId,
    pub item_id: ItemId,
    pub item_name: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub phone: Option<String>,
    pub delivery_address: Option<String>,
    pub payment_method: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRequest {
    /// Validate the request.
    ///
    /// `now` is used as the order date when the buyer omits one. Order dates
    /// are truncated to microseconds, the precision the order store keeps.
    ///
    /// # Errors
    ///
    /// Returns `OrderValidationError` for blank item fields, a non-positive
    /// quantity, a negative unit price, or a total that disagrees with
    /// `quantity * unit_price` by more than one cent.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedOrder, OrderValidationError> {
        let item_id = self.item_id.trim();
        if item_id.is_empty() {
            return Err(OrderValidationError::MissingItemId);
        }
        let item_name = self.item_name.trim();
        if item_name.is_empty() {
            return Err(OrderValidationError::MissingItemName);
        }

        if self.quantity <= 0 {
            return Err(OrderValidationError::NonPositiveQuantity(self.quantity));
        }
        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|q| *q <= MAX_QUANTITY)
            .ok_or(OrderValidationError::QuantityTooLarge(self.quantity))?;

        if self.unit_price.is_sign_negative() && !self.unit_price.is_zero() {
            return Err(OrderValidationError::NegativeUnitPrice);
        }
        let unit_price = self.unit_price.normalize();

        let computed =
            line_total(quantity, unit_price).ok_or(OrderValidationError::TotalOverflow)?;
        if let Some(claimed) = self.total_price
            && !totals_match(claimed, computed)
        {
            return Err(OrderValidationError::TotalMismatch { claimed, computed });
        }

        Ok(ValidatedOrder {
            item_id: ItemId::new(item_id),
            item_name: item_name.to_owned(),
            quantity,
            unit_price,
            total_price: computed,
            order_date: self.order_date.unwrap_or(now).trunc_subsecs(6),
            phone: non_blank(self.phone),
            delivery_address: non_blank(self.delivery_address),
            payment_method: non_blank(self.payment_method)
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_owned()),
        })
    }
}

impl ValidatedOrder {
    /// The deduplication key of this order.
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            item_id: self.item_id.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            order_date: self.order_date,
        }
    }
}

impl Order {
    /// Build a new order in the `Processing` state for a resolved customer.
    #[must_use]
    pub fn place(
        customer_id: SubjectId,
        customer_name: String,
        customer_email: Email,
        order: ValidatedOrder,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::generate(),
            customer_id,
            item_id: order.item_id,
            item_name: order.item_name,
            customer_name,
            customer_email,
            phone: order.phone,
            delivery_address: order.delivery_address,
            payment_method: order.payment_method,
            quantity: order.quantity,
            unit_price: order.unit_price,
            total_price: order.total_price,
            order_date: order.order_date,
            status: OrderStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }

    /// The deduplication key of this order.
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            item_id: self.item_id.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price.normalize(),
            order_date: self.order_date,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Accept RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn deserialize_order_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Some(naive.and_utc()))
        .ok_or_else(|| serde::de::Error::custom(format!("invalid order date: {raw}")))
}
