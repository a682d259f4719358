//! Core types for Carlot.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use order::{
    DEFAULT_PAYMENT_METHOD, DedupKey, MAX_QUANTITY, Order, OrderRequest, OrderValidationError,
    ValidatedOrder,
};
pub use price::{PRICE_TOLERANCE, line_total, totals_match};
pub use status::{OrderStatus, StatusTransitionError};
