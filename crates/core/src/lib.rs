//! Carlot Core - Shared domain types.
//!
//! This crate provides the types used across all Carlot components:
//! - `storefront` - Public HTTP API for vehicle orders and accounts
//! - `cli` - Command-line tools for migrations and operator tasks
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. Order validation, the deduplication key, and the order
//! status state machine live here so every component agrees on them.
//!
//! # Modules
//!
//! - [`types`] - Identifiers, emails, price arithmetic, order status, and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
