//! Drape Core - Shared types library.
//!
//! This crate provides common types used across all Drape components:
//! - `storefront` - Storefront services (catalog, cart, checkout, orders)
//! - `cli` - Terminal storefront client
//! - `integration-tests` - End-to-end scenarios against the in-memory store
//!
//! # Architecture
//!
//! The core crate contains only types and pure computations - no I/O, no
//! remote store access, no HTTP clients. This keeps it lightweight and
//! allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, statuses, and the catalog/cart/order/user records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
