//! Core types for Drape.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! records exchanged with the remote document store.

pub mod cart;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;
pub mod user;

pub use cart::{CartKey, CartLineItem};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderLine, OrderTotals, ShippingPolicy};
pub use price::{CurrencyCode, Money};
pub use product::{DisplayIssue, Product};
pub use status::*;
pub use user::{Address, AddressError, UserRecord};
