//! Shopping cart: the locally persisted cart and its reconciliation against
//! the live catalog.
//!
//! # Architecture
//!
//! - [`CartStore`] owns the durable line items (`cartItems` in client
//!   storage) and publishes every change on a watch channel
//! - [`reconcile`] joins line items with catalog products to price them
//! - [`LiveReconciler`] keeps a reconciled cart current while either side
//!   changes

mod reconcile;
mod store;

pub use reconcile::{LiveReconciler, ReconciledCart, ReconciledLineItem, reconcile};
pub use store::{CartStore, merge_line, remove_line, set_line_quantity};
