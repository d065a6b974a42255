//! Checkout: deciding whether the user may proceed, then placing the order.
//!
//! [`CheckoutGate`] runs when the user presses checkout and answers one of
//! three states (no session, address missing, clear). [`OrderSubmitter`]
//! turns the reconciled cart into an order document, writes it once and
//! clears the cart.

mod gate;
mod submit;

pub use gate::{CheckoutGate, GateDecision};
pub use submit::{OrderSubmitter, PaymentSelection, build_order, generate_order_id, payment_prompt};
