//! Order records and checkout totals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ProductId, Uid};
use super::price::Money;
use super::status::{DeliveryStatus, OrderStatus, PaymentMethod, PaymentStatus};

/// Flat-rate shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    /// Fee charged when the subtotal does not exceed the threshold.
    pub flat_fee: Money,
    /// Subtotals strictly above this amount ship free.
    pub free_threshold: Money,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_fee: Money::new(Decimal::from(10)),
            free_threshold: Money::new(Decimal::from(100)),
        }
    }
}

impl ShippingPolicy {
    /// Shipping fee for a cart subtotal.
    #[must_use]
    pub fn fee_for(&self, subtotal: Money) -> Money {
        if subtotal > self.free_threshold {
            Money::ZERO
        } else {
            self.flat_fee
        }
    }

    /// Full price breakdown for a cart subtotal.
    #[must_use]
    pub fn totals(&self, subtotal: Money) -> OrderTotals {
        let shipping_fee = self.fee_for(subtotal);
        OrderTotals {
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
        }
    }
}

/// Subtotal, shipping and grand total of a cart or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub total: Money,
}

/// A snapshot of one purchased line, frozen at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub price: Money,
    pub quantity: u32,
    pub size: String,
    pub color: String,
}

impl OrderLine {
    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}

/// An order document stored under `orders/<id>`.
///
/// Written once at checkout. Afterwards only `status` and `delivery_status`
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub uid: Uid,
    pub items: Vec<OrderLine>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Decode an order document stored under `key`.
    ///
    /// The key wins over any `id` field inside the document.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing or mistyped.
    pub fn from_document(key: &str, mut value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if let Some(fields) = value.as_object_mut() {
            fields.insert("id".to_owned(), serde_json::Value::String(key.to_owned()));
        }
        serde_json::from_value(value)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }
}
