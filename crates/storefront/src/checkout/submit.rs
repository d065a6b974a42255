//! Order construction and submission.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use drape_core::{
    DeliveryStatus, Money, Order, OrderId, OrderLine, OrderStatus, PaymentMethod, PaymentStatus,
    ShippingPolicy, Uid,
};
use rand::Rng;
use tracing::instrument;

use crate::cart::{CartStore, ReconciledCart};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::remote::{DocumentStore, RemoteError, order_path};

/// Image recorded for a line whose product has no images.
const MISSING_IMAGE: &str = "N/A";

const ORDER_ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Payment choice made on the checkout page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSelection {
    /// Cash on delivery.
    CashOnDelivery,
    /// Scan-and-pay; `confirmed` once the user reports the payment done.
    PayNow { confirmed: bool },
}

impl PaymentSelection {
    /// Selection for `method`, with `confirmed` applying to pay-now only.
    #[must_use]
    pub const fn from_method(method: PaymentMethod, confirmed: bool) -> Self {
        match method {
            PaymentMethod::Cod => Self::CashOnDelivery,
            PaymentMethod::PayNow => Self::PayNow { confirmed },
        }
    }

    /// The stored payment method.
    #[must_use]
    pub const fn method(self) -> PaymentMethod {
        match self {
            Self::CashOnDelivery => PaymentMethod::Cod,
            Self::PayNow { .. } => PaymentMethod::PayNow,
        }
    }
}

/// Text encoded into the pay-now QR code.
#[must_use]
pub fn payment_prompt(total: Money) -> String {
    format!("Total Price: {}", total.display())
}

/// A fresh order id: `order_<unix millis>_<9 base-36 chars>`.
#[must_use]
pub fn generate_order_id(now: DateTime<Utc>) -> OrderId {
    let mut rng = rand::rng();
    let suffix: String = (0..ORDER_ID_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
        .collect();
    OrderId::new(format!("order_{}_{suffix}", now.timestamp_millis()))
}

/// Build the order document for `cart`.
///
/// # Errors
///
/// Returns `AppError::EmptyCart` for an empty cart and
/// `AppError::UnavailableProducts` when a line does not resolve.
pub fn build_order(
    id: OrderId,
    uid: Uid,
    cart: &ReconciledCart,
    payment: PaymentMethod,
    shipping: &ShippingPolicy,
    created_at: DateTime<Utc>,
) -> Result<Order> {
    if cart.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let mut items = Vec::with_capacity(cart.lines.len());
    let mut unresolved = Vec::new();
    for line in &cart.lines {
        let Some(product) = &line.product else {
            unresolved.push(line.item.product_id.clone());
            continue;
        };
        items.push(OrderLine {
            product_id: line.item.product_id.clone(),
            name: product.name.clone(),
            image: product
                .primary_image()
                .unwrap_or(MISSING_IMAGE)
                .to_owned(),
            price: product.price,
            quantity: line.item.quantity,
            size: line.item.size.clone(),
            color: line.item.color.clone(),
        });
    }
    if !unresolved.is_empty() {
        return Err(AppError::UnavailableProducts(unresolved));
    }

    let totals = cart.totals(shipping);
    Ok(Order {
        id,
        uid,
        items,
        payment_method: payment,
        payment_status: PaymentStatus::Pending,
        status: OrderStatus::Pending,
        delivery_status: DeliveryStatus::Processing,
        subtotal: totals.subtotal,
        shipping_fee: totals.shipping_fee,
        total: totals.total,
        created_at,
    })
}

/// Places orders and clears the cart afterwards.
///
/// At most one submission runs at a time per submitter (and its clones).
#[derive(Clone)]
pub struct OrderSubmitter {
    remote: Arc<dyn DocumentStore>,
    cart: CartStore,
    shipping: ShippingPolicy,
    in_flight: Arc<AtomicBool>,
}

/// Marks a submission as running until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl OrderSubmitter {
    /// Create a submitter.
    #[must_use]
    pub fn new(remote: Arc<dyn DocumentStore>, cart: CartStore, shipping: ShippingPolicy) -> Self {
        Self {
            remote,
            cart,
            shipping,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a submission is currently running.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Write the order for `cart` and clear the cart.
    ///
    /// Every precondition is checked before anything is written. On failure
    /// the cart is left as it was.
    ///
    /// # Errors
    ///
    /// - `SubmissionInProgress` if another submission is running
    /// - `EmptyCart` / `UnavailableProducts` for an unusable cart
    /// - `PaymentNotConfirmed` for an unconfirmed pay-now selection
    /// - `Remote` if the order write fails
    #[instrument(skip(self, cart), fields(uid = %uid, lines = cart.lines.len()))]
    pub async fn submit(
        &self,
        uid: &Uid,
        cart: &ReconciledCart,
        payment: PaymentSelection,
    ) -> Result<Order> {
        let _in_flight = InFlight::acquire(&self.in_flight).ok_or(AppError::SubmissionInProgress)?;
        add_breadcrumb("checkout", "Order submission started", Some(&[("uid", uid.as_str())]));

        if payment == (PaymentSelection::PayNow { confirmed: false }) {
            return Err(AppError::PaymentNotConfirmed);
        }

        let now = Utc::now();
        let order = build_order(
            generate_order_id(now),
            uid.clone(),
            cart,
            payment.method(),
            &self.shipping,
            now,
        )?;

        let document = serde_json::to_value(&order).map_err(RemoteError::from)?;
        self.remote
            .set(&order_path(order.id.as_str()), document)
            .await?;

        // The order exists now; a failure to clear the cart must not hide it.
        if let Err(e) = self.cart.clear() {
            tracing::warn!(order_id = %order.id, error = %e, "Order placed but cart not cleared");
        }

        let total = order.total.to_string();
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_id", order.id.as_str()), ("total", total.as_str())]),
        );
        tracing::info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok(order)
    }
}
