//! Pricing the cart against the live catalog.

use std::sync::Arc;

use drape_core::{CartKey, CartLineItem, Money, OrderTotals, Product, ProductId, ShippingPolicy};
use tokio::sync::watch;

use crate::catalog::CatalogSnapshot;
use crate::subscription::SubscriptionHandle;

/// A cart line joined with its catalog product.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledLineItem {
    /// The stored cart line.
    pub item: CartLineItem,
    /// Current catalog record, `None` when the product is not in the catalog.
    pub product: Option<Product>,
    /// Live price times quantity; zero for an unresolved line.
    pub line_total: Money,
}

impl ReconciledLineItem {
    /// Identity of the underlying cart line.
    #[must_use]
    pub fn key(&self) -> CartKey {
        self.item.key()
    }

    /// Whether the line refers to a product present in the catalog.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.product.is_some()
    }
}

/// The whole cart, priced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconciledCart {
    /// One entry per cart line, in cart order.
    pub lines: Vec<ReconciledLineItem>,
    /// Sum of line totals.
    pub subtotal: Money,
}

impl ReconciledCart {
    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.lines.iter().map(|line| line.item.quantity).sum()
    }

    /// Subtotal, shipping and grand total under `policy`.
    #[must_use]
    pub fn totals(&self, policy: &ShippingPolicy) -> OrderTotals {
        policy.totals(self.subtotal)
    }

    /// Product ids of lines that did not resolve against the catalog.
    #[must_use]
    pub fn unresolved(&self) -> Vec<ProductId> {
        self.lines
            .iter()
            .filter(|line| !line.is_resolved())
            .map(|line| line.item.product_id.clone())
            .collect()
    }

    /// Whether any line refers to `product_id`.
    #[must_use]
    pub fn contains_product(&self, product_id: &ProductId) -> bool {
        self.lines
            .iter()
            .any(|line| &line.item.product_id == product_id)
    }
}

/// Price `items` against `catalog`.
///
/// A line whose product is missing stays in the result with no product and a
/// zero total, so the cart still renders. A line whose total does not fit in
/// the money range is treated the same way.
#[must_use]
pub fn reconcile(items: &[CartLineItem], catalog: &CatalogSnapshot) -> ReconciledCart {
    let mut lines = Vec::with_capacity(items.len());
    let mut subtotal = Money::ZERO;

    for item in items {
        let priced = catalog.product(&item.product_id).and_then(|product| {
            let line_total = product.price.checked_mul(item.quantity)?;
            let next = subtotal.checked_add(line_total)?;
            Some((product.clone(), line_total, next))
        });

        let line = match priced {
            Some((product, line_total, next)) => {
                subtotal = next;
                ReconciledLineItem {
                    item: item.clone(),
                    product: Some(product),
                    line_total,
                }
            }
            None => {
                if catalog.product(&item.product_id).is_some() {
                    tracing::warn!(
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        "Cart line total out of range"
                    );
                }
                ReconciledLineItem {
                    item: item.clone(),
                    product: None,
                    line_total: Money::ZERO,
                }
            }
        };
        lines.push(line);
    }

    ReconciledCart { lines, subtotal }
}

/// A reconciled cart kept current by a background task.
///
/// The task recomputes from the latest cart and catalog whenever either
/// publishes, replacing the previous result. Dropping the reconciler stops
/// the task.
pub struct LiveReconciler {
    output: watch::Receiver<Arc<ReconciledCart>>,
    handle: SubscriptionHandle,
}

impl LiveReconciler {
    /// Start reconciling `cart` against `catalog`.
    pub fn spawn(
        mut cart: watch::Receiver<Arc<Vec<CartLineItem>>>,
        mut catalog: watch::Receiver<Arc<CatalogSnapshot>>,
    ) -> Self {
        let items = cart.borrow_and_update().clone();
        let snapshot = catalog.borrow_and_update().clone();
        let (tx, output) = watch::channel(Arc::new(reconcile(&items, &snapshot)));

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = cart.changed() => if changed.is_err() { return },
                    changed = catalog.changed() => if changed.is_err() { return },
                }
                let items = cart.borrow_and_update().clone();
                let snapshot = catalog.borrow_and_update().clone();
                if tx.send(Arc::new(reconcile(&items, &snapshot))).is_err() {
                    return;
                }
            }
        });

        Self {
            output,
            handle: SubscriptionHandle::from_task(&task),
        }
    }

    /// The latest reconciled cart.
    #[must_use]
    pub fn current(&self) -> Arc<ReconciledCart> {
        self.output.borrow().clone()
    }

    /// Receiver of every recomputed cart.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Arc<ReconciledCart>> {
        self.output.clone()
    }

    /// Stop recomputing.
    pub fn stop(self) {
        self.handle.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    fn catalog(value: serde_json::Value) -> CatalogSnapshot {
        CatalogSnapshot::from_document(Some(value))
    }

    fn money(units: i64) -> Money {
        Money::new(Decimal::from(units))
    }

    #[test]
    fn test_single_line_scenario() {
        let catalog = catalog(json!({ "p1": { "name": "Tee", "price": 20.0, "images": ["a.jpg"] } }));
        let cart = reconcile(&[CartLineItem::new("p1", 2, "M", "Red")], &catalog);

        assert_eq!(cart.subtotal, money(40));
        let totals = cart.totals(&ShippingPolicy::default());
        assert_eq!(totals.shipping_fee, money(10));
        assert_eq!(totals.total, money(50));
    }

    #[test]
    fn test_missing_product_degrades_to_zero() {
        let catalog = catalog(json!({ "p1": { "name": "Tee", "price": 20.0 } }));
        let cart = reconcile(
            &[
                CartLineItem::new("p1", 1, "M", "Red"),
                CartLineItem::new("gone", 3, "M", "Red"),
            ],
            &catalog,
        );

        assert_eq!(cart.lines.len(), 2);
        assert!(cart.lines[1].product.is_none());
        assert_eq!(cart.lines[1].line_total, Money::ZERO);
        assert_eq!(cart.subtotal, money(20));
        assert_eq!(cart.unresolved(), vec![ProductId::new("gone")]);
        assert!(cart.contains_product(&ProductId::new("gone")));
    }

    #[test]
    fn test_subtotal_independent_of_order() {
        let catalog = catalog(json!({
            "p1": { "name": "Tee", "price": 19.99 },
            "p2": { "name": "Cap", "price": 5.5 },
        }));
        let a = CartLineItem::new("p1", 3, "M", "Red");
        let b = CartLineItem::new("p2", 2, "L", "Blue");

        let forward = reconcile(&[a.clone(), b.clone()], &catalog);
        let backward = reconcile(&[b, a], &catalog);
        assert_eq!(forward.subtotal, backward.subtotal);
        assert_eq!(forward.subtotal, Money::new(Decimal::new(7097, 2)));
    }

    #[test]
    fn test_out_of_range_line_is_unresolved() {
        let catalog = catalog(json!({
            "p1": { "name": "Tee", "price": 20.0 },
            "big": { "name": "Gold", "price": 5.0e28 },
        }));
        let cart = reconcile(
            &[
                CartLineItem::new("p1", 1, "M", "Red"),
                CartLineItem::new("big", 2, "M", "Red"),
            ],
            &catalog,
        );

        assert_eq!(cart.lines.len(), 2);
        assert!(!cart.lines[1].is_resolved());
        assert_eq!(cart.lines[1].line_total, Money::ZERO);
        assert_eq!(cart.subtotal, money(20));
        assert_eq!(cart.unresolved(), vec![ProductId::new("big")]);
    }

    #[test]
    fn test_out_of_range_subtotal_is_unresolved() {
        // Each line fits on its own; the second pushes the sum out of range.
        let catalog = catalog(json!({
            "a": { "name": "Gold", "price": 5.0e28 },
            "b": { "name": "Gold", "price": 5.0e28 },
        }));
        let cart = reconcile(
            &[
                CartLineItem::new("a", 1, "M", "Red"),
                CartLineItem::new("b", 1, "M", "Red"),
            ],
            &catalog,
        );

        assert!(cart.lines[0].is_resolved());
        assert_eq!(cart.unresolved(), vec![ProductId::new("b")]);
        assert_eq!(cart.subtotal, cart.lines[0].line_total);
    }

    #[tokio::test]
    async fn test_live_reconciler_survives_out_of_range_price() {
        let (_cart_tx, cart_rx) = watch::channel(Arc::new(vec![CartLineItem::new("p1", 2, "M", "Red")]));
        let (catalog_tx, catalog_rx) = watch::channel(Arc::new(CatalogSnapshot::loading()));

        let live = LiveReconciler::spawn(cart_rx, catalog_rx);
        let mut rx = live.watch();
        let priced = |price: f64| Arc::new(catalog(json!({ "p1": { "name": "Tee", "price": price } })));

        catalog_tx.send_replace(priced(20.0));
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|c| c.subtotal == money(40)))
            .await
            .unwrap()
            .unwrap();

        catalog_tx.send_replace(priced(5.0e28));
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|c| c.subtotal == Money::ZERO))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.current().unresolved(), vec![ProductId::new("p1")]);

        catalog_tx.send_replace(priced(25.0));
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|c| c.subtotal == money(50)))
            .await
            .unwrap()
            .unwrap();

        live.stop();
    }

    #[tokio::test]
    async fn test_live_reconciler_follows_both_sources() {
        let (cart_tx, cart_rx) = watch::channel(Arc::new(vec![CartLineItem::new("p1", 1, "M", "Red")]));
        let (catalog_tx, catalog_rx) = watch::channel(Arc::new(CatalogSnapshot::loading()));

        let live = LiveReconciler::spawn(cart_rx, catalog_rx);
        let mut rx = live.watch();
        assert_eq!(live.current().subtotal, Money::ZERO);

        catalog_tx.send_replace(Arc::new(catalog(json!({ "p1": { "name": "Tee", "price": 20.0 } }))));
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|c| c.subtotal == money(20)))
            .await
            .unwrap()
            .unwrap();

        cart_tx.send_replace(Arc::new(vec![CartLineItem::new("p1", 4, "M", "Red")]));
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|c| c.subtotal == money(80)))
            .await
            .unwrap()
            .unwrap();

        live.stop();
    }
}
