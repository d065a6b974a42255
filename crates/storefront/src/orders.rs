//! Order tracking and cancellation.
//!
//! Orders live in one flat collection; a user's orders are found by scanning
//! it for a matching `uid`.

use std::sync::Arc;

use drape_core::{DeliveryStatus, Order, OrderId, OrderStatus, Uid};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::remote::{DocumentStore, ORDERS_PATH, RemoteError, order_path};
use crate::subscription::{SubscriptionHandle, listen};

/// Reads, follows and cancels orders.
#[derive(Clone)]
pub struct OrderTracker {
    remote: Arc<dyn DocumentStore>,
}

impl OrderTracker {
    /// Create a tracker.
    #[must_use]
    pub fn new(remote: Arc<dyn DocumentStore>) -> Self {
        Self { remote }
    }

    /// Orders placed by `uid`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn list_for(&self, uid: &Uid) -> Result<Vec<Order>> {
        let collection = self.remote.get(ORDERS_PATH).await?;
        Ok(orders_for(collection, uid))
    }

    /// Deliver the order list of `uid` to `sink` now and on every change.
    ///
    /// A feed failure is delivered once and ends the subscription.
    pub fn watch_for<F>(&self, uid: Uid, mut sink: F) -> SubscriptionHandle
    where
        F: FnMut(Result<Vec<Order>>) + Send + 'static,
    {
        listen(self.remote.watch(ORDERS_PATH), move |event| {
            sink(
                event
                    .map(|collection| orders_for(collection, &uid))
                    .map_err(AppError::from),
            );
        })
    }

    /// Read one order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if there is no such order.
    pub async fn get(&self, order_id: &OrderId) -> Result<Order> {
        let value = self
            .remote
            .get(&order_path(order_id.as_str()))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
        let order = Order::from_document(order_id.as_str(), value).map_err(RemoteError::from)?;
        Ok(order)
    }

    /// Cancel an order that is neither cancelled nor completed.
    ///
    /// Only `status` and `deliveryStatus` are written.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown order,
    /// `AppError::BadRequest` if it can no longer be cancelled, or an error
    /// if the remote store fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel(&self, order_id: &OrderId) -> Result<()> {
        let order = self.get(order_id).await?;
        if !order.status.is_cancellable() {
            return Err(AppError::BadRequest(format!(
                "Order {order_id} is already {}",
                order.status
            )));
        }

        let mut fields = Map::new();
        fields.insert(
            "status".to_owned(),
            serde_json::to_value(OrderStatus::Cancelled).map_err(RemoteError::from)?,
        );
        fields.insert(
            "deliveryStatus".to_owned(),
            serde_json::to_value(DeliveryStatus::Cancelled).map_err(RemoteError::from)?,
        );
        self.remote
            .update(&order_path(order_id.as_str()), fields)
            .await?;

        add_breadcrumb("orders", "Order cancelled", Some(&[("order_id", order_id.as_str())]));
        tracing::info!("Order cancelled");
        Ok(())
    }
}

/// Orders of `uid` in `collection`, newest first.
///
/// Records that cannot be decoded are skipped.
#[must_use]
pub fn orders_for(collection: Option<Value>, uid: &Uid) -> Vec<Order> {
    let Some(Value::Object(records)) = collection else {
        return Vec::new();
    };

    let mut orders: Vec<Order> = records
        .into_iter()
        .filter(|(_, record)| record.get("uid").and_then(Value::as_str) == Some(uid.as_str()))
        .filter_map(|(key, record)| match Order::from_document(&key, record) {
            Ok(order) => Some(order),
            Err(e) => {
                tracing::warn!(order_id = %key, error = %e, "Skipping undecodable order");
                None
            }
        })
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::remote::MemoryDocumentStore;

    fn order_doc(uid: &str, status: &str, created_at: &str) -> Value {
        json!({
            "uid": uid,
            "items": [],
            "paymentMethod": "cod",
            "status": status,
            "deliveryStatus": "processing",
            "subtotal": 40.0, "shippingFee": 10.0, "total": 50.0,
            "createdAt": created_at,
        })
    }

    #[test]
    fn test_orders_for_filters_and_sorts() {
        let collection = json!({
            "o1": order_doc("u1", "pending", "2024-12-01T10:00:00Z"),
            "o2": order_doc("u2", "pending", "2024-12-02T10:00:00Z"),
            "o3": order_doc("u1", "completed", "2024-12-03T10:00:00Z"),
            "o4": { "uid": "u1", "items": "broken" },
        });

        let orders = orders_for(Some(collection), &Uid::new("u1"));
        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["o3", "o1"]);
        assert!(orders_for(None, &Uid::new("u1")).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_pending_order() {
        let store = MemoryDocumentStore::new();
        store
            .set("orders/o1", order_doc("u1", "pending", "2024-12-01T10:00:00Z"))
            .await
            .unwrap();
        let tracker = OrderTracker::new(Arc::new(store.clone()));

        tracker.cancel(&OrderId::new("o1")).await.unwrap();

        let order = tracker.get(&OrderId::new("o1")).await.unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.delivery_status, DeliveryStatus::Cancelled);
        assert_eq!(order.total, drape_core::Money::from_cents(5000));
    }

    #[tokio::test]
    async fn test_cancel_refused_for_final_states() {
        let store = MemoryDocumentStore::new();
        store
            .set("orders/o1", order_doc("u1", "completed", "2024-12-01T10:00:00Z"))
            .await
            .unwrap();
        store
            .set("orders/o2", order_doc("u1", "cancelled", "2024-12-01T10:00:00Z"))
            .await
            .unwrap();
        let tracker = OrderTracker::new(Arc::new(store));

        for id in ["o1", "o2"] {
            let result = tracker.cancel(&OrderId::new(id)).await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
        assert!(matches!(
            tracker.cancel(&OrderId::new("missing")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_watch_for_sees_new_orders() {
        let store = MemoryDocumentStore::new();
        let tracker = OrderTracker::new(Arc::new(store.clone()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let handle = tracker.watch_for(Uid::new("u1"), move |orders| {
            sink.lock().unwrap().push(orders.unwrap().len());
        });

        store
            .set("orders/o1", order_doc("u1", "pending", "2024-12-01T10:00:00Z"))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while seen.lock().unwrap().last() != Some(&1) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        handle.cancel();
    }
}
