//! Order listing, live updates and cancellation.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use drape_core::{CartLineItem, DeliveryStatus, OrderId, OrderStatus};
use drape_integration_tests::{TestContext, sample_catalog};
use drape_storefront::checkout::PaymentSelection;
use drape_storefront::error::AppError;
use drape_storefront::remote::{DocumentStore, MemoryDocumentStore};
use serde_json::json;
use tokio::sync::mpsc;

async fn place_order(ctx: &TestContext, uid: &drape_core::Uid) -> OrderId {
    ctx.state
        .cart()
        .add_or_merge(CartLineItem::new("p1", 1, "M", "Red"))
        .unwrap();
    let cart = ctx.state.reconciled_cart().unwrap();
    ctx.state
        .submitter()
        .submit(uid, &cart, PaymentSelection::CashOnDelivery)
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_orders_listed_per_user() {
    let ctx = TestContext::new(MemoryDocumentStore::with_data(sample_catalog())).await;
    let uid = ctx.signed_in("u1", true).await;
    let first = place_order(&ctx, &uid).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = place_order(&ctx, &uid).await;

    ctx.remote
        .set(
            "orders/someone_else",
            json!({
                "uid": "u2",
                "items": [],
                "paymentMethod": "cod",
                "subtotal": 0,
                "shippingFee": 0,
                "total": 0,
                "createdAt": "2024-01-01T00:00:00Z"
            }),
        )
        .await
        .unwrap();

    let orders = ctx.state.orders().list_for(&uid).await.unwrap();
    let ids: Vec<&OrderId> = orders.iter().map(|o| &o.id).collect();
    assert_eq!(ids, vec![&second, &first]);
}

#[tokio::test]
async fn test_cancel_pending_order() {
    let ctx = TestContext::new(MemoryDocumentStore::with_data(sample_catalog())).await;
    let uid = ctx.signed_in("u1", true).await;
    let id = place_order(&ctx, &uid).await;

    ctx.state.orders().cancel(&id).await.unwrap();

    let order = ctx.state.orders().get(&id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.delivery_status, DeliveryStatus::Cancelled);
    // Only the two status fields change.
    assert_eq!(order.items.len(), 1);

    let again = ctx.state.orders().cancel(&id).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn test_completed_order_cannot_be_cancelled() {
    let ctx = TestContext::new(MemoryDocumentStore::with_data(sample_catalog())).await;
    let uid = ctx.signed_in("u1", true).await;
    let id = place_order(&ctx, &uid).await;
    ctx.remote
        .set(&format!("orders/{id}/status"), json!("completed"))
        .await
        .unwrap();

    let result = ctx.state.orders().cancel(&id).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(
        ctx.state.orders().get(&id).await.unwrap().status,
        OrderStatus::Completed
    );
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let ctx = TestContext::new(MemoryDocumentStore::with_data(sample_catalog())).await;
    let result = ctx.state.orders().cancel(&OrderId::new("order_missing")).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_watch_follows_status_changes() {
    let ctx = TestContext::new(MemoryDocumentStore::with_data(sample_catalog())).await;
    let uid = ctx.signed_in("u1", true).await;
    let id = place_order(&ctx, &uid).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = ctx.state.orders().watch_for(uid, move |update| {
        let _ = tx.send(update.map(|orders| orders.first().map(|o| o.delivery_status)));
    });

    let initial = rx.recv().await.unwrap().unwrap();
    assert_eq!(initial, Some(DeliveryStatus::Processing));

    ctx.remote
        .set(&format!("orders/{id}/deliveryStatus"), json!("shipped"))
        .await
        .unwrap();

    let shipped = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(update) = rx.recv().await {
            if matches!(update, Ok(Some(DeliveryStatus::Shipped))) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap();
    assert!(shipped);
    handle.cancel();
}
