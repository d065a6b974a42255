//! Client storage survives restarts and is shared between instances.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use drape_core::{CartLineItem, Money, ProductId, Uid};
use drape_integration_tests::{TestContext, sample_catalog};
use drape_storefront::catalog::ProductSort;
use drape_storefront::profile::SignInIdentity;
use drape_storefront::remote::MemoryDocumentStore;
use drape_storefront::search::{LastSearch, search_products};
use drape_storefront::storage::{FileStorage, KeyValueStore};

fn file_storage(dir: &tempfile::TempDir) -> Arc<dyn KeyValueStore> {
    Arc::new(FileStorage::open(dir.path().join("client/storage.json")).unwrap())
}

#[tokio::test]
async fn test_cart_and_session_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MemoryDocumentStore::with_data(sample_catalog());

    {
        let ctx = TestContext::with_storage(remote.clone(), file_storage(&dir)).await;
        ctx.state
            .profile()
            .sign_in(SignInIdentity {
                uid: Uid::new("u1"),
                email: "ada@example.com".to_string(),
                display_name: "Ada".to_string(),
            })
            .await
            .unwrap();
        ctx.state
            .cart()
            .add_or_merge(CartLineItem::new("p1", 2, "M", "Red"))
            .unwrap();
    }

    let ctx = TestContext::with_storage(remote, file_storage(&dir)).await;
    assert_eq!(ctx.state.session().current_uid().unwrap(), Some(Uid::new("u1")));
    assert_eq!(
        ctx.state.reconciled_cart().unwrap().subtotal,
        Money::from_cents(4000)
    );
}

#[tokio::test]
async fn test_sign_out_empties_persisted_cart() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MemoryDocumentStore::with_data(sample_catalog());
    let ctx = TestContext::with_storage(remote.clone(), file_storage(&dir)).await;
    ctx.signed_in("u1", true).await;
    ctx.state
        .cart()
        .add_or_merge(CartLineItem::new("p3", 1, "One Size", "Blue"))
        .unwrap();

    ctx.state.profile().sign_out().unwrap();

    let reopened = TestContext::with_storage(remote, file_storage(&dir)).await;
    assert_eq!(reopened.state.session().current_uid().unwrap(), None);
    assert!(reopened.state.cart().get().unwrap().is_empty());
}

#[tokio::test]
async fn test_second_instance_sees_cart_writes() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MemoryDocumentStore::with_data(sample_catalog());
    let first = TestContext::with_storage(remote.clone(), file_storage(&dir)).await;
    let second = TestContext::with_storage(remote, file_storage(&dir)).await;

    first
        .state
        .cart()
        .add_or_merge(CartLineItem::new("p1", 1, "S", "White"))
        .unwrap();
    assert_eq!(second.state.cart().item_count().unwrap(), 1);
}

#[tokio::test]
async fn test_last_search_restored() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MemoryDocumentStore::with_data(sample_catalog());

    {
        let ctx = TestContext::with_storage(remote.clone(), file_storage(&dir)).await;
        let hits = search_products(ctx.state.remote(), "linen", ProductSort::Featured)
            .await
            .unwrap();
        ctx.state
            .search_history()
            .save(&LastSearch::from_hits("linen", ProductSort::Featured, &hits))
            .unwrap();
        ctx.state
            .scroll()
            .save_last_visible(&ProductId::new("p1"), 420)
            .unwrap();
    }

    let ctx = TestContext::with_storage(remote, file_storage(&dir)).await;
    let last = ctx.state.search_history().load().unwrap().unwrap();
    assert_eq!(last.query, "linen");
    assert_eq!(last.results, vec![ProductId::new("p1")]);
    assert_eq!(
        ctx.state.scroll().last_position().unwrap().unwrap().scroll_y,
        420
    );
}
