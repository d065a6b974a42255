//! Integration tests for Drape.
//!
//! The scenarios drive a full [`AppState`] against the in-memory document
//! store, so they need no network and no running services.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p drape-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - Cart pricing, gate decisions and order submission
//! - `order_tracking` - Listing, live updates and cancellation
//! - `client_storage` - Cart and session survival across restarts

use std::sync::Arc;

use drape_core::Uid;
use drape_storefront::config::StorefrontConfig;
use drape_storefront::remote::{DocumentStore, MemoryDocumentStore};
use drape_storefront::state::AppState;
use drape_storefront::storage::{KeyValueStore, MemoryStorage};
use drape_storefront::subscription::SubscriptionHandle;
use serde_json::{Value, json};

/// Base URL handed to the configuration; never contacted.
pub const TEST_DATABASE_URL: &str = "https://drape-test.example.com";

/// A storefront wired to an in-memory remote store.
pub struct TestContext {
    pub state: AppState,
    pub remote: MemoryDocumentStore,
    /// Keeps the catalog following `remote`.
    pub catalog_feed: SubscriptionHandle,
}

impl TestContext {
    /// Storefront over `remote` with fresh in-memory client storage.
    ///
    /// # Panics
    ///
    /// Panics if the test database URL does not parse.
    pub async fn new(remote: MemoryDocumentStore) -> Self {
        Self::with_storage(remote, Arc::new(MemoryStorage::new())).await
    }

    /// Storefront over `remote` and `storage`, with the catalog loaded.
    ///
    /// # Panics
    ///
    /// Panics if the test database URL does not parse.
    #[allow(clippy::unwrap_used)]
    pub async fn with_storage(remote: MemoryDocumentStore, storage: Arc<dyn KeyValueStore>) -> Self {
        let config = StorefrontConfig::new(TEST_DATABASE_URL.parse().unwrap());
        let state = AppState::new(config, storage, Arc::new(remote.clone()));
        let catalog_feed = state.catalog().subscribe(state.remote());
        state.catalog().wait_until_loaded().await;
        Self {
            state,
            remote,
            catalog_feed,
        }
    }

    /// Store a user record for `uid` and sign them in.
    ///
    /// # Panics
    ///
    /// Panics if the record or session cannot be written.
    #[allow(clippy::unwrap_used)]
    pub async fn signed_in(&self, uid: &str, location_status: bool) -> Uid {
        let uid = Uid::new(uid);
        self.remote
            .set(
                &format!("users/{uid}"),
                json!({
                    "uid": uid.as_str(),
                    "email": format!("{uid}@example.com"),
                    "displayName": uid.as_str(),
                    "locationStatus": location_status,
                }),
            )
            .await
            .unwrap();
        self.state.session().set_uid(&uid).unwrap();
        uid
    }

    /// Every stored order document, keyed by id.
    ///
    /// # Panics
    ///
    /// Panics if the orders collection cannot be read.
    #[allow(clippy::unwrap_used)]
    pub async fn stored_orders(&self) -> serde_json::Map<String, Value> {
        match self.remote.get("orders").await.unwrap() {
            Some(Value::Object(orders)) => orders,
            _ => serde_json::Map::new(),
        }
    }
}

/// A catalog with a tee at 20.00, a jacket at 100.50 and a cap at 15.00.
#[must_use]
pub fn sample_catalog() -> Value {
    json!({
        "products": {
            "p1": {
                "name": "Linen Tee",
                "description": "Breathable everyday tee",
                "price": 20.0,
                "category": "men",
                "subCategory": "topwear",
                "images": ["tee-front.jpg", "tee-back.jpg"],
                "sizes": ["S", "M", "L"],
                "colors": ["Red", "White"],
                "rating": 4.5
            },
            "p2": {
                "name": "Field Jacket",
                "price": 100.5,
                "category": "women",
                "images": ["jacket.jpg"],
                "sizes": ["M"],
                "colors": ["Olive"]
            },
            "p3": {
                "name": "Canvas Cap",
                "price": 15.0,
                "category": "kids",
                "sizes": ["One Size"],
                "colors": ["Blue"]
            }
        }
    })
}
