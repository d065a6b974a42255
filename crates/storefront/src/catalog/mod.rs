//! Product catalog cache fed by a live subscription.
//!
//! The cache holds one immutable [`CatalogSnapshot`] behind a watch channel.
//! Each emission of the `products` feed builds a new snapshot that replaces
//! the previous one wholesale; nothing is merged.
//!
//! # Example
//!
//! ```rust,ignore
//! let catalog = CatalogCache::new();
//! let handle = catalog.subscribe(store.as_ref());
//! let snapshot = catalog.wait_until_loaded().await;
//! if let Some(error) = snapshot.error() {
//!     eprintln!("{error}");
//! }
//! ```

mod browse;

pub use browse::{ProductSort, browse, sort_products};

use std::collections::HashMap;
use std::sync::Arc;

use drape_core::{DisplayIssue, Product, ProductId};
use serde_json::Value;
use tokio::sync::watch;

use crate::remote::{DocumentStore, PRODUCTS_PATH};
use crate::subscription::{SnapshotEvent, SubscriptionHandle, listen};

/// Error shown when the catalog feed fails.
pub const CATALOG_ERROR: &str = "Failed to fetch products";

/// One immutable view of the catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
    loading: bool,
    error: Option<String>,
    skipped: usize,
}

impl CatalogSnapshot {
    /// The empty snapshot shown before the first emission.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// Build a snapshot from the value stored at `products`.
    ///
    /// `None` (no collection) gives an empty catalog. Records that cannot be
    /// decoded are skipped and counted.
    #[must_use]
    pub fn from_document(value: Option<Value>) -> Self {
        let mut products = Vec::new();
        let mut skipped = 0;

        let mut decode = |key: String, record: Value| match Product::from_document(&key, record) {
            Ok(product) => products.push(product),
            Err(e) => {
                tracing::warn!(product_id = %key, error = %e, "Skipping undecodable product");
                skipped += 1;
            }
        };

        match value {
            None => {}
            Some(Value::Object(records)) => {
                for (key, record) in records {
                    decode(key, record);
                }
            }
            // Collections with sequential integer keys come back as arrays.
            Some(Value::Array(records)) => {
                for (i, record) in records.into_iter().enumerate() {
                    if !record.is_null() {
                        decode(i.to_string(), record);
                    }
                }
            }
            Some(other) => {
                tracing::warn!(value = %other, "Product collection is not an object");
            }
        }

        let index = products
            .iter()
            .enumerate()
            .map(|(i, product)| (product.id.clone(), i))
            .collect();

        Self {
            products,
            index,
            loading: false,
            error: None,
            skipped,
        }
    }

    /// The same products with the loading flag cleared and `error` set.
    #[must_use]
    pub fn with_error(&self, error: impl Into<String>) -> Self {
        Self {
            loading: false,
            error: Some(error.into()),
            ..self.clone()
        }
    }

    /// Products in catalog order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Look up a product by id.
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.index.get(id).and_then(|&i| self.products.get(i))
    }

    /// Whether the first emission is still pending.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// User-facing error, if the feed failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of records dropped because they could not be decoded.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products that cannot be rendered as a full card, with the reason.
    #[must_use]
    pub fn display_issues(&self) -> Vec<(&ProductId, DisplayIssue)> {
        self.products
            .iter()
            .filter_map(|p| p.display_issue().map(|issue| (&p.id, issue)))
            .collect()
    }
}

/// Shared handle to the live catalog.
#[derive(Clone)]
pub struct CatalogCache {
    state: Arc<watch::Sender<Arc<CatalogSnapshot>>>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    /// Create a cache in the loading state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(CatalogSnapshot::loading()));
        Self {
            state: Arc::new(state),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.state.borrow().clone()
    }

    /// Look up a product in the current snapshot.
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<Product> {
        self.state.borrow().product(id).cloned()
    }

    /// Subscribe to snapshot replacements.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Arc<CatalogSnapshot>> {
        self.state.subscribe()
    }

    /// Apply one feed event to the cache.
    ///
    /// A value replaces the catalog; an error keeps the last products, stops
    /// loading and records [`CATALOG_ERROR`].
    pub fn apply(&self, event: SnapshotEvent) {
        match event {
            Ok(value) => {
                let snapshot = CatalogSnapshot::from_document(value);
                tracing::info!(
                    products = snapshot.len(),
                    skipped = snapshot.skipped(),
                    "Catalog updated"
                );
                self.state.send_replace(Arc::new(snapshot));
            }
            Err(e) => {
                tracing::error!(error = %e, "Catalog feed failed");
                self.state
                    .send_modify(|current| *current = Arc::new(current.with_error(CATALOG_ERROR)));
            }
        }
    }

    /// Start following the `products` collection of `store`.
    ///
    /// The subscription lives as long as the returned handle.
    pub fn subscribe(&self, store: &dyn DocumentStore) -> SubscriptionHandle {
        let cache = self.clone();
        listen(store.watch(PRODUCTS_PATH), move |event| cache.apply(event))
    }

    /// Wait for the first emission (or failure) and return that snapshot.
    pub async fn wait_until_loaded(&self) -> Arc<CatalogSnapshot> {
        let mut rx = self.watch();
        match rx.wait_for(|snapshot| !snapshot.is_loading()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }
}
