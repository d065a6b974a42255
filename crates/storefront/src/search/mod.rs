//! Product search.
//!
//! Search reads the `products` collection once per query (it does not use
//! the live catalog cache) and keeps products whose name, description and
//! category together contain every query term. The last search is kept in
//! client storage so returning to the search page restores it.

use std::sync::Arc;

use drape_core::{Product, ProductId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::catalog::{CatalogSnapshot, ProductSort, sort_products};
use crate::error::Result;
use crate::remote::{DocumentStore, PRODUCTS_PATH};
use crate::storage::{KeyValueStore, StorageError, keys, read_json, write_json};

/// Lowercased whitespace-separated terms of `query`.
#[must_use]
pub fn search_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Whether `product` contains every term.
#[must_use]
pub fn matches_terms(product: &Product, terms: &[String]) -> bool {
    let text = product.search_text();
    terms.iter().all(|term| text.contains(term.as_str()))
}

/// Search `products` for `query` and order the hits by `sort`.
///
/// An empty query matches everything.
#[must_use]
pub fn filter_products(products: &[Product], query: &str, sort: ProductSort) -> Vec<Product> {
    let terms = search_terms(query);
    let mut hits: Vec<Product> = products
        .iter()
        .filter(|p| matches_terms(p, &terms))
        .cloned()
        .collect();
    sort_products(&mut hits, sort);
    hits
}

/// Run `query` against the current `products` collection of `store`.
///
/// # Errors
///
/// Returns `AppError::Remote` if the collection cannot be read.
#[instrument(skip(store))]
pub async fn search_products(
    store: &dyn DocumentStore,
    query: &str,
    sort: ProductSort,
) -> Result<Vec<Product>> {
    let collection = store
        .get(PRODUCTS_PATH)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to search products"))?;
    let snapshot = CatalogSnapshot::from_document(collection);
    let hits = filter_products(snapshot.products(), query, sort);
    tracing::debug!(hits = hits.len(), "Search complete");
    Ok(hits)
}

/// The search page state worth restoring.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LastSearch {
    pub query: String,
    pub sort: ProductSort,
    pub results: Vec<ProductId>,
    pub has_searched: bool,
}

impl LastSearch {
    /// State after running `query` with `sort` and getting `hits`.
    #[must_use]
    pub fn from_hits(query: &str, sort: ProductSort, hits: &[Product]) -> Self {
        Self {
            query: query.to_owned(),
            sort,
            results: hits.iter().map(|p| p.id.clone()).collect(),
            has_searched: true,
        }
    }
}

/// Last-search persistence in client storage.
#[derive(Clone)]
pub struct SearchHistory {
    storage: Arc<dyn KeyValueStore>,
}

impl SearchHistory {
    /// Create a history over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// The saved search, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be read.
    pub fn load(&self) -> std::result::Result<Option<LastSearch>, StorageError> {
        read_json(self.storage.as_ref(), keys::LAST_SEARCH)
    }

    /// Remember `search`. Searches that never ran are not saved.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be written.
    pub fn save(&self, search: &LastSearch) -> std::result::Result<(), StorageError> {
        if !search.has_searched {
            return Ok(());
        }
        write_json(self.storage.as_ref(), keys::LAST_SEARCH, search)
    }

    /// Forget the saved search.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be written.
    pub fn clear(&self) -> std::result::Result<(), StorageError> {
        self.storage.remove(keys::LAST_SEARCH)
    }
}
