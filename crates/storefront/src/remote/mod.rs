//! Remote real-time document store.
//!
//! # Architecture
//!
//! - Documents are JSON values addressed by slash-separated paths
//!   (`products`, `users/<uid>`, `orders/<id>`)
//! - `set` replaces a whole document; `update` merges named children
//! - `watch` pushes full snapshots of a path on every change
//! - The store is the source of truth for products, users and orders; the
//!   client never caches beyond the catalog snapshot
//!
//! # Implementations
//!
//! - [`MemoryDocumentStore`] - in-process tree with change notification
//! - [`RestDocumentStore`] - Firebase Realtime Database REST protocol
//!
//! # Example
//!
//! ```rust,ignore
//! use drape_storefront::remote::{DocumentStore, MemoryDocumentStore};
//!
//! let store = MemoryDocumentStore::new();
//! store.set("users/u1", json!({ "uid": "u1", "locationStatus": false })).await?;
//! let user = store.get("users/u1").await?;
//! ```

mod memory;
mod rest;
mod sse;

pub use memory::MemoryDocumentStore;
pub use rest::RestDocumentStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::subscription::Feed;

/// Path of the product collection.
pub const PRODUCTS_PATH: &str = "products";

/// Path of the order collection.
pub const ORDERS_PATH: &str = "orders";

/// Path of the user collection.
pub const USERS_PATH: &str = "users";

/// Path of one user document.
#[must_use]
pub fn user_path(uid: &str) -> String {
    format!("{USERS_PATH}/{uid}")
}

/// Path of one order document.
#[must_use]
pub fn order_path(order_id: &str) -> String {
    format!("{ORDERS_PATH}/{order_id}")
}

/// Errors that can occur when talking to the remote store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed. The request URL is never kept since it carries
    /// the auth token.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// The store answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// Start of the response body, for diagnostics.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The path is empty or contains characters the store forbids.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The store is unreachable or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A live stream was closed by the server.
    #[error("Stream closed: {0}")]
    StreamClosed(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

/// Client contract of the remote document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the value at `path`. `None` when nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>, RemoteError>;

    /// Replace the value at `path`. Writing `null` deletes it.
    async fn set(&self, path: &str, value: Value) -> Result<(), RemoteError>;

    /// Replace only the named children of `path`, leaving siblings intact.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), RemoteError>;

    /// Stream full snapshots of `path`: one immediately, then one per change.
    ///
    /// A failure is delivered as the final event of the feed.
    fn watch(&self, path: &str) -> Feed;
}

/// Split and validate a store path.
///
/// Segments are non-empty and free of the characters the store reserves
/// (`. # $ [ ]`).
///
/// # Errors
///
/// Returns `RemoteError::InvalidPath` for an empty path or a bad segment.
pub fn segments(path: &str) -> Result<Vec<&str>, RemoteError> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if parts.is_empty() {
        return Err(RemoteError::InvalidPath(path.to_owned()));
    }
    for part in &parts {
        if part.contains(['.', '#', '$', '[', ']']) {
            return Err(RemoteError::InvalidPath(path.to_owned()));
        }
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments() {
        assert_eq!(segments("orders/o1").ok(), Some(vec!["orders", "o1"]));
        assert_eq!(segments("/users//u1/").ok(), Some(vec!["users", "u1"]));
        assert!(segments("").is_err());
        assert!(segments("products/a.b").is_err());
        assert!(segments("orders/$id").is_err());
    }

    #[test]
    fn test_document_paths() {
        assert_eq!(user_path("u1"), "users/u1");
        assert_eq!(order_path("order_1_x"), "orders/order_1_x");
    }

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::Status {
            status: 401,
            body: "Permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 401: Permission denied");
    }
}
