//! Durable client storage.
//!
//! A flat key → string store, the moral equivalent of a browser's local
//! storage. Values that carry structure (the cart, the last search) are JSON
//! documents written whole under a single key; there are no partial writes.
//!
//! # Implementations
//!
//! - [`MemoryStorage`] - process-local map, used by tests and demos
//! - [`FileStorage`] - a JSON object on disk, shared by every process that
//!   opens the same path (last write wins, like two browser tabs)

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage keys used by the storefront.
pub mod keys {
    /// JSON array of cart line items.
    pub const CART_ITEMS: &str = "cartItems";

    /// Session marker: uid of the signed-in user.
    pub const SESSION_UID: &str = "uid";

    /// JSON state of the last search (query, sort, results).
    pub const LAST_SEARCH: &str = "lastSearch";

    /// Product id last seen on screen in a listing.
    pub const LAST_VISIBLE_PRODUCT: &str = "lastVisibleProduct";

    /// Scroll offset recorded with [`LAST_VISIBLE_PRODUCT`].
    pub const LAST_SCROLL_POSITION: &str = "lastScrollPosition";

    /// Scroll offset of the all-products page.
    pub const PRODUCTS_SCROLL_POSITION: &str = "productsScrollPosition";
}

/// Errors that can occur when reading or writing client storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing data could not be parsed.
    #[error("corrupt storage: {0}")]
    Corrupt(String),

    /// A value could not be serialized for storage.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Another thread panicked while holding the storage lock.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A synchronous key → string store.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value stored under `key`.
///
/// A value that fails to decode is reported as `Ok(None)` after logging, so a
/// damaged entry behaves like an absent one instead of wedging the caller.
///
/// # Errors
///
/// Returns an error only if the store itself cannot be read.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unparseable stored value");
            Ok(None)
        }
    }
}

/// Encode `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_json_missing_key() {
        let store = MemoryStorage::new();
        let value: Option<Vec<u32>> = read_json(&store, "nothing").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_read_json_discards_garbage() {
        let store = MemoryStorage::new();
        store.set(keys::CART_ITEMS, "{not json").unwrap();
        let value: Option<Vec<u32>> = read_json(&store, keys::CART_ITEMS).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_write_then_read_json() {
        let store = MemoryStorage::new();
        write_json(&store, "numbers", &[1_u32, 2, 3]).unwrap();
        assert_eq!(store.get("numbers").unwrap().as_deref(), Some("[1,2,3]"));
        let value: Option<Vec<u32>> = read_json(&store, "numbers").unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }
}
