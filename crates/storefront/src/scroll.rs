//! Listing scroll positions kept in client storage.
//!
//! Lets a listing page return the user to where they were after viewing a
//! product.

use std::sync::Arc;

use drape_core::ProductId;

use crate::storage::{KeyValueStore, StorageError, keys};

/// Last product seen in a listing and the offset it was seen at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollPosition {
    pub product_id: ProductId,
    pub scroll_y: u64,
}

/// Reads and writes scroll bookkeeping.
#[derive(Clone)]
pub struct ScrollTracker {
    storage: Arc<dyn KeyValueStore>,
}

impl ScrollTracker {
    /// Create a tracker over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Remember that `product_id` was on screen at `scroll_y`.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be written.
    pub fn save_last_visible(&self, product_id: &ProductId, scroll_y: u64) -> Result<(), StorageError> {
        self.storage.set(keys::LAST_VISIBLE_PRODUCT, product_id.as_str())?;
        self.storage
            .set(keys::LAST_SCROLL_POSITION, &scroll_y.to_string())
    }

    /// The remembered product and offset. A missing or garbled offset reads
    /// as zero.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be read.
    pub fn last_position(&self) -> Result<Option<ScrollPosition>, StorageError> {
        let Some(product_id) = self.storage.get(keys::LAST_VISIBLE_PRODUCT)? else {
            return Ok(None);
        };
        Ok(Some(ScrollPosition {
            product_id: ProductId::new(product_id),
            scroll_y: self.offset(keys::LAST_SCROLL_POSITION)?,
        }))
    }

    /// Forget the remembered product and offset.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::LAST_VISIBLE_PRODUCT)?;
        self.storage.remove(keys::LAST_SCROLL_POSITION)
    }

    /// Remember the offset of the all-products page.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be written.
    pub fn save_products_scroll(&self, scroll_y: u64) -> Result<(), StorageError> {
        self.storage
            .set(keys::PRODUCTS_SCROLL_POSITION, &scroll_y.to_string())
    }

    /// Offset of the all-products page, zero if never saved.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be read.
    pub fn products_scroll(&self) -> Result<u64, StorageError> {
        self.offset(keys::PRODUCTS_SCROLL_POSITION)
    }

    fn offset(&self, key: &str) -> Result<u64, StorageError> {
        Ok(self
            .storage
            .get(key)?
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_last_visible_round_trip() {
        let tracker = ScrollTracker::new(Arc::new(MemoryStorage::new()));
        assert_eq!(tracker.last_position().unwrap(), None);

        tracker.save_last_visible(&ProductId::new("p7"), 1280).unwrap();
        assert_eq!(
            tracker.last_position().unwrap(),
            Some(ScrollPosition {
                product_id: ProductId::new("p7"),
                scroll_y: 1280,
            })
        );

        tracker.clear().unwrap();
        assert_eq!(tracker.last_position().unwrap(), None);
    }

    #[test]
    fn test_garbled_offset_reads_as_zero() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::LAST_VISIBLE_PRODUCT, "p1").unwrap();
        storage.set(keys::LAST_SCROLL_POSITION, "12.5px").unwrap();

        let tracker = ScrollTracker::new(storage);
        assert_eq!(tracker.last_position().unwrap().unwrap().scroll_y, 0);
        assert_eq!(tracker.products_scroll().unwrap(), 0);

        tracker.save_products_scroll(640).unwrap();
        assert_eq!(tracker.products_scroll().unwrap(), 640);
    }
}
