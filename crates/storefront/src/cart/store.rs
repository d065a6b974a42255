//! Durable cart line items.

use std::sync::{Arc, Mutex};

use drape_core::{CartKey, CartLineItem};
use tokio::sync::watch;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::storage::{KeyValueStore, keys, read_json, write_json};

/// Shared handle to the cart persisted in client storage.
///
/// Every mutation rewrites the whole stored array and then publishes the new
/// cart to [`CartStore::watch`] receivers. Reads always go back to storage,
/// so a cart written by another process sharing the storage is picked up.
#[derive(Clone)]
pub struct CartStore {
    storage: Arc<dyn KeyValueStore>,
    published: Arc<watch::Sender<Arc<Vec<CartLineItem>>>>,
    write_lock: Arc<Mutex<()>>,
}

impl CartStore {
    /// Open the cart kept in `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let initial = load(storage.as_ref()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read stored cart, starting empty");
            Vec::new()
        });
        let (published, _) = watch::channel(Arc::new(initial));
        Self {
            storage,
            published: Arc::new(published),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current line items.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be read.
    pub fn get(&self) -> Result<Vec<CartLineItem>> {
        load(self.storage.as_ref())
    }

    /// Replace the cart with `items`.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be written.
    pub fn set(&self, items: Vec<CartLineItem>) -> Result<()> {
        let _guard = self.lock()?;
        self.persist(items)
    }

    /// Add `item`, merging it into an existing line with the same key.
    ///
    /// A zero quantity leaves the cart untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be read or written.
    #[instrument(skip(self, item), fields(product_id = %item.product_id))]
    pub fn add_or_merge(&self, item: CartLineItem) -> Result<Vec<CartLineItem>> {
        let product_id = item.product_id.clone();
        let items = self.mutate(|items| merge_line(items, item))?;
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
        Ok(items)
    }

    /// Remove the line with `key`. Removing an absent line is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be read or written.
    #[instrument(skip(self), fields(key = %key))]
    pub fn remove(&self, key: &CartKey) -> Result<Vec<CartLineItem>> {
        self.mutate(|items| remove_line(items, key))
    }

    /// Set the quantity of the line with `key`; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be read or written.
    #[instrument(skip(self), fields(key = %key))]
    pub fn update_quantity(&self, key: &CartKey, quantity: u32) -> Result<Vec<CartLineItem>> {
        self.mutate(|items| set_line_quantity(items, key, quantity))
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be written.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        self.storage.remove(keys::CART_ITEMS)?;
        self.publish(Vec::new());
        Ok(())
    }

    /// Total number of units across all lines.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be read.
    pub fn item_count(&self) -> Result<u32> {
        Ok(self.get()?.iter().map(|item| item.quantity).sum())
    }

    /// Subscribe to cart changes made through this store.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Arc<Vec<CartLineItem>>> {
        self.published.subscribe()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| AppError::Internal("cart lock poisoned".to_string()))
    }

    fn mutate(&self, f: impl FnOnce(&mut Vec<CartLineItem>) -> bool) -> Result<Vec<CartLineItem>> {
        let _guard = self.lock()?;
        let mut items = self.get()?;
        if f(&mut items) {
            self.persist(items.clone())?;
        }
        Ok(items)
    }

    fn persist(&self, items: Vec<CartLineItem>) -> Result<()> {
        write_json(self.storage.as_ref(), keys::CART_ITEMS, &items)?;
        self.publish(items);
        Ok(())
    }

    fn publish(&self, items: Vec<CartLineItem>) {
        self.published.send_replace(Arc::new(items));
    }
}

fn load(storage: &dyn KeyValueStore) -> Result<Vec<CartLineItem>> {
    Ok(read_json(storage, keys::CART_ITEMS)?.unwrap_or_default())
}

/// Merge `item` into `items`. Returns whether anything changed.
///
/// A line with the same key gains the incoming quantity; otherwise the item
/// is appended.
pub fn merge_line(items: &mut Vec<CartLineItem>, item: CartLineItem) -> bool {
    if item.quantity == 0 {
        return false;
    }
    let key = item.key();
    if let Some(existing) = items.iter_mut().find(|line| line.has_key(&key)) {
        existing.quantity = existing.quantity.saturating_add(item.quantity);
    } else {
        items.push(item);
    }
    true
}

/// Remove the line with `key`. Returns whether anything changed.
pub fn remove_line(items: &mut Vec<CartLineItem>, key: &CartKey) -> bool {
    let before = items.len();
    items.retain(|line| !line.has_key(key));
    items.len() != before
}

/// Set the quantity of the line with `key`, removing it at zero. Returns
/// whether anything changed.
pub fn set_line_quantity(items: &mut Vec<CartLineItem>, key: &CartKey, quantity: u32) -> bool {
    if quantity == 0 {
        return remove_line(items, key);
    }
    match items.iter_mut().find(|line| line.has_key(key)) {
        Some(line) if line.quantity != quantity => {
            line.quantity = quantity;
            true
        }
        _ => false,
    }
}
