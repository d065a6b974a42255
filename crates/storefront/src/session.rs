//! Session marker kept in client storage.
//!
//! The marker is the uid of the signed-in user. It is the only thing the
//! checkout gate trusts locally; everything else about the user is re-read
//! from the remote store.

use std::sync::Arc;

use drape_core::Uid;

use crate::storage::{KeyValueStore, StorageError, keys};

/// Reads and writes the locally persisted uid.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create a session store over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// The signed-in uid, if any. A blank marker counts as signed out.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be read.
    pub fn current_uid(&self) -> Result<Option<Uid>, StorageError> {
        Ok(self
            .storage
            .get(keys::SESSION_UID)?
            .filter(|uid| !uid.trim().is_empty())
            .map(Uid::new))
    }

    /// Record `uid` as signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be written.
    pub fn set_uid(&self, uid: &Uid) -> Result<(), StorageError> {
        self.storage.set(keys::SESSION_UID, uid.as_str())
    }

    /// Forget the signed-in uid.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::SESSION_UID)
    }
}
