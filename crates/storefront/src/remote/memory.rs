//! In-process document store with live change notification.
//!
//! Holds the whole database as one JSON tree. Every write broadcasts the
//! written path; watchers whose path overlaps it re-read their subtree and
//! emit a fresh snapshot. Failure switches let tests exercise the error
//! paths of the services built on top.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::debug;

use super::{DocumentStore, RemoteError, segments};
use crate::subscription::Feed;

/// Channel capacity for change broadcasts.
const CHANNEL_CAPACITY: usize = 256;

/// An in-memory [`DocumentStore`].
///
/// Cheaply cloneable; clones share the same tree.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<MemoryStoreInner>,
}

struct MemoryStoreInner {
    root: RwLock<Value>,
    changes: broadcast::Sender<String>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MemoryStoreInner {
                root: RwLock::new(Value::Object(Map::new())),
                changes,
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Create a store pre-populated with `root`.
    #[must_use]
    pub fn with_data(root: Value) -> Self {
        let store = Self::new();
        if let Ok(mut tree) = store.inner.root.write() {
            *tree = root;
        }
        store
    }

    /// Make every read (and new watch) fail until switched off.
    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail until switched off.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read(&self, path: &str) -> Result<Option<Value>, RemoteError> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("reads disabled".to_owned()));
        }
        let parts = segments(path)?;
        let tree = self
            .inner
            .root
            .read()
            .map_err(|_| RemoteError::Unavailable("store lock poisoned".to_owned()))?;

        let mut node = &*tree;
        for part in parts {
            match node.get(part) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        Ok((!node.is_null()).then(|| node.clone()))
    }

    fn write(&self, path: &str, value: Value) -> Result<(), RemoteError> {
        let parts = segments(path)?;
        let mut tree = self
            .inner
            .root
            .write()
            .map_err(|_| RemoteError::Unavailable("store lock poisoned".to_owned()))?;
        write_at(&mut tree, &parts, value);
        Ok(())
    }

    fn check_writable(&self) -> Result<(), RemoteError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("writes disabled".to_owned()));
        }
        Ok(())
    }

    fn notify(&self, path: &str) {
        // No receivers simply means nobody is watching.
        let _ = self.inner.changes.send(path.to_owned());
    }
}

/// Store `value` at `parts` below `node`, creating parents and pruning
/// `null`s the way the real store does.
fn write_at(node: &mut Value, parts: &[&str], value: Value) {
    let Some((first, rest)) = parts.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Some(children) = node.as_object_mut() else {
        return;
    };

    if rest.is_empty() {
        if value.is_null() {
            children.remove(*first);
        } else {
            children.insert((*first).to_owned(), value);
        }
        return;
    }

    let child = children
        .entry((*first).to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
    write_at(child, rest, value);

    if child.as_object().is_some_and(Map::is_empty) {
        children.remove(*first);
    }
}

/// Whether a write at `changed` can affect a watcher of `watched`.
fn overlaps(watched: &str, changed: &str) -> bool {
    let watched: Vec<&str> = watched.split('/').filter(|s| !s.is_empty()).collect();
    let changed: Vec<&str> = changed.split('/').filter(|s| !s.is_empty()).collect();
    watched.iter().zip(changed.iter()).all(|(a, b)| a == b)
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, RemoteError> {
        self.read(path)
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), RemoteError> {
        self.check_writable()?;
        self.write(path, value)?;
        debug!(path, "document set");
        self.notify(path);
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), RemoteError> {
        self.check_writable()?;
        let base = segments(path)?.join("/");
        for (key, value) in fields {
            self.write(&format!("{base}/{key}"), value)?;
        }
        debug!(path, "document updated");
        self.notify(path);
        Ok(())
    }

    fn watch(&self, path: &str) -> Feed {
        let (tx, feed) = Feed::channel();
        let store = self.clone();
        let path = path.to_owned();
        // Subscribe before the first read so no write slips between them.
        let mut changes = self.inner.changes.subscribe();

        let producer = tokio::spawn(async move {
            let first = store.read(&path);
            let failed = first.is_err();
            if tx.send(first).is_err() || failed {
                return;
            }

            loop {
                let changed = match changes.recv().await {
                    Ok(changed) => changed,
                    // Missed some notifications: re-read to catch up.
                    Err(broadcast::error::RecvError::Lagged(_)) => path.clone(),
                    Err(broadcast::error::RecvError::Closed) => return,
                };
                if !overlaps(&path, &changed) {
                    continue;
                }

                let snapshot = store.read(&path);
                let failed = snapshot.is_err();
                if tx.send(snapshot).is_err() || failed {
                    return;
                }
            }
        });

        feed.with_producer(&producer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_set_and_get_nested() {
        let store = MemoryDocumentStore::new();
        store.set("users/u1", json!({ "uid": "u1" })).await.unwrap();

        assert_eq!(store.get("users/u1/uid").await.unwrap(), Some(json!("u1")));
        assert_eq!(store.get("users/u2").await.unwrap(), None);
        assert_eq!(store.get("users").await.unwrap(), Some(json!({ "u1": { "uid": "u1" } })));
    }

    #[tokio::test]
    async fn test_set_null_deletes_and_prunes() {
        let store = MemoryDocumentStore::new();
        store.set("orders/o1", json!({ "uid": "u1" })).await.unwrap();
        store.set("orders/o1", Value::Null).await.unwrap();
        assert_eq!(store.get("orders").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_merges_children() {
        let store = MemoryDocumentStore::new();
        store
            .set("orders/o1", json!({ "status": "pending", "total": 50 }))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("status".to_owned(), json!("cancelled"));
        store.update("orders/o1", fields).await.unwrap();

        assert_eq!(
            store.get("orders/o1").await.unwrap(),
            Some(json!({ "status": "cancelled", "total": 50 }))
        );
    }

    #[tokio::test]
    async fn test_fail_switches() {
        let store = MemoryDocumentStore::new();
        store.fail_writes(true);
        assert!(store.set("a", json!(1)).await.is_err());
        store.fail_writes(false);
        store.set("a", json!(1)).await.unwrap();

        store.fail_reads(true);
        assert!(matches!(
            store.get("a").await,
            Err(RemoteError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_watch_emits_initial_and_changes() {
        let store = MemoryDocumentStore::new();
        store.set("products/p1", json!({ "name": "Tee" })).await.unwrap();

        let mut feed = store.watch("products");
        assert_eq!(
            feed.next().await.unwrap().unwrap(),
            Some(json!({ "p1": { "name": "Tee" } }))
        );

        // Unrelated writes are not delivered.
        store.set("users/u1", json!({ "uid": "u1" })).await.unwrap();
        store.set("products/p2", json!({ "name": "Cap" })).await.unwrap();

        let next = feed.next().await.unwrap().unwrap().unwrap();
        assert_eq!(next.as_object().map(Map::len), Some(2));
    }

    #[tokio::test]
    async fn test_watch_reports_read_failure() {
        let store = MemoryDocumentStore::new();
        store.fail_reads(true);
        let mut feed = store.watch("products");
        assert!(feed.next().await.unwrap().is_err());
        assert!(feed.next().await.is_none());
    }

    #[test]
    fn test_overlaps() {
        assert!(overlaps("products", "products/p1"));
        assert!(overlaps("products/p1", "products"));
        assert!(overlaps("orders", "orders"));
        assert!(!overlaps("products", "orders/o1"));
        assert!(!overlaps("products/p1", "products/p2"));
    }
}
