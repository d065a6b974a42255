//! Checkout preconditions.

use std::sync::Arc;

use drape_core::UserRecord;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::profile::fetch_user;
use crate::remote::DocumentStore;
use crate::session::SessionStore;

/// Outcome of pressing checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Nobody is signed in; prompt for sign-in.
    NoSession,
    /// Signed in, but no delivery address is on file; prompt for one.
    NeedsAddress {
        /// The freshly read user record.
        user: UserRecord,
    },
    /// All preconditions hold; continue to payment.
    Clear {
        /// The freshly read user record.
        user: UserRecord,
    },
}

impl GateDecision {
    /// Whether checkout may proceed.
    #[must_use]
    pub const fn is_clear(&self) -> bool {
        matches!(self, Self::Clear { .. })
    }
}

/// Evaluates checkout preconditions against the live user record.
#[derive(Clone)]
pub struct CheckoutGate {
    session: SessionStore,
    remote: Arc<dyn DocumentStore>,
}

impl CheckoutGate {
    /// Create a gate.
    #[must_use]
    pub fn new(session: SessionStore, remote: Arc<dyn DocumentStore>) -> Self {
        Self { session, remote }
    }

    /// Decide whether checkout may proceed.
    ///
    /// The user record is read from the remote store on every call.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the signed-in user has no record, or
    /// an error if storage or the remote read fails.
    #[instrument(skip(self))]
    pub async fn evaluate(&self) -> Result<GateDecision> {
        let Some(uid) = self.session.current_uid()? else {
            return Ok(GateDecision::NoSession);
        };

        let user = fetch_user(self.remote.as_ref(), &uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {uid}")))?;

        if user.location_status {
            Ok(GateDecision::Clear { user })
        } else {
            tracing::debug!(uid = %uid, "Checkout blocked on missing address");
            Ok(GateDecision::NeedsAddress { user })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use drape_core::Uid;
    use serde_json::json;

    use super::*;
    use crate::remote::MemoryDocumentStore;
    use crate::storage::MemoryStorage;

    fn gate(store: &MemoryDocumentStore, uid: Option<&str>) -> CheckoutGate {
        let session = SessionStore::new(Arc::new(MemoryStorage::new()));
        if let Some(uid) = uid {
            session.set_uid(&Uid::new(uid)).unwrap();
        }
        CheckoutGate::new(session, Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_no_session() {
        let store = MemoryDocumentStore::new();
        assert_eq!(gate(&store, None).evaluate().await.unwrap(), GateDecision::NoSession);
    }

    #[tokio::test]
    async fn test_needs_address_when_flag_false_or_absent() {
        let store = MemoryDocumentStore::new();
        store.set("users/u1", json!({ "uid": "u1", "locationStatus": false })).await.unwrap();
        store.set("users/u2", json!({ "email": "b@example.com" })).await.unwrap();

        let first = gate(&store, Some("u1")).evaluate().await.unwrap();
        assert!(matches!(first, GateDecision::NeedsAddress { .. }));

        let second = gate(&store, Some("u2")).evaluate().await.unwrap();
        match second {
            GateDecision::NeedsAddress { user } => assert_eq!(user.uid, Uid::new("u2")),
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clear_and_rereads_every_time() {
        let store = MemoryDocumentStore::new();
        store.set("users/u1", json!({ "uid": "u1", "locationStatus": true })).await.unwrap();
        let gate = gate(&store, Some("u1"));
        assert!(gate.evaluate().await.unwrap().is_clear());

        store.set("users/u1/locationStatus", json!(false)).await.unwrap();
        assert!(!gate.evaluate().await.unwrap().is_clear());
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let store = MemoryDocumentStore::new();
        let result = gate(&store, Some("ghost")).evaluate().await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remote_failure_is_error() {
        let store = MemoryDocumentStore::new();
        store.fail_reads(true);
        let result = gate(&store, Some("u1")).evaluate().await;
        assert!(matches!(result, Err(AppError::Remote(_))));
    }
}
