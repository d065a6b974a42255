//! Application state shared across views.

use std::sync::Arc;

use crate::cart::{CartStore, LiveReconciler, ReconciledCart, reconcile};
use crate::catalog::CatalogCache;
use crate::checkout::{CheckoutGate, OrderSubmitter};
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::orders::OrderTracker;
use crate::profile::ProfileService;
use crate::remote::{DocumentStore, RestDocumentStore};
use crate::scroll::ScrollTracker;
use crate::search::SearchHistory;
use crate::session::SessionStore;
use crate::storage::{FileStorage, KeyValueStore};

/// Application state shared across all views.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration, the two stores and every storefront service. There is no
/// global instance; construct one and pass it along.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    remote: Arc<dyn DocumentStore>,
    session: SessionStore,
    cart: CartStore,
    catalog: CatalogCache,
    gate: CheckoutGate,
    submitter: OrderSubmitter,
    orders: OrderTracker,
    profile: ProfileService,
    search_history: SearchHistory,
    scroll: ScrollTracker,
}

impl AppState {
    /// Create a new application state over explicit stores.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `storage` - Durable client storage
    /// * `remote` - Remote document store
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        storage: Arc<dyn KeyValueStore>,
        remote: Arc<dyn DocumentStore>,
    ) -> Self {
        let session = SessionStore::new(Arc::clone(&storage));
        let cart = CartStore::new(Arc::clone(&storage));
        let gate = CheckoutGate::new(session.clone(), Arc::clone(&remote));
        let submitter = OrderSubmitter::new(Arc::clone(&remote), cart.clone(), config.shipping);
        let orders = OrderTracker::new(Arc::clone(&remote));
        let profile = ProfileService::new(Arc::clone(&remote), session.clone(), cart.clone());

        Self {
            inner: Arc::new(AppStateInner {
                search_history: SearchHistory::new(Arc::clone(&storage)),
                scroll: ScrollTracker::new(storage),
                config,
                remote,
                session,
                cart,
                catalog: CatalogCache::new(),
                gate,
                submitter,
                orders,
                profile,
            }),
        }
    }

    /// Create the state described by `config`: file-backed client storage
    /// and the REST document store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage file is unusable or the HTTP client
    /// cannot be built.
    pub fn from_config(config: StorefrontConfig) -> Result<Self> {
        let storage = FileStorage::open(&config.storage_path)?;
        let remote = RestDocumentStore::new(
            config.database_url.clone(),
            config.database_auth.clone(),
        )?;
        tracing::debug!(storage = %storage.path().display(), "Opened client storage");
        Ok(Self::new(config, Arc::new(storage), Arc::new(remote)))
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the remote document store.
    #[must_use]
    pub fn remote(&self) -> &dyn DocumentStore {
        self.inner.remote.as_ref()
    }

    /// Get a reference to the session marker.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the catalog cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Get a reference to the checkout gate.
    #[must_use]
    pub fn gate(&self) -> &CheckoutGate {
        &self.inner.gate
    }

    /// Get a reference to the order submitter.
    #[must_use]
    pub fn submitter(&self) -> &OrderSubmitter {
        &self.inner.submitter
    }

    /// Get a reference to the order tracker.
    #[must_use]
    pub fn orders(&self) -> &OrderTracker {
        &self.inner.orders
    }

    /// Get a reference to the profile service.
    #[must_use]
    pub fn profile(&self) -> &ProfileService {
        &self.inner.profile
    }

    /// Get a reference to the last-search store.
    #[must_use]
    pub fn search_history(&self) -> &SearchHistory {
        &self.inner.search_history
    }

    /// Get a reference to the scroll tracker.
    #[must_use]
    pub fn scroll(&self) -> &ScrollTracker {
        &self.inner.scroll
    }

    /// Price the stored cart against the current catalog snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be read.
    pub fn reconciled_cart(&self) -> Result<ReconciledCart> {
        let items = self.cart().get()?;
        Ok(reconcile(&items, &self.catalog().snapshot()))
    }

    /// Start a reconciler that follows both the cart and the catalog.
    #[must_use]
    pub fn live_cart(&self) -> LiveReconciler {
        LiveReconciler::spawn(self.cart().watch(), self.catalog().watch())
    }
}
