//! Command implementations.
//!
//! Each command drives the storefront services through an `AppState` and
//! prints a plain-text view of the result.

use std::sync::Arc;

use drape_core::Uid;
use drape_storefront::catalog::CatalogSnapshot;
use drape_storefront::error::AppError;
use drape_storefront::state::AppState;
use drape_storefront::subscription::SubscriptionHandle;
use thiserror::Error;

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod profile;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// A storefront operation failed.
    #[error(transparent)]
    App(#[from] AppError),

    /// The command needs a signed-in user.
    #[error("Not signed in. Run `drape login` first.")]
    NotSignedIn,

    /// An argument was rejected before reaching the storefront.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Report the error: infrastructure failures go to Sentry, and the user
    /// sees a short message.
    #[allow(clippy::print_stderr)]
    pub fn report(&self) {
        match self {
            Self::App(e) => {
                e.report();
                eprintln!("{}", e.user_message());
            }
            other => eprintln!("{other}"),
        }
    }
}

/// Subscribe to the catalog and wait for its first snapshot.
///
/// The catalog keeps following the store while the returned handle lives.
pub(crate) async fn load_catalog(state: &AppState) -> (SubscriptionHandle, Arc<CatalogSnapshot>) {
    let handle = state.catalog().subscribe(state.remote());
    let snapshot = state.catalog().wait_until_loaded().await;
    if let Some(error) = snapshot.error() {
        tracing::warn!(error, "Catalog unavailable");
    }
    if snapshot.skipped() > 0 {
        tracing::debug!(skipped = snapshot.skipped(), "Skipped malformed products");
    }
    (handle, snapshot)
}

/// The signed-in uid.
pub(crate) fn require_uid(state: &AppState) -> Result<Uid, CliError> {
    state
        .session()
        .current_uid()
        .map_err(AppError::from)?
        .ok_or(CliError::NotSignedIn)
}
