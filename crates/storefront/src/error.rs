//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for every storefront operation. Views
//! show [`AppError::user_message`] and call [`AppError::report`], which
//! captures infrastructure failures to Sentry before they reach the user.

use drape_core::{AddressError, ProductId};
use thiserror::Error;

use crate::remote::RemoteError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remote document store operation failed.
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested operation is not allowed in the current state.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Checkout was attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart lines reference products missing from the catalog.
    #[error("Products no longer available: {}", join_ids(.0))]
    UnavailableProducts(Vec<ProductId>),

    /// Pay-now was selected but the payment was not confirmed.
    #[error("Payment not confirmed")]
    PaymentNotConfirmed,

    /// Another order submission is still running.
    #[error("An order submission is already in progress")]
    SubmissionInProgress,

    /// The address failed validation.
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_ids(ids: &[ProductId]) -> String {
    ids.iter()
        .map(ProductId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl AppError {
    /// Whether this error comes from infrastructure rather than user input.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Remote(_) | Self::Internal(_))
    }

    /// Message safe to show in a blocking alert.
    ///
    /// Internal details are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) => "Could not access local storage".to_string(),
            Self::Remote(_) => "Could not reach the store. Please try again".to_string(),
            Self::Internal(_) => "Something went wrong".to_string(),
            Self::EmptyCart => "Your cart is empty".to_string(),
            Self::UnavailableProducts(_) => {
                "Some items in your cart are no longer available".to_string()
            }
            Self::PaymentNotConfirmed => "Please complete the payment first".to_string(),
            Self::SubmissionInProgress => "Your order is already being placed".to_string(),
            Self::InvalidAddress(err) => err.to_string(),
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
        }
    }

    /// Capture infrastructure errors to Sentry and log them.
    ///
    /// User-facing failures (validation, preconditions) are logged at debug
    /// only.
    pub fn report(&self) {
        if self.is_infrastructure() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "Operation refused");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after sign-in to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("user u1".to_string());
        assert_eq!(err.to_string(), "Not found: user u1");

        let err = AppError::UnavailableProducts(vec![ProductId::new("p1"), ProductId::new("p9")]);
        assert_eq!(err.to_string(), "Products no longer available: p1, p9");
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AppError::Remote(RemoteError::Status {
            status: 500,
            body: "stack trace".to_string(),
        });
        assert!(!err.user_message().contains("stack trace"));

        let err = AppError::Internal("lock poisoned".to_string());
        assert_eq!(err.user_message(), "Something went wrong");
    }

    #[test]
    fn test_infrastructure_classification() {
        assert!(AppError::Internal("x".to_string()).is_infrastructure());
        assert!(AppError::Storage(StorageError::Poisoned).is_infrastructure());
        assert!(!AppError::EmptyCart.is_infrastructure());
        assert!(!AppError::SubmissionInProgress.is_infrastructure());
        assert!(!AppError::BadRequest("x".to_string()).is_infrastructure());
    }

    #[test]
    fn test_report_without_sentry_client() {
        // Capturing with no client bound is a no-op.
        AppError::Internal("boom".to_string()).report();
        AppError::EmptyCart.report();
    }
}
