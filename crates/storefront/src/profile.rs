//! Sign-in, sign-out and the user profile.
//!
//! Authentication itself happens elsewhere; this module receives the
//! resulting identity, keeps the session marker and maintains the user
//! record under `users/<uid>`.

use std::sync::Arc;

use chrono::Utc;
use drape_core::{Address, Uid, UserRecord};
use serde_json::{Map, Value, json};
use tracing::instrument;

use crate::cart::CartStore;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::remote::{DocumentStore, RemoteError, user_path};
use crate::session::SessionStore;

/// What the authentication provider tells us about a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInIdentity {
    pub uid: Uid,
    pub email: String,
    pub display_name: String,
}

/// User record and session operations.
#[derive(Clone)]
pub struct ProfileService {
    remote: Arc<dyn DocumentStore>,
    session: SessionStore,
    cart: CartStore,
}

impl ProfileService {
    /// Create a profile service.
    #[must_use]
    pub fn new(remote: Arc<dyn DocumentStore>, session: SessionStore, cart: CartStore) -> Self {
        Self {
            remote,
            session,
            cart,
        }
    }

    /// Read the record of `uid`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no record.
    pub async fn fetch(&self, uid: &Uid) -> Result<UserRecord> {
        fetch_user(self.remote.as_ref(), uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {uid}")))
    }

    /// Record of the signed-in user, `None` when signed out.
    ///
    /// # Errors
    ///
    /// Returns an error if storage or the remote read fails.
    pub async fn current(&self) -> Result<Option<UserRecord>> {
        match self.session.current_uid()? {
            Some(uid) => fetch_user(self.remote.as_ref(), &uid).await,
            None => Ok(None),
        }
    }

    /// Start a session for `identity`, creating its user record if needed.
    ///
    /// An existing record is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read or created, or the
    /// session marker cannot be stored.
    #[instrument(skip(self, identity), fields(uid = %identity.uid))]
    pub async fn sign_in(&self, identity: SignInIdentity) -> Result<UserRecord> {
        let user = match fetch_user(self.remote.as_ref(), &identity.uid).await? {
            Some(user) => user,
            None => {
                let user = UserRecord {
                    uid: identity.uid.clone(),
                    email: identity.email,
                    display_name: identity.display_name,
                    ..UserRecord::default()
                };
                let document = serde_json::to_value(&user).map_err(RemoteError::from)?;
                self.remote
                    .set(&user_path(user.uid.as_str()), document)
                    .await?;
                tracing::info!("Created user record");
                user
            }
        };

        self.session.set_uid(&user.uid)?;
        set_sentry_user(&user.uid, Some(user.email.as_str()).filter(|e| !e.is_empty()));
        add_breadcrumb("auth", "Signed in", None);
        Ok(user)
    }

    /// End the session: forget the uid and empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if client storage cannot be written.
    #[instrument(skip(self))]
    pub fn sign_out(&self) -> Result<()> {
        self.session.clear()?;
        self.cart.clear()?;
        add_breadcrumb("auth", "Signed out", None);
        clear_sentry_user();
        Ok(())
    }

    /// Validate and store the delivery address of `uid`.
    ///
    /// Also marks the user as having a location, which unblocks checkout.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidAddress` if validation fails, or an error if
    /// the remote write fails.
    #[instrument(skip(self, address), fields(uid = %uid))]
    pub async fn save_address(&self, uid: &Uid, address: &Address) -> Result<()> {
        address.validate()?;

        let mut fields = Map::new();
        fields.insert(
            "address".to_owned(),
            serde_json::to_value(address).map_err(RemoteError::from)?,
        );
        fields.insert("locationStatus".to_owned(), Value::Bool(true));
        self.update_user(uid, fields).await?;

        add_breadcrumb("profile", "Address saved", None);
        Ok(())
    }

    /// Change the display name and bio of `uid`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a blank display name, or an error
    /// if the remote write fails.
    #[instrument(skip(self, display_name, bio), fields(uid = %uid))]
    pub async fn update_details(&self, uid: &Uid, display_name: &str, bio: &str) -> Result<()> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AppError::BadRequest("Display name is required".to_string()));
        }

        let mut fields = Map::new();
        fields.insert("displayName".to_owned(), json!(display_name));
        fields.insert("bio".to_owned(), json!(bio.trim()));
        self.update_user(uid, fields).await
    }

    async fn update_user(&self, uid: &Uid, mut fields: Map<String, Value>) -> Result<()> {
        fields.insert("lastActive".to_owned(), json!(Utc::now().to_rfc3339()));
        self.remote
            .update(&user_path(uid.as_str()), fields)
            .await?;
        Ok(())
    }
}

/// Read and decode `users/<uid>`. `None` when there is no record.
///
/// # Errors
///
/// Returns an error if the read fails or the record cannot be decoded.
pub(crate) async fn fetch_user(store: &dyn DocumentStore, uid: &Uid) -> Result<Option<UserRecord>> {
    let Some(value) = store.get(&user_path(uid.as_str())).await? else {
        return Ok(None);
    };
    let mut user: UserRecord = serde_json::from_value(value).map_err(RemoteError::from)?;
    if user.uid.as_str().is_empty() {
        user.uid = uid.clone();
    }
    Ok(Some(user))
}
