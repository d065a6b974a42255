//! Sign-in and profile commands.

use drape_core::{Address, Email, Uid};
use drape_storefront::profile::SignInIdentity;
use drape_storefront::state::AppState;

use super::{CliError, require_uid};

/// Sign in with an identity issued by the auth provider.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` for a malformed email, or an error if
/// the user record or session cannot be written.
#[allow(clippy::print_stdout)]
pub async fn login(
    state: &AppState,
    uid: String,
    email: &str,
    display_name: String,
) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    let user = state
        .profile()
        .sign_in(SignInIdentity {
            uid: Uid::new(uid),
            email: email.as_str().to_owned(),
            display_name,
        })
        .await?;

    println!("Welcome, {}!", user.greeting_name());
    if !user.location_status {
        println!("Add a delivery address before checking out.");
    }
    Ok(())
}

/// Sign out and empty the cart.
///
/// # Errors
///
/// Returns an error if client storage cannot be written.
#[allow(clippy::print_stdout)]
pub fn logout(state: &AppState) -> Result<(), CliError> {
    state.profile().sign_out()?;
    println!("Signed out.");
    Ok(())
}

/// Print the signed-in profile.
///
/// # Errors
///
/// Returns `CliError::NotSignedIn` without a session.
#[allow(clippy::print_stdout)]
pub async fn show(state: &AppState) -> Result<(), CliError> {
    let user = state
        .profile()
        .current()
        .await?
        .ok_or(CliError::NotSignedIn)?;

    println!("Name:    {}", user.greeting_name());
    println!("Email:   {}", user.email);
    if !user.bio.is_empty() {
        println!("Bio:     {}", user.bio);
    }
    match &user.address {
        Some(address) if user.location_status => println!("Address: {}", address.one_line()),
        _ => println!("Address: not set"),
    }
    Ok(())
}

/// Save the delivery address of the signed-in user.
///
/// # Errors
///
/// Returns `AppError::InvalidAddress` for an incomplete address.
#[allow(clippy::print_stdout)]
pub async fn save_address(state: &AppState, address: &Address) -> Result<(), CliError> {
    let uid = require_uid(state)?;
    state.profile().save_address(&uid, address).await?;
    println!("Address saved.");
    Ok(())
}

/// Change display name and bio of the signed-in user.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a blank name.
#[allow(clippy::print_stdout)]
pub async fn edit(state: &AppState, display_name: &str, bio: &str) -> Result<(), CliError> {
    let uid = require_uid(state)?;
    state.profile().update_details(&uid, display_name, bio).await?;
    println!("Profile updated.");
    Ok(())
}
