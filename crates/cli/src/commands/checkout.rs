//! Checkout command.

use drape_core::PaymentMethod;
use drape_storefront::checkout::{GateDecision, PaymentSelection, payment_prompt};
use drape_storefront::state::AppState;

use super::cart::print_cart;
use super::{CliError, load_catalog};

/// Run the gate and, when it clears, place the order.
///
/// # Errors
///
/// Returns `CliError::NotSignedIn` without a session, or the submission
/// error (empty cart, unavailable products, unconfirmed payment, remote
/// failure).
#[allow(clippy::print_stdout)]
pub async fn run(state: &AppState, payment: PaymentMethod, paid: bool) -> Result<(), CliError> {
    let user = match state.gate().evaluate().await? {
        GateDecision::NoSession => return Err(CliError::NotSignedIn),
        GateDecision::NeedsAddress { .. } => {
            println!("Add a delivery address first: `drape profile address ...`");
            return Ok(());
        }
        GateDecision::Clear { user } => user,
    };

    let (_handle, _) = load_catalog(state).await;
    let cart = state.reconciled_cart()?;
    print_cart(state, &cart);

    if payment == PaymentMethod::PayNow && !paid {
        let totals = cart.totals(&state.config().shipping);
        println!();
        println!("Scan to pay: {}", payment_prompt(totals.total));
        println!("Run again with --paid once the payment is done.");
    }

    let order = state
        .submitter()
        .submit(&user.uid, &cart, PaymentSelection::from_method(payment, paid))
        .await?;

    println!();
    println!("Order placed: {}", order.id);
    if let Some(address) = &user.address {
        println!("Delivering to {}", address.one_line());
    }
    println!("Total: {}", order.total);
    Ok(())
}
