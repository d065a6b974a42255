//! Order tracking commands.

use drape_core::{Order, OrderId};
use drape_storefront::error::AppError;
use drape_storefront::state::AppState;

use super::{CliError, require_uid};

/// Print the orders of the signed-in user, newest first.
///
/// # Errors
///
/// Returns `CliError::NotSignedIn` without a session, or an error if the
/// orders cannot be read.
pub async fn list(state: &AppState) -> Result<(), CliError> {
    let uid = require_uid(state)?;
    let orders = state.orders().list_for(&uid).await?;
    print_orders(&orders);
    Ok(())
}

/// Print the order list now and on every change until Ctrl+C.
///
/// # Errors
///
/// Returns `CliError::NotSignedIn` without a session.
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub async fn watch(state: &AppState) -> Result<(), CliError> {
    let uid = require_uid(state)?;
    let handle = state.orders().watch_for(uid, |update| match update {
        Ok(orders) => {
            println!("--");
            print_orders(&orders);
        }
        Err(e) => {
            e.report();
            eprintln!("{}", e.user_message());
        }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
    }
    handle.cancel();
    Ok(())
}

/// Cancel one of the signed-in user's orders.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an order of another user, or the
/// cancellation error.
#[allow(clippy::print_stdout)]
pub async fn cancel(state: &AppState, order_id: &OrderId) -> Result<(), CliError> {
    let uid = require_uid(state)?;
    let order = state.orders().get(order_id).await?;
    if order.uid != uid {
        return Err(AppError::NotFound(format!("order {order_id}")).into());
    }

    state.orders().cancel(order_id).await?;
    println!("Order {order_id} cancelled.");
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders yet.");
        return;
    }
    for order in orders {
        println!(
            "{}  {}  {:<10} {:<10} {:>3} items {:>10}",
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.id,
            order.status.as_str(),
            order.delivery_status.to_string(),
            order.unit_count(),
            order.total.display()
        );
    }
}
