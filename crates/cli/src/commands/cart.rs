//! Cart commands.

use drape_core::{CartKey, CartLineItem, ProductId};
use drape_storefront::cart::ReconciledCart;
use drape_storefront::error::AppError;
use drape_storefront::state::AppState;

use super::{CliError, load_catalog};

/// Print the cart priced against the live catalog.
///
/// # Errors
///
/// Returns an error if client storage cannot be read.
pub async fn show(state: &AppState) -> Result<(), CliError> {
    let (_handle, _) = load_catalog(state).await;
    let cart = state.reconciled_cart()?;
    print_cart(state, &cart);
    Ok(())
}

/// Add `quantity` units of a product variant.
///
/// # Errors
///
/// Returns `AppError::NotFound` for a product missing from the catalog,
/// `CliError::InvalidArgument` for a size or color the product does not
/// offer, or an error if client storage fails.
#[allow(clippy::print_stdout)]
pub async fn add(
    state: &AppState,
    product_id: &str,
    size: &str,
    color: &str,
    quantity: u32,
) -> Result<(), CliError> {
    let (_handle, snapshot) = load_catalog(state).await;
    let id = ProductId::new(product_id);
    let product = snapshot
        .product(&id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    if !product.sizes.is_empty() && !product.sizes.iter().any(|s| s == size) {
        return Err(CliError::InvalidArgument(format!(
            "size {size} (available: {})",
            product.sizes.join(", ")
        )));
    }
    if !product.colors.is_empty() && !product.colors.iter().any(|c| c == color) {
        return Err(CliError::InvalidArgument(format!(
            "color {color} (available: {})",
            product.colors.join(", ")
        )));
    }

    state
        .cart()
        .add_or_merge(CartLineItem::new(id, quantity, size, color))?;
    println!(
        "Added to cart. {} items in cart.",
        state.cart().item_count()?
    );
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if client storage fails.
#[allow(clippy::print_stdout)]
pub fn remove(state: &AppState, product_id: &str, size: &str, color: &str) -> Result<(), CliError> {
    let key = CartKey::new(product_id, size, color);
    let items = state.cart().remove(&key)?;
    println!("Removed {key}. {} lines left.", items.len());
    Ok(())
}

/// Change the quantity of a line.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` for a zero quantity, or an error if
/// client storage fails.
#[allow(clippy::print_stdout)]
pub fn set_quantity(
    state: &AppState,
    product_id: &str,
    size: &str,
    color: &str,
    quantity: u32,
) -> Result<(), CliError> {
    if quantity == 0 {
        return Err(CliError::InvalidArgument(
            "quantity must be at least 1; use `drape cart remove` instead".to_string(),
        ));
    }
    let key = CartKey::new(product_id, size, color);
    state.cart().update_quantity(&key, quantity)?;
    println!("Updated {key} to {quantity}.");
    Ok(())
}

/// Print `cart` with its totals.
#[allow(clippy::print_stdout)]
pub(crate) fn print_cart(state: &AppState, cart: &ReconciledCart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for line in &cart.lines {
        let name = line
            .product
            .as_ref()
            .map_or("(no longer available)", |p| p.name.as_str());
        println!(
            "{:<32} {:>4} x {:<4} {:<8} {:>10}",
            name,
            line.item.quantity,
            line.item.size,
            line.item.color,
            line.line_total.display()
        );
    }

    let totals = cart.totals(&state.config().shipping);
    println!("{:>62}", format!("Subtotal: {}", totals.subtotal));
    println!("{:>62}", format!("Shipping: {}", totals.shipping_fee));
    println!("{:>62}", format!("Total: {}", totals.total));
}
