//! Product listing, detail and search commands.

use drape_core::{Product, ProductId};
use drape_storefront::catalog::{ProductSort, browse};
use drape_storefront::error::AppError;
use drape_storefront::search::{LastSearch, search_products};
use drape_storefront::state::AppState;

use super::{CliError, load_catalog};

/// Print the products of `category` (every product when empty).
#[allow(clippy::print_stdout)]
pub async fn list(state: &AppState, category: &str, sort: ProductSort) {
    let (_handle, snapshot) = load_catalog(state).await;
    if let Some(error) = snapshot.error() {
        println!("{error}");
        return;
    }

    let products = browse(&snapshot, category, sort);
    if products.is_empty() {
        println!("No products found.");
        return;
    }
    for product in &products {
        println!("{}", product_row(product));
    }
}

/// Print one product in full.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the catalog has no such product.
#[allow(clippy::print_stdout)]
pub async fn show(state: &AppState, id: &str) -> Result<(), CliError> {
    let (_handle, snapshot) = load_catalog(state).await;
    let id = ProductId::new(id);
    let product = snapshot
        .product(&id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    println!("{}  {}", product.name, product.price);
    if !product.description.is_empty() {
        println!("{}", product.description);
    }
    println!("Category: {} / {}", product.category, product.sub_category);
    println!("Sizes:    {}", product.sizes.join(", "));
    println!("Colors:   {}", product.colors.join(", "));
    println!("Rating:   {:.1} ({} reviews)", product.rating, product.reviews);
    match product.primary_image() {
        Some(image) => println!("Image:    {image}"),
        None => println!("Image:    none"),
    }
    Ok(())
}

/// Search for `query`, or show the last search when `query` is blank.
///
/// # Errors
///
/// Returns an error if the products cannot be read or the search cannot be
/// saved.
#[allow(clippy::print_stdout)]
pub async fn search(state: &AppState, query: &str, sort: ProductSort) -> Result<(), CliError> {
    let history = state.search_history();

    if query.trim().is_empty() {
        match history.load().map_err(AppError::from)? {
            Some(last) => println!(
                "Last search: \"{}\" ({}), {} results",
                last.query,
                last.sort,
                last.results.len()
            ),
            None => println!("No previous search."),
        }
        return Ok(());
    }

    let hits = search_products(state.remote(), query, sort).await?;
    history
        .save(&LastSearch::from_hits(query, sort, &hits))
        .map_err(AppError::from)?;

    if hits.is_empty() {
        println!("No products match \"{query}\".");
    }
    for product in &hits {
        println!("{}", product_row(product));
    }
    Ok(())
}

fn product_row(product: &Product) -> String {
    match product.display_issue() {
        Some(issue) => format!("{:<24} {}", product.id, issue.message()),
        None => format!(
            "{:<24} {:<32} {:>10}",
            product.id,
            product.name,
            product.price.display()
        ),
    }
}
