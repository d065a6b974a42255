//! Category filtering and sorting for product listings.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use drape_core::Product;
use serde::{Deserialize, Serialize};

use super::CatalogSnapshot;

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    /// Catalog order.
    #[default]
    Featured,
    /// Cheapest first.
    PriceLow,
    /// Most expensive first.
    PriceHigh,
    /// Best rated first.
    Rating,
}

impl ProductSort {
    /// Wire and CLI representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Rating => "rating",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Featured => Ordering::Equal,
            Self::PriceLow => a.price.cmp(&b.price),
            Self::PriceHigh => b.price.cmp(&a.price),
            Self::Rating => b.rating.total_cmp(&a.rating),
        }
    }
}

impl fmt::Display for ProductSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "featured" => Ok(Self::Featured),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "rating" => Ok(Self::Rating),
            other => Err(format!(
                "unknown sort '{other}' (expected featured, price-low, price-high or rating)"
            )),
        }
    }
}

/// Sort `products` in place. Ties keep their catalog order.
pub fn sort_products(products: &mut [Product], sort: ProductSort) {
    products.sort_by(|a, b| sort.compare(a, b));
}

/// Products of `snapshot` listed under `category`, in `sort` order.
#[must_use]
pub fn browse(snapshot: &CatalogSnapshot, category: &str, sort: ProductSort) -> Vec<Product> {
    let mut products: Vec<Product> = snapshot
        .products()
        .iter()
        .filter(|p| p.in_category(category))
        .cloned()
        .collect();
    sort_products(&mut products, sort);
    products
}
