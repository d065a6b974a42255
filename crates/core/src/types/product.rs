//! Catalog product records.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Money;

/// A purchasable product as stored under `products/<id>`.
///
/// The document key is the product id; it is not part of the stored value
/// and is filled in by [`Product::from_document`]. Every other field is
/// optional in storage and defaults to empty/zero so that one sparse record
/// does not hide the rest of the catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Product {
    #[serde(skip_serializing)]
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    /// Comma-separated category list (e.g. `"men, shirts"`).
    pub category: String,
    pub sub_category: String,
    pub images: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub stock: i64,
    pub rating: f64,
    pub reviews: u32,
}

/// Why a product cannot be rendered as a full card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayIssue {
    /// The record has no images to show.
    NoImages,
    /// The record lacks a name or a price.
    Incomplete,
}

impl DisplayIssue {
    /// Inline message shown in place of the card.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoImages => "No images available",
            Self::Incomplete => "Product data is incomplete",
        }
    }
}

impl Product {
    /// Decode a product document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or a present field has
    /// the wrong type (e.g. a non-numeric price).
    pub fn from_document(key: &str, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut product: Self = serde_json::from_value(value)?;
        product.id = ProductId::new(key);
        Ok(product)
    }

    /// First image URL, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Check whether the record has enough data for a product card.
    #[must_use]
    pub fn display_issue(&self) -> Option<DisplayIssue> {
        if self.images.is_empty() {
            Some(DisplayIssue::NoImages)
        } else if self.name.trim().is_empty() || self.price.is_zero() {
            Some(DisplayIssue::Incomplete)
        } else {
            None
        }
    }

    /// Whether the product is listed under `selected`.
    ///
    /// The product's category field is a comma-separated list compared
    /// case-insensitively after trimming. `"all"` matches every product.
    #[must_use]
    pub fn in_category(&self, selected: &str) -> bool {
        let selected = selected.trim().to_lowercase();
        if selected == "all" {
            return true;
        }
        self.category
            .to_lowercase()
            .split(',')
            .any(|cat| cat.trim() == selected)
    }

    /// Lowercased text that search terms are matched against.
    #[must_use]
    pub fn search_text(&self) -> String {
        format!("{} {} {}", self.name, self.description, self.category).to_lowercase()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_document_assigns_key_and_defaults() {
        let product = Product::from_document(
            "p1",
            json!({ "name": "Linen Shirt", "price": 20, "images": ["a.jpg"] }),
        )
        .unwrap();

        assert_eq!(product.id.as_str(), "p1");
        assert_eq!(product.price, Money::from_cents(2000));
        assert!(product.sizes.is_empty());
        assert_eq!(product.display_issue(), None);
    }

    #[test]
    fn test_from_document_rejects_wrong_types() {
        assert!(Product::from_document("p1", json!({ "price": "cheap" })).is_err());
        assert!(Product::from_document("p1", json!("not an object")).is_err());
    }

    #[test]
    fn test_display_issue() {
        let mut product = Product {
            name: "Tee".to_string(),
            price: Money::from_cents(999),
            ..Product::default()
        };
        assert_eq!(product.display_issue(), Some(DisplayIssue::NoImages));

        product.images.push("tee.jpg".to_string());
        assert_eq!(product.display_issue(), None);

        product.price = Money::ZERO;
        assert_eq!(product.display_issue(), Some(DisplayIssue::Incomplete));
    }

    #[test]
    fn test_in_category_matches_comma_list() {
        let product = Product {
            category: "Men, Shirts ,summer".to_string(),
            ..Product::default()
        };
        assert!(product.in_category("men"));
        assert!(product.in_category(" SHIRTS "));
        assert!(product.in_category("summer"));
        assert!(product.in_category("all"));
        assert!(!product.in_category("women"));
        assert!(!product.in_category("shirt"));
    }
}
