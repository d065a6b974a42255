//! Cart line items as persisted in client storage.

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// One line of the locally persisted cart.
///
/// Serialized as `{"productId", "quantity", "size", "color"}` inside the JSON
/// array stored under the cart key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: String,
    pub color: String,
}

impl CartLineItem {
    /// Create a cart line.
    #[must_use]
    pub fn new(
        product_id: impl Into<ProductId>,
        quantity: u32,
        size: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            size: size.into(),
            color: color.into(),
        }
    }

    /// The identity of this line within a cart.
    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey {
            product_id: self.product_id.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    /// Whether this line has the given identity.
    #[must_use]
    pub fn has_key(&self, key: &CartKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.color == key.color
    }
}

/// Identity of a cart line: no two lines in a cart share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
}

impl CartKey {
    /// Create a cart key.
    #[must_use]
    pub fn new(
        product_id: impl Into<ProductId>,
        size: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            size: size.into(),
            color: color.into(),
        }
    }
}

impl std::fmt::Display for CartKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} / {})", self.product_id, self.size, self.color)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_camel_case() {
        let item = CartLineItem::new("p1", 2, "M", "Red");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "productId": "p1", "quantity": 2, "size": "M", "color": "Red" })
        );
    }

    #[test]
    fn test_key_ignores_quantity() {
        let a = CartLineItem::new("p1", 1, "M", "Red");
        let b = CartLineItem::new("p1", 5, "M", "Red");
        assert_eq!(a.key(), b.key());
        assert!(b.has_key(&CartKey::new("p1", "M", "Red")));
        assert!(!b.has_key(&CartKey::new("p1", "L", "Red")));
    }
}
