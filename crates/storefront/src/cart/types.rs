//! Cart snapshot types.
//!
//! A [`Cart`] is always a server snapshot. Totals are carried verbatim from
//! the response and never recomputed on the client.

use std::fmt;

use jewellery_core::{ProductId, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque identifier of a cart line, used as the removal handle.
///
/// The server derives it from product and variant (e.g. `7:0`); the client
/// never interprets it beyond passing it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Wrap a server-issued key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as sent to the server.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Key used by servers that do not send one: `{product}:{variant or 0}`.
    #[must_use]
    pub fn derived(product_id: ProductId, variant_id: Option<VariantId>) -> Self {
        let variant = variant_id.map_or(0, |v| v.as_i64());
        Self(format!("{product_id}:{variant}"))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// One entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Removal handle.
    pub item_key: ItemKey,
    /// Underlying product.
    pub product_id: ProductId,
    /// Selected attribute value; `None` is the base product.
    pub variant_id: Option<VariantId>,
    /// Display name, possibly stale relative to the catalog.
    pub product_name: String,
    /// Display image, possibly stale relative to the catalog.
    pub image_url: Option<String>,
    /// Alt text for the image.
    pub image_alt: Option<String>,
    /// Price of one unit.
    pub unit_price: Decimal,
    /// Number of units, always positive.
    pub quantity: u32,
    /// Server-computed `unit_price * quantity`.
    pub line_total: Decimal,
}

/// Server-authoritative cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    /// Lines in server order, which is also display order.
    pub lines: Vec<CartLine>,
    /// Server-computed total (discounts and tax already applied).
    pub cart_total: Decimal,
    /// Item count reported by the server, when it sends one.
    pub total_quantity: Option<u32>,
}

impl Cart {
    /// The snapshot a server returns for a cart with no lines.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of items for the cart badge.
    ///
    /// Prefers the server's count and falls back to summing line quantities,
    /// saturating at `u32::MAX`.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.total_quantity.unwrap_or_else(|| {
            self.lines
                .iter()
                .fold(0_u32, |acc, l| acc.saturating_add(l.quantity))
        })
    }

    /// Find a line by its key.
    #[must_use]
    pub fn line(&self, item_key: &ItemKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.item_key == item_key)
    }
}

/// Body of `POST /cart/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    /// Serialized as `null` for the base product.
    pub attribute_value_id: Option<VariantId>,
    pub quantity: u32,
}

/// Body of `PUT /cart/item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    pub item_key: ItemKey,
    pub quantity: u32,
}
