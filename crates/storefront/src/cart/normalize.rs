//! Cart response normalization.
//!
//! Cart servers across backend revisions disagree on field names
//! (`items` vs `lines`, `totalPrice` vs `lineTotal`, ...). Every response
//! body goes through [`normalize_cart`], which is the only place that knows
//! about those aliases. For each field the keys below are tried in order and
//! the first one that is present and not `null` wins.
//!
//! | field          | keys                                    |
//! |----------------|-----------------------------------------|
//! | lines          | `items`, `lines`, `cartItems`           |
//! | cart total     | `cartTotal`, `total`, `totalPrice`      |
//! | total quantity | `totalQuantity`, `itemCount`            |
//! | item key       | `itemKey`, `key` (else `{product}:{variant or 0}`) |
//! | product id     | `productId`, `product.id`               |
//! | variant id     | `attributeValueId`, `variantId`         |
//! | name           | `productName`, `name`, `product.name`   |
//! | image          | `imageUrl`, `image`, `url`              |
//! | image alt      | `imageAlt`                              |
//! | unit price     | `unitPrice`, `price`                    |
//! | line total     | `totalPrice`, `lineTotal`               |
//! | quantity       | `quantity`, `qty`                       |
//!
//! A bare top-level array is treated as the line list. Amounts may be JSON
//! numbers or numeric strings. Totals are never computed here: a non-empty
//! cart without a total, or a line without a line total, is rejected.

use std::str::FromStr;

use jewellery_core::{ProductId, VariantId};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{Cart, CartLine, ItemKey};

const LINES_KEYS: &[&str] = &["items", "lines", "cartItems"];
const CART_TOTAL_KEYS: &[&str] = &["cartTotal", "total", "totalPrice"];
const TOTAL_QUANTITY_KEYS: &[&str] = &["totalQuantity", "itemCount"];
const ITEM_KEY_KEYS: &[&str] = &["itemKey", "key"];
const PRODUCT_ID_KEYS: &[&str] = &["productId", "product.id"];
const VARIANT_ID_KEYS: &[&str] = &["attributeValueId", "variantId"];
const NAME_KEYS: &[&str] = &["productName", "name", "product.name"];
const IMAGE_KEYS: &[&str] = &["imageUrl", "image", "url"];
const IMAGE_ALT_KEYS: &[&str] = &["imageAlt"];
const UNIT_PRICE_KEYS: &[&str] = &["unitPrice", "price"];
const LINE_TOTAL_KEYS: &[&str] = &["totalPrice", "lineTotal"];
const QUANTITY_KEYS: &[&str] = &["quantity", "qty"];

/// Reasons a response body could not be read as a cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The body is neither an object nor an array.
    #[error("cart response is not an object or array")]
    NotACart,

    /// The line list is present but not an array.
    #[error("cart lines are not an array")]
    LinesNotArray,

    /// A line lacks a required field.
    #[error("cart line {index} is missing {field}")]
    MissingField { index: usize, field: &'static str },

    /// A line field has the wrong type or an out-of-range value.
    #[error("cart line {index} has an invalid {field}")]
    InvalidField { index: usize, field: &'static str },

    /// The cart has lines but no total.
    #[error("cart total missing from a non-empty cart")]
    MissingTotal,

    /// The total is present but not a non-negative amount.
    #[error("cart total is not a valid amount")]
    InvalidTotal,
}

/// Convert a cart response body into a [`Cart`].
///
/// `null` is an empty cart, matching servers that answer an empty session
/// with no cart object at all.
///
/// # Errors
///
/// Returns [`NormalizeError`] when the body does not describe a cart.
pub fn normalize_cart(value: &Value) -> Result<Cart, NormalizeError> {
    let (lines_value, root) = match value {
        Value::Null => return Ok(Cart::empty()),
        Value::Array(_) => (Some(value), None),
        Value::Object(map) => (lookup(map, LINES_KEYS), Some(map)),
        _ => return Err(NormalizeError::NotACart),
    };

    let lines = match lines_value {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| normalize_line(index, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(NormalizeError::LinesNotArray),
    };

    let cart_total = match root.and_then(|map| lookup(map, CART_TOTAL_KEYS)) {
        Some(total) => decimal(total)
            .filter(|d| !d.is_sign_negative())
            .ok_or(NormalizeError::InvalidTotal)?,
        None if lines.is_empty() => Decimal::ZERO,
        None => return Err(NormalizeError::MissingTotal),
    };

    let total_quantity = root
        .and_then(|map| lookup(map, TOTAL_QUANTITY_KEYS))
        .and_then(integer)
        .and_then(|n| u32::try_from(n).ok());

    Ok(Cart {
        lines,
        cart_total,
        total_quantity,
    })
}

fn normalize_line(index: usize, item: &Value) -> Result<CartLine, NormalizeError> {
    let Value::Object(map) = item else {
        return Err(NormalizeError::InvalidField {
            index,
            field: "line",
        });
    };

    let required = |keys: &'static [&'static str], field: &'static str| {
        lookup(map, keys).ok_or(NormalizeError::MissingField { index, field })
    };
    let invalid = |field: &'static str| NormalizeError::InvalidField { index, field };

    let product_id = integer(required(PRODUCT_ID_KEYS, "productId")?)
        .map(ProductId::new)
        .ok_or_else(|| invalid("productId"))?;

    let variant_id = match lookup(map, VARIANT_ID_KEYS) {
        None => None,
        Some(v) => match integer(v).ok_or_else(|| invalid("attributeValueId"))? {
            0 => None,
            id => Some(VariantId::new(id)),
        },
    };

    let item_key = match lookup(map, ITEM_KEY_KEYS) {
        Some(Value::String(key)) if !key.trim().is_empty() => ItemKey::new(key.as_str()),
        Some(Value::Number(key)) => ItemKey::new(key.to_string()),
        Some(_) => return Err(invalid("itemKey")),
        None => ItemKey::derived(product_id, variant_id),
    };

    let product_name = lookup(map, NAME_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| format!("Product {product_id}"), String::from);

    let image_url = non_empty_str(lookup(map, IMAGE_KEYS));
    let image_alt = non_empty_str(lookup(map, IMAGE_ALT_KEYS));

    let unit_price = decimal(required(UNIT_PRICE_KEYS, "unitPrice")?)
        .filter(|d| !d.is_sign_negative())
        .ok_or_else(|| invalid("unitPrice"))?;

    let line_total = decimal(required(LINE_TOTAL_KEYS, "lineTotal")?)
        .filter(|d| !d.is_sign_negative())
        .ok_or_else(|| invalid("lineTotal"))?;

    let quantity = integer(required(QUANTITY_KEYS, "quantity")?)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|&n| n > 0)
        .ok_or_else(|| invalid("quantity"))?;

    Ok(CartLine {
        item_key,
        product_id,
        variant_id,
        product_name,
        image_url,
        image_alt,
        unit_price,
        quantity,
        line_total,
    })
}

/// First non-null value among `keys`. A key containing `.` walks into a
/// nested object (`product.id`).
fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| {
        let mut parts = key.split('.');
        let first = map.get(parts.next()?)?;
        parts
            .try_fold(first, |current, part| current.get(part))
            .filter(|v| !v.is_null())
    })
}

fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
