//! Cart domain: snapshot types and response normalization.
//!
//! Everything the client knows about a cart comes from a server snapshot.
//! [`normalize_cart`] turns whatever body shape the server used into a
//! [`Cart`]; nothing else in the crate reads raw response JSON.

mod normalize;
mod types;

pub use normalize::{NormalizeError, normalize_cart};
pub use types::{AddToCartRequest, Cart, CartLine, ItemKey, UpdateCartItemRequest};
