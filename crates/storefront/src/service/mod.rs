//! Cart service: the server-side `/cart` resource.
//!
//! # Architecture
//!
//! - The server is the source of truth - the client keeps no cart of its own
//! - Every mutation answers with the full cart snapshot (or no body)
//! - The session cookie ties the cart to the visitor
//!
//! # Endpoints
//!
//! | method | path                   | answer            |
//! |--------|------------------------|-------------------|
//! | GET    | `/cart`                | snapshot          |
//! | POST   | `/cart/add`            | snapshot          |
//! | PUT    | `/cart/item`           | snapshot          |
//! | DELETE | `/cart/item/{itemKey}` | snapshot or 204   |
//! | DELETE | `/cart/clear`          | snapshot or 204   |
//!
//! # Example
//!
//! ```rust,ignore
//! use jewellery_storefront::service::{CartService, HttpCartClient};
//!
//! let client = HttpCartClient::new(&config.api)?;
//! let cart = client.get_cart().await?;
//! ```

mod http;

use std::future::Future;

pub use http::{HttpCartClient, REQUEST_ID_HEADER};

use crate::cart::{AddToCartRequest, Cart, ItemKey, UpdateCartItemRequest};
use crate::error::Result;

/// The network collaborator behind [`crate::controller::CartController`].
///
/// Delete-style operations return `Ok(None)` when the server answered
/// without a body; callers must then fetch the cart themselves.
pub trait CartService: Send + Sync {
    /// `GET /cart`.
    fn get_cart(&self) -> impl Future<Output = Result<Cart>> + Send;

    /// `POST /cart/add`.
    fn add_item(&self, request: &AddToCartRequest) -> impl Future<Output = Result<Cart>> + Send;

    /// `PUT /cart/item`.
    fn update_item(
        &self,
        request: &UpdateCartItemRequest,
    ) -> impl Future<Output = Result<Cart>> + Send;

    /// `DELETE /cart/item/{itemKey}`.
    fn remove_item(&self, item_key: &ItemKey) -> impl Future<Output = Result<Option<Cart>>> + Send;

    /// `DELETE /cart/clear`.
    fn clear(&self) -> impl Future<Output = Result<Option<Cart>>> + Send;
}
