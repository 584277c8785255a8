//! CLI command implementations.

pub mod cart;
pub mod session;

use jewellery_storefront::config::StorefrontConfig;
use jewellery_storefront::controller::CartController;
use jewellery_storefront::service::HttpCartClient;

/// Controller over the HTTP client, drawing into a mounted panel.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn controller(
    config: &StorefrontConfig,
) -> Result<CartController<HttpCartClient>, Box<dyn std::error::Error>> {
    let client = HttpCartClient::new(&config.api)?;
    tracing::debug!(cart_url = client.cart_url(), "Cart client ready");
    Ok(CartController::new(client, config.display.clone()))
}
