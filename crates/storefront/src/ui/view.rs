//! Cart rendering.
//!
//! [`render`] is a pure function from a [`Cart`] snapshot to panel markup.
//! Prices are formatted from the snapshot's own values; nothing is summed or
//! multiplied here.

use askama::Template;
use jewellery_core::Price;

use crate::cart::{Cart, CartLine};
use crate::config::DisplayConfig;

/// Placeholder text for a cart with no lines.
pub const EMPTY_CART_MESSAGE: &str = "Your cart is empty";

/// Placeholder text when the cart could not be fetched.
pub const LOAD_FAILED_MESSAGE: &str = "Could not load cart.";

/// Cart line display data for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    pub item_key: String,
    pub name: String,
    pub image_url: String,
    pub image_alt: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl CartLineView {
    fn new(line: &CartLine, display: &DisplayConfig) -> Self {
        Self {
            item_key: line.item_key.to_string(),
            name: line.product_name.clone(),
            image_url: line
                .image_url
                .clone()
                .unwrap_or_else(|| display.placeholder_image.clone()),
            image_alt: line
                .image_alt
                .clone()
                .unwrap_or_else(|| line.product_name.clone()),
            quantity: line.quantity,
            unit_price: Price::new(line.unit_price, display.currency).display(),
            line_total: Price::new(line.line_total, display.currency).display(),
        }
    }

    /// Plain-text form of the row: `Ring — LKR 100.00 × 1 = LKR 100.00`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} — {} × {} = {}",
            self.name, self.unit_price, self.quantity, self.line_total
        )
    }
}

/// Cart display data for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    /// Formatted `cart_total`, e.g. `LKR 100.00`.
    pub total: String,
    pub item_count: u32,
    /// Shown instead of rows when `items` is empty.
    pub empty_message: &'static str,
}

impl CartView {
    /// Build the view for a server snapshot.
    #[must_use]
    pub fn new(cart: &Cart, display: &DisplayConfig) -> Self {
        Self {
            items: cart
                .lines
                .iter()
                .map(|line| CartLineView::new(line, display))
                .collect(),
            total: Price::new(cart.cart_total, display.currency).display(),
            item_count: cart.item_count(),
            empty_message: EMPTY_CART_MESSAGE,
        }
    }

    /// The placeholder shown when fetching the cart failed.
    #[must_use]
    pub fn load_failed(display: &DisplayConfig) -> Self {
        Self {
            items: Vec::new(),
            total: Price::zero(display.currency).display(),
            item_count: 0,
            empty_message: LOAD_FAILED_MESSAGE,
        }
    }

    /// Text for the total line: `Total: LKR 100.00`.
    #[must_use]
    pub fn total_text(&self) -> String {
        format!("Total: {}", self.total)
    }
}

/// Cart items fragment template.
#[derive(Template)]
#[template(path = "partials/cart_items.html")]
struct CartItemsTemplate<'a> {
    cart: &'a CartView,
}

/// Cart count badge fragment template.
#[derive(Template)]
#[template(path = "partials/cart_count.html")]
struct CartCountTemplate {
    count: u32,
}

/// Markup for every cart surface on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCart {
    pub view: CartView,
    /// Contents of the cart items container.
    pub items_html: String,
    /// Text of the total element.
    pub total_text: String,
    /// Cart badge markup.
    pub count_html: String,
}

impl RenderedCart {
    /// Render a view into markup.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to render.
    pub fn from_view(view: CartView) -> askama::Result<Self> {
        let items_html = CartItemsTemplate { cart: &view }.render()?;
        let count_html = CartCountTemplate {
            count: view.item_count,
        }
        .render()?;
        Ok(Self {
            total_text: view.total_text(),
            items_html,
            count_html,
            view,
        })
    }
}

/// Render a cart snapshot.
///
/// # Errors
///
/// Returns an error if a template fails to render.
pub fn render(cart: &Cart, display: &DisplayConfig) -> askama::Result<RenderedCart> {
    RenderedCart::from_view(CartView::new(cart, display))
}
