//! UI event surface.
//!
//! [`CartBindings`] is created once per page with the page's add-to-cart
//! triggers. Every event goes through [`CartBindings::dispatch`], which
//! delegates to one controller method. Remove buttons are not bound per
//! render: they are found by the `data-item-key` they carry, and each key
//! gets its own busy flag.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jewellery_core::{ProductId, VariantId};
use tracing::{debug, instrument};
use url::Url;

use super::control::Control;
use crate::cart::ItemKey;
use crate::controller::{AddItem, CartController, CheckoutDecision, MISSING_INFO_MESSAGE};
use crate::error::{self, CartError};
use crate::service::CartService;

/// Default label of add-to-cart buttons.
pub const ADD_TO_CART_LABEL: &str = "ADD TO CART";

/// Label of the per-line remove buttons.
pub const REMOVE_LABEL: &str = "×";

/// Key that closes the panel.
pub const ESCAPE_KEY: &str = "Escape";

/// An add-to-cart element and the data attributes it carries.
#[derive(Debug)]
pub struct AddToCartTrigger {
    /// Element id, used to route click events.
    pub id: String,
    /// `data-product-id`
    pub product_id: Option<String>,
    /// `data-price` (display only, never sent)
    pub price: Option<String>,
    /// `data-attribute-id`
    pub attribute_id: Option<String>,
    /// `data-quantity`
    pub quantity: Option<String>,
    pub control: Control,
}

impl AddToCartTrigger {
    /// A trigger with the default label and no attributes.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            product_id: None,
            price: None,
            attribute_id: None,
            quantity: None,
            control: Control::new(ADD_TO_CART_LABEL),
        }
    }

    #[must_use]
    pub fn product_id(mut self, value: impl Into<String>) -> Self {
        self.product_id = Some(value.into());
        self
    }

    #[must_use]
    pub fn price(mut self, value: impl Into<String>) -> Self {
        self.price = Some(value.into());
        self
    }

    #[must_use]
    pub fn attribute_id(mut self, value: impl Into<String>) -> Self {
        self.attribute_id = Some(value.into());
        self
    }

    #[must_use]
    pub fn quantity(mut self, value: impl Into<String>) -> Self {
        self.quantity = Some(value.into());
        self
    }

    /// Read the trigger's attributes.
    ///
    /// The product id falls back to the `id` query parameter of the page URL
    /// (product detail pages). Both a product id and a price must be present.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` when an attribute is missing or
    /// malformed.
    pub fn to_add_item(&self, page_url: Option<&Url>) -> Result<AddItem, CartError> {
        let missing = || CartError::validation(MISSING_INFO_MESSAGE);

        let raw_product = non_blank(self.product_id.as_deref())
            .map(String::from)
            .or_else(|| page_url.and_then(product_id_from_url));
        let (Some(raw_product), Some(_price)) = (raw_product, non_blank(self.price.as_deref()))
        else {
            return Err(missing());
        };

        let product_id = raw_product.parse::<ProductId>().map_err(|_| missing())?;
        let variant_id = non_blank(self.attribute_id.as_deref())
            .map(str::parse::<VariantId>)
            .transpose()
            .map_err(|_| missing())?;
        let quantity = non_blank(self.quantity.as_deref())
            .map(|q| q.trim().parse::<u32>())
            .transpose()
            .map_err(|_| CartError::validation("Quantity must be a whole number."))?;

        Ok(AddItem {
            product_id: Some(product_id),
            variant_id,
            quantity,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn product_id_from_url(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.trim().is_empty())
}

/// Events the page delivers to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    PageLoaded,
    AddToCartClicked { trigger_id: String },
    RemoveClicked { item_key: String },
    QuantityChanged { item_key: String, quantity: u32 },
    ClearClicked,
    OpenClicked,
    CloseClicked,
    OverlayClicked,
    ToggleClicked,
    KeyDown { key: String },
    CheckoutClicked,
}

/// What a dispatched event led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The action ran to completion.
    Done,
    /// Nothing to do (unknown trigger, disabled control, irrelevant key).
    Ignored,
    /// The action failed; the message is already on screen.
    Failed(CartError),
    /// Leave the page for the given path.
    Navigate(String),
}

/// Event wiring for one page.
pub struct CartBindings<S> {
    controller: CartController<S>,
    page_url: Option<Url>,
    triggers: HashMap<String, AddToCartTrigger>,
    line_controls: Mutex<HashMap<ItemKey, Arc<Control>>>,
    clear_control: Control,
    checkout_control: Control,
}

impl<S: CartService> CartBindings<S> {
    /// Bind the page's triggers once.
    pub fn new(
        controller: CartController<S>,
        page_url: Option<Url>,
        triggers: impl IntoIterator<Item = AddToCartTrigger>,
    ) -> Self {
        let triggers: HashMap<_, _> = triggers.into_iter().map(|t| (t.id.clone(), t)).collect();
        debug!(triggers = triggers.len(), "Cart bindings initialized");
        Self {
            controller,
            page_url,
            triggers,
            line_controls: Mutex::new(HashMap::new()),
            clear_control: Control::new("Clear cart"),
            checkout_control: Control::new("Checkout"),
        }
    }

    pub const fn controller(&self) -> &CartController<S> {
        &self.controller
    }

    /// The add-to-cart trigger with the given element id.
    #[must_use]
    pub fn trigger(&self, id: &str) -> Option<&AddToCartTrigger> {
        self.triggers.get(id)
    }

    /// The remove control for a line, created on first use.
    #[must_use]
    pub fn line_control(&self, item_key: &ItemKey) -> Arc<Control> {
        Arc::clone(
            self.line_controls()
                .entry(item_key.clone())
                .or_insert_with(|| Arc::new(Control::new(REMOVE_LABEL))),
        )
    }

    #[must_use]
    pub const fn checkout_control(&self) -> &Control {
        &self.checkout_control
    }

    fn line_controls(&self) -> MutexGuard<'_, HashMap<ItemKey, Arc<Control>>> {
        self.line_controls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of per-line controls currently tracked.
    #[must_use]
    pub fn line_control_count(&self) -> usize {
        self.line_controls().len()
    }

    /// Forget controls for lines that are not in the latest snapshot.
    /// Controls with a request in flight are kept.
    fn prune_line_controls(&self) {
        let cart = self.controller.cart();
        self.line_controls().retain(|key, control| {
            control.is_disabled() || cart.as_ref().is_some_and(|c| c.line(key).is_some())
        });
    }

    /// Handle one UI event.
    ///
    /// Failures are caught here, after the controller has put the message on
    /// screen, and reported; they are returned only for inspection.
    #[instrument(skip(self))]
    pub async fn dispatch(&self, event: UiEvent) -> Outcome {
        match event {
            UiEvent::PageLoaded => {
                self.controller.fetch_and_render().await;
                Outcome::Done
            }
            UiEvent::AddToCartClicked { trigger_id } => self.add_to_cart(&trigger_id).await,
            UiEvent::RemoveClicked { item_key } => {
                let item_key = ItemKey::new(item_key);
                let control = self.line_control(&item_key);
                if control.is_disabled() {
                    return Outcome::Ignored;
                }
                let result = self.controller.remove_item(&item_key, &control).await;
                self.prune_line_controls();
                caught("remove item", result)
            }
            UiEvent::QuantityChanged { item_key, quantity } => {
                let item_key = ItemKey::new(item_key);
                let control = self.line_control(&item_key);
                if control.is_disabled() {
                    return Outcome::Ignored;
                }
                let result = self
                    .controller
                    .update_quantity(&item_key, quantity, &control)
                    .await;
                self.prune_line_controls();
                caught("update quantity", result)
            }
            UiEvent::ClearClicked => {
                if self.clear_control.is_disabled() {
                    return Outcome::Ignored;
                }
                let result = self.controller.clear(&self.clear_control).await;
                self.prune_line_controls();
                caught("clear cart", result)
            }
            UiEvent::OpenClicked => {
                self.controller.open().await;
                Outcome::Done
            }
            UiEvent::CloseClicked | UiEvent::OverlayClicked => {
                self.controller.close();
                Outcome::Done
            }
            UiEvent::ToggleClicked => {
                self.controller.toggle().await;
                Outcome::Done
            }
            UiEvent::KeyDown { key } if key == ESCAPE_KEY => {
                self.controller.close();
                Outcome::Done
            }
            UiEvent::KeyDown { .. } => Outcome::Ignored,
            UiEvent::CheckoutClicked => {
                if self.checkout_control.is_disabled() {
                    return Outcome::Ignored;
                }
                // The controller has already reported a blocked checkout.
                match self.controller.checkout(&self.checkout_control).await {
                    CheckoutDecision::Proceed(path) => Outcome::Navigate(path),
                    CheckoutDecision::Empty => Outcome::Done,
                    CheckoutDecision::Blocked(err) => Outcome::Failed(err),
                    CheckoutDecision::Busy => Outcome::Ignored,
                }
            }
        }
    }

    async fn add_to_cart(&self, trigger_id: &str) -> Outcome {
        let Some(trigger) = self.triggers.get(trigger_id) else {
            debug!(trigger_id, "Click on unknown add-to-cart trigger");
            return Outcome::Ignored;
        };
        if trigger.control.is_disabled() {
            return Outcome::Ignored;
        }

        let item = match trigger.to_add_item(self.page_url.as_ref()) {
            Ok(item) => item,
            Err(err) => {
                trigger.control.show_message(err.user_message());
                return caught("add to cart", Err(err));
            }
        };

        caught(
            "add to cart",
            self.controller.add_item(item, &trigger.control).await,
        )
    }
}

fn caught(action: &str, result: Result<(), CartError>) -> Outcome {
    match result {
        Ok(()) => Outcome::Done,
        Err(err) => {
            error::report(action, &err);
            Outcome::Failed(err)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_reads_data_attributes() {
        let trigger = AddToCartTrigger::new("btn")
            .product_id("7")
            .price("100")
            .attribute_id("3")
            .quantity("2");
        let item = trigger.to_add_item(None).unwrap();
        assert_eq!(item.product_id, Some(ProductId::new(7)));
        assert_eq!(item.variant_id, Some(VariantId::new(3)));
        assert_eq!(item.quantity, Some(2));
    }

    #[test]
    fn test_trigger_falls_back_to_page_url() {
        let url = Url::parse("http://shop.test/product.html?id=12").unwrap();
        let trigger = AddToCartTrigger::new("btn").price("100");
        let item = trigger.to_add_item(Some(&url)).unwrap();
        assert_eq!(item.product_id, Some(ProductId::new(12)));
        assert_eq!(item.quantity, None);
    }

    #[test]
    fn test_trigger_missing_price_is_rejected() {
        let trigger = AddToCartTrigger::new("btn").product_id("7");
        let err = trigger.to_add_item(None).unwrap_err();
        assert_eq!(err, CartError::validation(MISSING_INFO_MESSAGE));
    }

    #[test]
    fn test_trigger_missing_product_is_rejected() {
        let url = Url::parse("http://shop.test/catalog.html").unwrap();
        let trigger = AddToCartTrigger::new("btn").price("100");
        assert!(trigger.to_add_item(Some(&url)).is_err());
    }

    #[test]
    fn test_trigger_malformed_product_is_rejected() {
        let trigger = AddToCartTrigger::new("btn").product_id("ring").price("100");
        assert!(matches!(
            trigger.to_add_item(None),
            Err(CartError::Validation(_))
        ));
    }
}
