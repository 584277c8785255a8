//! Cart controller.
//!
//! Mediates between user actions and the [`CartService`], keeping the cart
//! panel consistent with server state:
//!
//! - Every mutation is a round trip; the panel only ever shows the snapshot
//!   the server returned. There are no optimistic local merges.
//! - Failures are caught at the action that caused them and left on the
//!   triggering control (and the panel's message line) as text the user can
//!   act on. Nothing is retried automatically.
//! - Each control carries its own busy flag. Requests from different controls
//!   are not ordered against each other: whichever response arrives last wins
//!   the render until the next fetch.

use std::sync::{Mutex, MutexGuard, PoisonError};

use jewellery_core::{ProductId, VariantId};
use tracing::{debug, instrument};

use crate::cart::{AddToCartRequest, Cart, ItemKey, UpdateCartItemRequest};
use crate::config::DisplayConfig;
use crate::error::{self, CartError, Result};
use crate::service::CartService;
use crate::ui::control::Control;
use crate::ui::panel::CartPanel;
use crate::ui::view::{self, CartView, RenderedCart};

/// Shown when an add-to-cart trigger lacks a product.
pub const MISSING_INFO_MESSAGE: &str = "Could not add item to cart (missing info).";

/// Shown when checkout finds nothing to buy.
pub const EMPTY_CHECKOUT_MESSAGE: &str = "Your cart is empty.";

/// Shown when checkout cannot confirm the cart.
pub const CHECKOUT_UNVERIFIED_MESSAGE: &str = "Could not verify cart status. Please try again.";

/// Label of an add-to-cart control while its request is in flight.
pub const ADDING_LABEL: &str = "Adding...";

/// Label of a remove, update or clear control while its request is in flight.
pub const UPDATING_LABEL: &str = "Updating...";

/// Input to [`CartController::add_item`], as collected from the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddItem {
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    /// Defaults to 1.
    pub quantity: Option<u32>,
}

impl AddItem {
    /// One unit of the base product.
    #[must_use]
    pub const fn product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            variant_id: None,
            quantity: None,
        }
    }

    #[must_use]
    pub const fn variant(mut self, variant_id: VariantId) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    #[must_use]
    pub const fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Build the request body.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` when the product is missing or the
    /// quantity is zero.
    pub fn validate(&self) -> Result<AddToCartRequest> {
        let product_id = self
            .product_id
            .ok_or_else(|| CartError::validation(MISSING_INFO_MESSAGE))?;
        let quantity = self.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(CartError::validation("Quantity must be at least 1."));
        }
        Ok(AddToCartRequest {
            product_id,
            attribute_value_id: self.variant_id,
            quantity,
        })
    }
}

/// Result of [`CartController::checkout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutDecision {
    /// The cart has lines; navigate to the contained path.
    Proceed(String),
    /// The cart is empty; stay on the page.
    Empty,
    /// The cart could not be fetched; stay on the page.
    Blocked(CartError),
    /// The checkout control already has a request in flight.
    Busy,
}

struct ControllerState {
    /// Latest server snapshot. `None` until the first successful response.
    cart: Option<Cart>,
    panel: CartPanel,
}

/// Owns the page's cart state and its panel.
///
/// One controller is created per page and shared by reference with the
/// event bindings.
pub struct CartController<S> {
    service: S,
    display: DisplayConfig,
    state: Mutex<ControllerState>,
}

impl<S: CartService> CartController<S> {
    /// Create a controller drawing into a mounted panel.
    pub fn new(service: S, display: DisplayConfig) -> Self {
        Self::with_panel(service, display, CartPanel::mounted())
    }

    /// Create a controller with an explicit panel (e.g. unmounted pages).
    pub const fn with_panel(service: S, display: DisplayConfig, panel: CartPanel) -> Self {
        Self {
            service,
            display,
            state: Mutex::new(ControllerState { cart: None, panel }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub const fn service(&self) -> &S {
        &self.service
    }

    pub const fn display(&self) -> &DisplayConfig {
        &self.display
    }

    /// Latest server snapshot.
    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.lock().cart.clone()
    }

    /// Copy of the panel as currently drawn.
    #[must_use]
    pub fn panel(&self) -> CartPanel {
        self.lock().panel.clone()
    }

    /// Badge count from the latest snapshot.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lock().cart.as_ref().map_or(0, Cart::item_count)
    }

    /// Render a snapshot without touching controller state.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to render.
    pub fn render(&self, cart: &Cart) -> askama::Result<RenderedCart> {
        view::render(cart, &self.display)
    }

    fn epoch(&self) -> u64 {
        self.lock().panel.close_epoch()
    }

    /// Store a snapshot and draw it if the panel still wants it.
    fn apply(&self, cart: Cart, epoch: u64) {
        let rendered = match self.render(&cart) {
            Ok(rendered) => Some(rendered),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render cart");
                None
            }
        };

        let mut state = self.lock();
        state.cart = Some(cart);
        match rendered {
            Some(rendered) => {
                if !state.panel.draw(rendered, epoch) {
                    debug!("Cart snapshot stored without drawing");
                }
            }
            None => state.panel.set_message(view::LOAD_FAILED_MESSAGE),
        }
    }

    fn show_message(&self, message: &str) {
        self.lock().panel.set_message(message);
    }

    /// Fetch the cart and draw it.
    ///
    /// Never fails: on error the panel shows the "could not load" placeholder
    /// with a zero total. The next open or page load tries again.
    #[instrument(skip(self))]
    pub async fn fetch_and_render(&self) {
        let epoch = self.epoch();
        match self.service.get_cart().await {
            Ok(cart) => {
                debug!(lines = cart.lines.len(), "Fetched cart");
                self.apply(cart, epoch);
            }
            Err(err) => {
                error::report("fetch cart", &err);
                let placeholder = RenderedCart::from_view(CartView::load_failed(&self.display))
                    .inspect_err(|e| tracing::error!(error = %e, "Failed to render cart placeholder"))
                    .ok();

                // The last snapshot is no longer known to be current.
                let mut state = self.lock();
                state.cart = None;
                if let Some(placeholder) = placeholder {
                    state.panel.draw(placeholder, epoch);
                }
            }
        }
    }

    /// Add a product to the cart.
    ///
    /// Validation happens before anything is sent. While the request is in
    /// flight `control` is disabled and labelled "Adding..."; a click on a
    /// disabled control is ignored. On failure the displayed cart is left
    /// untouched and the control is re-enabled with its original label and
    /// the error message.
    ///
    /// # Errors
    ///
    /// Returns the caught error after it has been surfaced on `control`.
    #[instrument(skip(self, control))]
    pub async fn add_item(&self, item: AddItem, control: &Control) -> Result<()> {
        let request = item.validate().inspect_err(|err| {
            control.show_message(err.user_message());
        })?;

        let Some(guard) = control.try_begin(ADDING_LABEL) else {
            debug!("Add to cart already in flight for this control");
            return Ok(());
        };

        let epoch = self.epoch();
        match self.service.add_item(&request).await {
            Ok(cart) => {
                self.apply(cart, epoch);
                guard.succeed();
                let product_id = request.product_id.to_string();
                error::add_breadcrumb(
                    "cart",
                    "Added item to cart",
                    Some(&[("product_id", product_id.as_str())]),
                );
                Ok(())
            }
            Err(err) => {
                guard.fail(err.user_message());
                Err(err)
            }
        }
    }

    /// Remove a line.
    ///
    /// Draws the returned snapshot, or issues exactly one follow-up fetch
    /// when the server answered without a body.
    ///
    /// # Errors
    ///
    /// Returns the caught error after it has been surfaced on `control` and
    /// the panel's message line.
    #[instrument(skip(self, control), fields(item_key = %item_key))]
    pub async fn remove_item(&self, item_key: &ItemKey, control: &Control) -> Result<()> {
        if item_key.is_blank() {
            let err = CartError::validation("Cart line is missing its key.");
            control.show_message(err.user_message());
            return Err(err);
        }

        let Some(guard) = control.try_begin(UPDATING_LABEL) else {
            debug!("Remove already in flight for this line");
            return Ok(());
        };

        let epoch = self.epoch();
        match self.service.remove_item(item_key).await {
            Ok(snapshot) => {
                self.apply_or_refetch(snapshot, epoch).await;
                guard.succeed();
                Ok(())
            }
            Err(err) => {
                self.show_message(err.user_message());
                guard.fail(err.user_message());
                Err(err)
            }
        }
    }

    /// Change a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns the caught error after it has been surfaced on `control` and
    /// the panel's message line.
    #[instrument(skip(self, control), fields(item_key = %item_key))]
    pub async fn update_quantity(
        &self,
        item_key: &ItemKey,
        quantity: u32,
        control: &Control,
    ) -> Result<()> {
        let validation = if item_key.is_blank() {
            Some(CartError::validation("Cart line is missing its key."))
        } else if quantity == 0 {
            Some(CartError::validation("Quantity must be at least 1."))
        } else {
            None
        };
        if let Some(err) = validation {
            control.show_message(err.user_message());
            return Err(err);
        }

        let Some(guard) = control.try_begin(UPDATING_LABEL) else {
            debug!("Quantity update already in flight for this line");
            return Ok(());
        };

        let request = UpdateCartItemRequest {
            item_key: item_key.clone(),
            quantity,
        };
        let epoch = self.epoch();
        match self.service.update_item(&request).await {
            Ok(cart) => {
                self.apply(cart, epoch);
                guard.succeed();
                Ok(())
            }
            Err(err) => {
                self.show_message(err.user_message());
                guard.fail(err.user_message());
                Err(err)
            }
        }
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns the caught error after it has been surfaced on `control` and
    /// the panel's message line.
    #[instrument(skip(self, control))]
    pub async fn clear(&self, control: &Control) -> Result<()> {
        let Some(guard) = control.try_begin(UPDATING_LABEL) else {
            debug!("Clear already in flight");
            return Ok(());
        };

        let epoch = self.epoch();
        match self.service.clear().await {
            Ok(snapshot) => {
                self.apply_or_refetch(snapshot, epoch).await;
                guard.succeed();
                error::add_breadcrumb("cart", "Cleared cart", None);
                Ok(())
            }
            Err(err) => {
                self.show_message(err.user_message());
                guard.fail(err.user_message());
                Err(err)
            }
        }
    }

    async fn apply_or_refetch(&self, snapshot: Option<Cart>, epoch: u64) {
        match snapshot {
            Some(cart) => self.apply(cart, epoch),
            None => {
                debug!("No snapshot in response, refetching cart");
                self.fetch_and_render().await;
            }
        }
    }

    /// `Closed -> Open`, then refetch so the panel is never stale.
    #[instrument(skip(self))]
    pub async fn open(&self) {
        if self.lock().panel.open() {
            debug!("Cart panel opened");
        }
        self.fetch_and_render().await;
    }

    /// `Open -> Closed`. Pending requests keep running but their responses
    /// are no longer drawn.
    pub fn close(&self) {
        if self.lock().panel.close() {
            debug!("Cart panel closed");
        }
    }

    /// Flip the panel.
    pub async fn toggle(&self) {
        let is_open = self.lock().panel.is_open();
        if is_open {
            self.close();
        } else {
            self.open().await;
        }
    }

    /// Confirm the cart has lines before leaving for checkout.
    #[instrument(skip(self, control))]
    pub async fn checkout(&self, control: &Control) -> CheckoutDecision {
        let Some(guard) = control.try_begin(UPDATING_LABEL) else {
            return CheckoutDecision::Busy;
        };

        let epoch = self.epoch();
        match self.service.get_cart().await {
            Ok(cart) if cart.is_empty() => {
                self.apply(cart, epoch);
                guard.fail(EMPTY_CHECKOUT_MESSAGE);
                self.close();
                CheckoutDecision::Empty
            }
            Ok(cart) => {
                self.apply(cart, epoch);
                guard.succeed();
                CheckoutDecision::Proceed(self.display.checkout_path.clone())
            }
            Err(err) => {
                error::report("checkout", &err);
                self.show_message(CHECKOUT_UNVERIFIED_MESSAGE);
                guard.fail(CHECKOUT_UNVERIFIED_MESSAGE);
                CheckoutDecision::Blocked(err)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal::Decimal;
    use tokio::sync::Notify;

    use super::*;
    use crate::cart::CartLine;
    use crate::ui::panel::PanelState;

    /// Scripted cart service: each call pops the next canned answer.
    #[derive(Default)]
    struct FakeService {
        get: Mutex<VecDeque<Result<Cart>>>,
        add: Mutex<VecDeque<Result<Cart>>>,
        update: Mutex<VecDeque<Result<Cart>>>,
        remove: Mutex<VecDeque<Result<Option<Cart>>>>,
        clear: Mutex<VecDeque<Result<Option<Cart>>>>,
        get_calls: AtomicUsize,
        add_calls: AtomicUsize,
        last_add: Mutex<Option<AddToCartRequest>>,
        /// When set, `add_item` signals `started` and waits for `release`.
        add_gate: Option<Gate>,
    }

    #[derive(Default)]
    struct Gate {
        started: Notify,
        release: Notify,
    }

    fn pop<T>(queue: &Mutex<VecDeque<Result<T>>>) -> Result<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CartError::Network("no scripted answer".to_string())))
    }

    impl CartService for FakeService {
        async fn get_cart(&self) -> Result<Cart> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            pop(&self.get)
        }

        async fn add_item(&self, request: &AddToCartRequest) -> Result<Cart> {
            self.add_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_add.lock().unwrap() = Some(request.clone());
            match &self.add_gate {
                Some(gate) => {
                    gate.started.notify_one();
                    gate.release.notified().await;
                }
                None => tokio::task::yield_now().await,
            }
            pop(&self.add)
        }

        async fn update_item(&self, _request: &UpdateCartItemRequest) -> Result<Cart> {
            pop(&self.update)
        }

        async fn remove_item(&self, _item_key: &ItemKey) -> Result<Option<Cart>> {
            pop(&self.remove)
        }

        async fn clear(&self) -> Result<Option<Cart>> {
            pop(&self.clear)
        }
    }

    fn ring_cart() -> Cart {
        Cart {
            lines: vec![CartLine {
                item_key: ItemKey::new("7:0"),
                product_id: ProductId::new(7),
                variant_id: None,
                product_name: "Ring".to_string(),
                image_url: None,
                image_alt: None,
                unit_price: Decimal::from(100),
                quantity: 1,
                line_total: Decimal::from(100),
            }],
            cart_total: Decimal::from(100),
            total_quantity: Some(1),
        }
    }

    fn controller(service: FakeService) -> CartController<FakeService> {
        CartController::new(service, DisplayConfig::default())
    }

    fn script<T>(queue: &Mutex<VecDeque<Result<T>>>, answers: Vec<Result<T>>) {
        queue.lock().unwrap().extend(answers);
    }

    #[tokio::test]
    async fn test_initial_fetch_shows_empty_cart() {
        let service = FakeService::default();
        script(&service.get, vec![Ok(Cart::empty())]);
        let controller = controller(service);

        controller.fetch_and_render().await;

        let panel = controller.panel();
        assert!(panel.items_html().contains("Your cart is empty"));
        assert_eq!(panel.total_text(), "Total: LKR 0.00");
    }

    #[tokio::test]
    async fn test_fetch_failure_shows_placeholder_without_error() {
        let service = FakeService::default();
        script(&service.get, vec![Err(CartError::server(500, None))]);
        let controller = controller(service);

        controller.fetch_and_render().await;

        let panel = controller.panel();
        assert!(panel.items_html().contains("Could not load cart."));
        assert_eq!(panel.total_text(), "Total: LKR 0.00");
        assert_eq!(controller.cart(), None);
    }

    #[tokio::test]
    async fn test_add_item_renders_server_snapshot() {
        let service = FakeService::default();
        script(&service.add, vec![Ok(ring_cart())]);
        let controller = controller(service);
        let control = Control::new("ADD TO CART");

        controller
            .add_item(AddItem::product(ProductId::new(7)), &control)
            .await
            .unwrap();

        let sent = controller.service().last_add.lock().unwrap().clone().unwrap();
        assert_eq!(sent.quantity, 1);
        assert_eq!(sent.attribute_value_id, None);

        let panel = controller.panel();
        let view = &panel.rendered().unwrap().view;
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].summary(), "Ring — LKR 100.00 × 1 = LKR 100.00");
        assert_eq!(panel.total_text(), "Total: LKR 100.00");
        assert_eq!(control.label(), "ADD TO CART");
        assert!(!control.is_disabled());
        assert_eq!(controller.item_count(), 1);
    }

    #[tokio::test]
    async fn test_add_item_without_product_never_calls_service() {
        let controller = controller(FakeService::default());
        let control = Control::new("ADD TO CART");

        let err = controller
            .add_item(AddItem::default(), &control)
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::Validation(_)));
        assert_eq!(controller.service().add_calls.load(Ordering::SeqCst), 0);
        assert_eq!(control.message().as_deref(), Some(MISSING_INFO_MESSAGE));
        assert!(!control.is_disabled());
    }

    #[tokio::test]
    async fn test_add_item_zero_quantity_is_rejected() {
        let controller = controller(FakeService::default());
        let control = Control::new("ADD TO CART");

        let err = controller
            .add_item(AddItem::product(ProductId::new(7)).quantity(0), &control)
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::Validation(_)));
        assert_eq!(controller.service().add_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_cart_unchanged() {
        let service = FakeService::default();
        script(&service.get, vec![Ok(ring_cart())]);
        script(
            &service.add,
            vec![Err(CartError::server(500, Some("Out of stock".to_string())))],
        );
        let controller = controller(service);
        controller.fetch_and_render().await;
        let before = controller.panel().items_html().to_string();

        let control = Control::new("ADD TO CART");
        let err = controller
            .add_item(AddItem::product(ProductId::new(8)), &control)
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::Server { status: 500, .. }));
        assert_eq!(controller.panel().items_html(), before);
        assert_eq!(controller.cart(), Some(ring_cart()));
        assert_eq!(control.label(), "ADD TO CART");
        assert!(!control.is_disabled());
        assert_eq!(control.message().as_deref(), Some("Out of stock"));
    }

    #[tokio::test]
    async fn test_double_click_sends_one_request() {
        let service = FakeService::default();
        script(&service.add, vec![Ok(ring_cart()), Ok(ring_cart())]);
        let controller = controller(service);
        let control = Control::new("ADD TO CART");
        let item = AddItem::product(ProductId::new(7));

        let (first, second) = tokio::join!(
            controller.add_item(item, &control),
            controller.add_item(item, &control)
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(controller.service().add_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remove_without_body_refetches_once() {
        let service = FakeService::default();
        script(&service.get, vec![Ok(ring_cart()), Ok(Cart::empty())]);
        script(&service.remove, vec![Ok(None)]);
        let controller = controller(service);
        controller.fetch_and_render().await;

        let control = Control::new("×");
        controller
            .remove_item(&ItemKey::new("7:0"), &control)
            .await
            .unwrap();

        assert_eq!(controller.service().get_calls.load(Ordering::SeqCst), 2);
        assert!(controller.panel().items_html().contains("Your cart is empty"));
    }

    #[tokio::test]
    async fn test_remove_with_body_does_not_refetch() {
        let service = FakeService::default();
        script(&service.remove, vec![Ok(Some(Cart::empty()))]);
        let controller = controller(service);

        controller
            .remove_item(&ItemKey::new("7:0"), &Control::new("×"))
            .await
            .unwrap();

        assert_eq!(controller.service().get_calls.load(Ordering::SeqCst), 0);
        assert!(controller.panel().items_html().contains("Your cart is empty"));
    }

    #[tokio::test]
    async fn test_remove_blank_key_is_rejected() {
        let controller = controller(FakeService::default());
        let err = controller
            .remove_item(&ItemKey::new(""), &Control::new("×"))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_failure_sets_panel_message() {
        let service = FakeService::default();
        script(
            &service.remove,
            vec![Err(CartError::Network("timed out".to_string()))],
        );
        let controller = controller(service);

        let control = Control::new("×");
        let err = controller
            .remove_item(&ItemKey::new("7:0"), &control)
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::Network(_)));
        assert_eq!(
            controller.panel().message(),
            Some(crate::error::NETWORK_FAILURE_MESSAGE)
        );
        assert!(!control.is_disabled());
    }

    #[tokio::test]
    async fn test_update_quantity_renders_snapshot() {
        let mut two_rings = ring_cart();
        two_rings.lines[0].quantity = 2;
        two_rings.lines[0].line_total = Decimal::from(200);
        two_rings.cart_total = Decimal::from(200);

        let service = FakeService::default();
        script(&service.update, vec![Ok(two_rings)]);
        let controller = controller(service);

        controller
            .update_quantity(&ItemKey::new("7:0"), 2, &Control::new("+"))
            .await
            .unwrap();

        assert_eq!(controller.panel().total_text(), "Total: LKR 200.00");
    }

    #[tokio::test]
    async fn test_update_quantity_zero_is_rejected() {
        let controller = controller(FakeService::default());
        let err = controller
            .update_quantity(&ItemKey::new("7:0"), 0, &Control::new("-"))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
    }

    #[tokio::test]
    async fn test_clear_without_body_refetches() {
        let service = FakeService::default();
        script(&service.clear, vec![Ok(None)]);
        script(&service.get, vec![Ok(Cart::empty())]);
        let controller = controller(service);

        controller.clear(&Control::new("Clear")).await.unwrap();

        assert_eq!(controller.service().get_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.cart(), Some(Cart::empty()));
    }

    #[tokio::test]
    async fn test_open_refetches_and_close_hides() {
        let service = FakeService::default();
        script(&service.get, vec![Ok(ring_cart())]);
        let controller = controller(service);

        controller.open().await;
        assert_eq!(controller.panel().state(), PanelState::Open);
        assert_eq!(controller.service().get_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.panel().total_text(), "Total: LKR 100.00");

        controller.close();
        assert_eq!(controller.panel().state(), PanelState::Closed);
    }

    #[tokio::test]
    async fn test_toggle() {
        let service = FakeService::default();
        script(&service.get, vec![Ok(Cart::empty())]);
        let controller = controller(service);

        controller.toggle().await;
        assert!(controller.panel().is_open());
        controller.toggle().await;
        assert!(!controller.panel().is_open());
        assert_eq!(controller.service().get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_response_after_close_is_stored_but_not_drawn() {
        let service = FakeService {
            add_gate: Some(Gate::default()),
            ..FakeService::default()
        };
        script(&service.add, vec![Ok(ring_cart())]);
        let controller = controller(service);
        let control = Control::new("ADD TO CART");

        let add = controller.add_item(AddItem::product(ProductId::new(7)), &control);
        let close = async {
            let gate = controller.service().add_gate.as_ref().unwrap();
            gate.started.notified().await;
            controller.close();
            gate.release.notify_one();
        };
        let (result, ()) = tokio::join!(add, close);
        result.unwrap();

        assert_eq!(controller.cart(), Some(ring_cart()));
        assert!(controller.panel().rendered().is_none());
    }

    #[tokio::test]
    async fn test_unmounted_panel_render_is_noop() {
        let service = FakeService::default();
        script(&service.get, vec![Ok(ring_cart())]);
        let controller =
            CartController::with_panel(service, DisplayConfig::default(), CartPanel::unmounted());

        controller.fetch_and_render().await;

        assert_eq!(controller.cart(), Some(ring_cart()));
        assert_eq!(controller.panel().items_html(), "");
    }

    #[tokio::test]
    async fn test_checkout_with_items_proceeds() {
        let service = FakeService::default();
        script(&service.get, vec![Ok(ring_cart())]);
        let controller = controller(service);

        let decision = controller.checkout(&Control::new("Checkout")).await;
        assert_eq!(decision, CheckoutDecision::Proceed("checkout.html".to_string()));
    }

    #[tokio::test]
    async fn test_checkout_with_empty_cart_stays() {
        let service = FakeService::default();
        script(&service.get, vec![Ok(Cart::empty())]);
        let controller = controller(service);
        let control = Control::new("Checkout");

        assert_eq!(controller.checkout(&control).await, CheckoutDecision::Empty);
        assert_eq!(control.message().as_deref(), Some(EMPTY_CHECKOUT_MESSAGE));
        assert!(!controller.panel().is_open());
    }

    #[tokio::test]
    async fn test_checkout_fetch_failure_blocks() {
        let service = FakeService::default();
        script(&service.get, vec![Err(CartError::server(503, None))]);
        let controller = controller(service);
        let control = Control::new("Checkout");

        assert_eq!(
            controller.checkout(&control).await,
            CheckoutDecision::Blocked(CartError::server(503, None))
        );
        assert_eq!(control.message().as_deref(), Some(CHECKOUT_UNVERIFIED_MESSAGE));
    }

    #[tokio::test]
    async fn test_checkout_on_busy_control_sends_nothing() {
        let controller = controller(FakeService::default());
        let control = Control::new("Checkout");
        let _guard = control.try_begin(UPDATING_LABEL);

        assert_eq!(controller.checkout(&control).await, CheckoutDecision::Busy);
        assert_eq!(controller.service().get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_refetch_after_remove_forgets_stale_snapshot() {
        let service = FakeService::default();
        script(
            &service.get,
            vec![Ok(ring_cart()), Err(CartError::server(500, None))],
        );
        script(&service.remove, vec![Ok(None)]);
        let controller = controller(service);
        controller.fetch_and_render().await;
        assert_eq!(controller.item_count(), 1);

        controller
            .remove_item(&ItemKey::new("7:0"), &Control::new("×"))
            .await
            .unwrap();

        assert_eq!(controller.cart(), None);
        assert_eq!(controller.item_count(), 0);
        let panel = controller.panel();
        assert!(panel.items_html().contains("Could not load cart."));
        assert!(panel.rendered().unwrap().count_html.contains(">0</span>"));
    }
}
