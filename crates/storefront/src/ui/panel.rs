//! Slide-out cart panel.
//!
//! Holds what the page shows for the cart: visibility, the rendered markup
//! and an inline message line. The panel knows nothing about the network.

use super::view::RenderedCart;

/// Body class applied while the panel is open (also locks page scroll).
pub const CART_OPEN_CLASS: &str = "cart-open";

/// Panel visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    #[default]
    Closed,
    Open,
}

/// Cart panel state.
#[derive(Debug, Clone, Default)]
pub struct CartPanel {
    state: PanelState,
    /// Whether the cart container exists on this page.
    mounted: bool,
    rendered: Option<RenderedCart>,
    message: Option<String>,
    /// Incremented on every close; responses to requests started under an
    /// older value are not drawn.
    close_epoch: u64,
}

impl CartPanel {
    /// A closed panel whose container is present on the page.
    #[must_use]
    pub fn mounted() -> Self {
        Self {
            mounted: true,
            ..Self::default()
        }
    }

    /// A panel for a page without a cart container. Rendering is a no-op.
    #[must_use]
    pub fn unmounted() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> PanelState {
        self.state
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == PanelState::Open
    }

    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[must_use]
    pub const fn close_epoch(&self) -> u64 {
        self.close_epoch
    }

    /// `Closed -> Open`. Returns whether the state changed.
    pub fn open(&mut self) -> bool {
        let changed = self.state == PanelState::Closed;
        self.state = PanelState::Open;
        changed
    }

    /// `Open -> Closed`. Returns whether the state changed.
    ///
    /// Always advances the close epoch so responses still in flight are not
    /// drawn into a panel the user dismissed.
    pub fn close(&mut self) -> bool {
        let changed = self.state == PanelState::Open;
        self.state = PanelState::Closed;
        self.close_epoch += 1;
        changed
    }

    /// Class the page body should carry, if any.
    #[must_use]
    pub fn body_class(&self) -> Option<&'static str> {
        self.is_open().then_some(CART_OPEN_CLASS)
    }

    /// Value of the panel's `aria-hidden` attribute.
    #[must_use]
    pub fn aria_hidden(&self) -> &'static str {
        if self.is_open() { "false" } else { "true" }
    }

    /// Replace the panel contents. Returns `false` when nothing was drawn
    /// (unmounted panel, or the request predates the last close).
    pub fn draw(&mut self, rendered: RenderedCart, epoch: u64) -> bool {
        if !self.mounted || epoch != self.close_epoch {
            return false;
        }
        self.rendered = Some(rendered);
        self.message = None;
        true
    }

    /// Last drawn markup.
    #[must_use]
    pub const fn rendered(&self) -> Option<&RenderedCart> {
        self.rendered.as_ref()
    }

    /// Contents of the cart items container.
    #[must_use]
    pub fn items_html(&self) -> &str {
        self.rendered.as_ref().map_or("", |r| r.items_html.as_str())
    }

    /// Text of the total element.
    #[must_use]
    pub fn total_text(&self) -> &str {
        self.rendered.as_ref().map_or("", |r| r.total_text.as_str())
    }

    /// Inline message shown inside the panel.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        if self.mounted {
            self.message = Some(message.into());
        }
    }
}
