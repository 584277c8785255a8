//! Headless page model for the cart: the slide-out panel, clickable controls,
//! rendering, and the event wiring that ties them to the controller.

pub mod bindings;
pub mod control;
pub mod panel;
pub mod view;

pub use bindings::{AddToCartTrigger, CartBindings, Outcome, UiEvent};
pub use control::{BusyGuard, Control};
pub use panel::{CartPanel, PanelState};
pub use view::{CartLineView, CartView, RenderedCart, render};
