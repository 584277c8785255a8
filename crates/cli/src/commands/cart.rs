//! Single cart actions.

use clap::Subcommand;
use jewellery_core::{ProductId, VariantId};
use jewellery_storefront::cart::ItemKey;
use jewellery_storefront::controller::{AddItem, CartController, CheckoutDecision};
use jewellery_storefront::error::CartError;
use jewellery_storefront::service::CartService;
use jewellery_storefront::ui::{CartPanel, Control};

/// One cart action.
#[derive(Debug, Subcommand)]
pub enum CartAction {
    /// Fetch and print the cart
    Show,
    /// Add a product
    Add {
        /// Product id
        product_id: ProductId,

        /// Variant (attribute value) id
        #[arg(short, long)]
        variant: Option<VariantId>,

        /// Number of units
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a line by its item key (e.g. `7:3`)
    Remove { item_key: String },
    /// Set a line's quantity
    Update { item_key: String, quantity: u32 },
    /// Remove every line
    Clear,
    /// Check the cart before checkout
    Checkout,
}

/// Run one action and print the resulting panel.
///
/// # Errors
///
/// Returns the cart error when the action failed.
pub async fn execute<S: CartService>(
    controller: &CartController<S>,
    action: CartAction,
) -> Result<(), CartError> {
    let control = Control::new("cli");
    match action {
        CartAction::Show => controller.fetch_and_render().await,
        CartAction::Add {
            product_id,
            variant,
            quantity,
        } => {
            let item = AddItem {
                product_id: Some(product_id),
                variant_id: variant,
                quantity: Some(quantity),
            };
            controller.add_item(item, &control).await?;
        }
        CartAction::Remove { item_key } => {
            controller
                .remove_item(&ItemKey::new(item_key), &control)
                .await?;
        }
        CartAction::Update { item_key, quantity } => {
            controller
                .update_quantity(&ItemKey::new(item_key), quantity, &control)
                .await?;
        }
        CartAction::Clear => controller.clear(&control).await?,
        CartAction::Checkout => {
            let decision = controller.checkout(&control).await;
            print_checkout(&decision, control.message().as_deref());
            if let CheckoutDecision::Blocked(err) = decision {
                return Err(err);
            }
            return Ok(());
        }
    }
    print_panel(&controller.panel());
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_panel(panel: &CartPanel) {
    let Some(rendered) = panel.rendered() else {
        if let Some(message) = panel.message() {
            println!("{message}");
        }
        return;
    };

    let view = &rendered.view;
    if view.items.is_empty() {
        println!("{}", view.empty_message);
    }
    for item in &view.items {
        println!("[{}] {}", item.item_key, item.summary());
    }
    println!("{}", rendered.total_text);
    println!("Items: {}", view.item_count);
    if let Some(message) = panel.message() {
        println!("{message}");
    }
}

#[allow(clippy::print_stdout)]
fn print_checkout(decision: &CheckoutDecision, message: Option<&str>) {
    match decision {
        CheckoutDecision::Proceed(path) => println!("Proceed to {path}"),
        CheckoutDecision::Empty | CheckoutDecision::Blocked(_) => {
            println!("{}", message.unwrap_or_default());
        }
        CheckoutDecision::Busy => println!("Checkout already in progress"),
    }
}
