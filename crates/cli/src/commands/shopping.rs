//! Cart, checkout and wishlist commands.

use planet_price_core::{CartItemId, ProductId};
use planet_price_storefront::api::types::{CartSnapshot, CheckoutForm};
use planet_price_storefront::flows;
use planet_price_storefront::guard::Requirement;
use planet_price_storefront::navigation::locations;

use super::catalog::print_products;
use super::{CliError, Context};

const WISHLIST: &str = "/wishlist";

pub async fn show_cart(ctx: &Context) -> Result<(), CliError> {
    ctx.guard(Requirement::Buyer, locations::CART)?;
    ctx.state().cart().refresh().await?;
    print_cart(ctx.state().cart().snapshot().as_ref());
    Ok(())
}

pub async fn add(ctx: &Context, product: ProductId, quantity: u32) -> Result<(), CliError> {
    if quantity == 0 {
        return Err(CliError::InvalidArgument("quantity must be at least 1".into()));
    }
    ctx.guard(Requirement::Buyer, &format!("{}/{product}", locations::PRODUCTS))?;
    ctx.state().cart().add_item(product, quantity).await?;
    print_cart(ctx.state().cart().snapshot().as_ref());
    Ok(())
}

pub async fn update(ctx: &Context, item: CartItemId, quantity: u32) -> Result<(), CliError> {
    ctx.guard(Requirement::Buyer, locations::CART)?;
    if quantity == 0 {
        ctx.state().cart().remove_item(item).await?;
    } else {
        ctx.state().cart().update_item(item, quantity).await?;
    }
    print_cart(ctx.state().cart().snapshot().as_ref());
    Ok(())
}

pub async fn remove(ctx: &Context, item: CartItemId) -> Result<(), CliError> {
    ctx.guard(Requirement::Buyer, locations::CART)?;
    ctx.state().cart().remove_item(item).await?;
    print_cart(ctx.state().cart().snapshot().as_ref());
    Ok(())
}

pub async fn clear(ctx: &Context) -> Result<(), CliError> {
    ctx.guard(Requirement::Buyer, locations::CART)?;
    ctx.state().cart().clear().await?;
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn checkout(
    ctx: &Context,
    address: String,
    phone: String,
    notes: Option<String>,
) -> Result<(), CliError> {
    ctx.guard(Requirement::Buyer, "/checkout")?;
    if address.trim().is_empty() || phone.trim().is_empty() {
        return Err(CliError::InvalidArgument(
            "shipping address and phone are required".into(),
        ));
    }

    // The view shows the cart before offering checkout
    ctx.state().cart().refresh().await?;

    let order = flows::checkout(
        ctx.state(),
        &CheckoutForm {
            shipping_address: address,
            shipping_phone: phone,
            notes,
        },
    )
    .await?;
    println!(
        "Order {} placed: {} ({})",
        order.order_number, order.total_amount, order.status
    );
    Ok(())
}

pub async fn show_wishlist(ctx: &Context) -> Result<(), CliError> {
    ctx.guard(Requirement::Authenticated, WISHLIST)?;
    let wishlist = ctx.state().api().get_wishlist().await?;
    print_products(&wishlist.products);
    Ok(())
}

pub async fn wishlist_add(ctx: &Context, product: ProductId) -> Result<(), CliError> {
    ctx.open(&format!("{}/{product}", locations::PRODUCTS));
    let wishlist = flows::add_to_wishlist(ctx.state(), product).await?;
    print_products(&wishlist.products);
    Ok(())
}

pub async fn wishlist_remove(ctx: &Context, product: ProductId) -> Result<(), CliError> {
    ctx.guard(Requirement::Authenticated, WISHLIST)?;
    let wishlist = flows::remove_from_wishlist(ctx.state(), product).await?;
    print_products(&wishlist.products);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: Option<&CartSnapshot>) {
    let Some(cart) = cart.filter(|cart| !cart.is_empty()) else {
        println!("Your cart is empty");
        return;
    };
    for item in &cart.items {
        println!(
            "[{}] {} x{} @ {} = {}",
            item.id, item.product_title, item.quantity, item.product_price, item.subtotal
        );
    }
    println!("{} items, total {}", cart.total_items, cart.total_amount);
}
