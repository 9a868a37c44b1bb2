//! Order history.

use planet_price_core::OrderId;
use planet_price_storefront::api::types::Order;
use planet_price_storefront::guard::Requirement;
use planet_price_storefront::navigation::{locations, order_location};

use super::{CliError, Context};

/// Buyers see their own orders, sellers see orders containing their products.
#[allow(clippy::print_stdout)]
pub async fn list(ctx: &Context) -> Result<(), CliError> {
    ctx.guard(Requirement::Authenticated, locations::ORDERS)?;
    let orders = ctx.state().api().list_orders().await?;
    if orders.is_empty() {
        println!("No orders yet");
    }
    for order in &orders {
        print_summary(order);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn show(ctx: &Context, id: OrderId) -> Result<(), CliError> {
    ctx.guard(Requirement::Authenticated, &order_location(id))?;
    let order = ctx.state().api().get_order(id).await?;
    print_summary(&order);
    println!("  ship to:  {} ({})", order.shipping_address, order.shipping_phone);
    if let Some(notes) = order.notes.as_deref().filter(|n| !n.is_empty()) {
        println!("  notes:    {notes}");
    }
    for item in &order.items {
        println!(
            "  - {} x{} @ {} = {}",
            item.product_title, item.quantity, item.price, item.subtotal
        );
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub(super) fn print_summary(order: &Order) {
    let placed = order
        .created_at
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    println!(
        "#{} {} {} {} {placed}",
        order.id, order.order_number, order.status, order.total_amount
    );
}
