//! Marketplace administration: seller and product approval.

use planet_price_core::{ProductId, Role, UserId};
use planet_price_storefront::flows;
use planet_price_storefront::guard::Requirement;

use super::catalog::print_products;
use super::{CliError, Context};

const ADMIN_USERS: &str = "/admin/users";
const ADMIN_PRODUCTS: &str = "/admin/products";

#[allow(clippy::print_stdout)]
pub async fn users(ctx: &Context, pending_only: bool) -> Result<(), CliError> {
    ctx.guard(Requirement::SuperAdmin, ADMIN_USERS)?;
    let users = ctx.state().api().list_users(pending_only).await?;
    if users.is_empty() {
        println!("No users found");
    }
    for user in &users {
        let pending = if user.role == Role::Seller && !user.seller_approved {
            " (pending approval)"
        } else {
            ""
        };
        println!("#{:<6} {:<20} {:<8}{pending}", user.id, user.username, user.role);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn approve_seller(ctx: &Context, user: UserId) -> Result<(), CliError> {
    ctx.guard(Requirement::SuperAdmin, ADMIN_USERS)?;
    let identity = flows::approve_seller(ctx.state(), user).await?;
    println!("{} is now an approved seller", identity.username);
    Ok(())
}

pub async fn pending_products(ctx: &Context) -> Result<(), CliError> {
    ctx.guard(Requirement::SuperAdmin, ADMIN_PRODUCTS)?;
    let products = ctx.state().api().pending_products().await?;
    print_products(&products);
    Ok(())
}

pub async fn approve_product(ctx: &Context, id: ProductId) -> Result<(), CliError> {
    ctx.guard(Requirement::SuperAdmin, ADMIN_PRODUCTS)?;
    flows::approve_product(ctx.state(), id).await?;
    Ok(())
}

pub async fn reject_product(ctx: &Context, id: ProductId) -> Result<(), CliError> {
    ctx.guard(Requirement::SuperAdmin, ADMIN_PRODUCTS)?;
    flows::reject_product(ctx.state(), id).await?;
    Ok(())
}
