//! Catalog browsing and reviews.

use planet_price_core::{ProductId, ReviewId};
use planet_price_storefront::api::types::{
    Category, ProductFilter, ProductSummary, Review, ReviewForm,
};
use planet_price_storefront::flows;
use planet_price_storefront::guard::Requirement;
use planet_price_storefront::navigation::locations;

use super::{CliError, Context};

pub async fn list_products(ctx: &Context, filter: ProductFilter) -> Result<(), CliError> {
    ctx.open(locations::PRODUCTS);
    let products = ctx.state().api().list_products(&filter).await?;
    print_products(&products);
    Ok(())
}

pub async fn featured(ctx: &Context) -> Result<(), CliError> {
    ctx.open(locations::HOME);
    let products = ctx.state().api().featured_products().await?;
    print_products(&products);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn show_product(ctx: &Context, id: ProductId) -> Result<(), CliError> {
    ctx.open(&format!("{}/{id}", locations::PRODUCTS));
    let product = flows::open_product(ctx.state(), id).await?;

    println!("{} (#{})", product.title, product.id);
    match product.discount_price {
        Some(_) => println!(
            "  price:    {} (was {}, -{}%)",
            product.final_price, product.price, product.discount_percentage
        ),
        None => println!("  price:    {}", product.final_price),
    }
    println!("  stock:    {}", product.stock);
    println!("  seller:   {}", product.seller.display_name());
    if let Some(category) = &product.category {
        println!("  category: {}", category.name);
    }
    println!(
        "  rating:   {:.1} ({} reviews)",
        product.average_rating, product.review_count
    );
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }

    let reviews = ctx.state().api().list_reviews(id).await?;
    if !reviews.is_empty() {
        println!();
        print_reviews(&reviews);
    }
    Ok(())
}

pub async fn list_categories(ctx: &Context) -> Result<(), CliError> {
    ctx.open(locations::PRODUCTS);
    let categories = ctx.state().api().list_categories().await?;
    for category in &categories {
        print_category(category, 0);
    }
    Ok(())
}

pub async fn show_category(ctx: &Context, slug: &str) -> Result<(), CliError> {
    ctx.open(&format!("/categories/{slug}"));
    let category = ctx.state().api().get_category(slug).await?;
    print_category(&category, 0);
    Ok(())
}

pub async fn list_reviews(ctx: &Context, product: ProductId) -> Result<(), CliError> {
    let reviews = ctx.state().api().list_reviews(product).await?;
    print_reviews(&reviews);
    Ok(())
}

pub async fn add_review(
    ctx: &Context,
    product: ProductId,
    rating: u8,
    comment: String,
) -> Result<(), CliError> {
    ctx.open(&format!("{}/{product}", locations::PRODUCTS));
    let review = flows::submit_review(
        ctx.state(),
        &ReviewForm {
            product,
            rating,
            comment,
        },
    )
    .await?;
    print_reviews(std::slice::from_ref(&review));
    Ok(())
}

pub async fn update_review(
    ctx: &Context,
    id: ReviewId,
    product: ProductId,
    rating: u8,
    comment: String,
) -> Result<(), CliError> {
    ctx.open(&format!("{}/{product}", locations::PRODUCTS));
    let review = flows::update_review(
        ctx.state(),
        id,
        &ReviewForm {
            product,
            rating,
            comment,
        },
    )
    .await?;
    print_reviews(std::slice::from_ref(&review));
    Ok(())
}

pub async fn delete_review(ctx: &Context, id: ReviewId) -> Result<(), CliError> {
    ctx.guard(Requirement::Authenticated, "/reviews")?;
    flows::delete_review(ctx.state(), id).await?;
    Ok(())
}

#[allow(clippy::print_stdout)]
pub(super) fn print_products(products: &[ProductSummary]) {
    if products.is_empty() {
        println!("No products found");
        return;
    }
    for product in products {
        let stock = if product.stock > 0 {
            format!("{} in stock", product.stock)
        } else {
            "out of stock".to_string()
        };
        println!(
            "#{:<6} {:<40} {:>10}  {stock}",
            product.id, product.title, product.final_price
        );
    }
}

#[allow(clippy::print_stdout)]
fn print_category(category: &Category, depth: usize) {
    println!(
        "{:indent$}{} ({}, #{})",
        "",
        category.name,
        category.slug,
        category.id,
        indent = depth * 2
    );
    for child in &category.subcategories {
        print_category(child, depth + 1);
    }
}

#[allow(clippy::print_stdout)]
fn print_reviews(reviews: &[Review]) {
    if reviews.is_empty() {
        println!("No reviews yet");
        return;
    }
    for review in reviews {
        let verified = if review.is_verified_purchase {
            " (verified purchase)"
        } else {
            ""
        };
        println!(
            "#{} {}/5 by {}{verified}",
            review.id, review.rating, review.buyer_name
        );
        if !review.comment.is_empty() {
            println!("    {}", review.comment);
        }
    }
}
