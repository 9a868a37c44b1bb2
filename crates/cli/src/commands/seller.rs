//! Seller tools: dashboard, product management, order fulfilment.

use std::path::{Path, PathBuf};

use clap::Args;

use planet_price_core::{CategoryId, Money, OrderId, OrderStatus, ProductId};
use planet_price_storefront::api::types::{ImageUpload, ProductFilter, ProductForm};
use planet_price_storefront::flows::{self, SELLER_PRODUCTS};
use planet_price_storefront::guard::Requirement;

use super::catalog::print_products;
use super::orders::print_summary;
use super::{CliError, Context};

const SELLER_DASHBOARD: &str = "/seller/dashboard";
const SELLER_ORDERS: &str = "/seller/orders";

/// Product fields shared by create and update.
#[derive(Args)]
pub struct ProductArgs {
    #[arg(short, long)]
    pub title: String,

    #[arg(short, long)]
    pub description: String,

    #[arg(short, long)]
    pub price: Money,

    #[arg(long)]
    pub discount_price: Option<Money>,

    #[arg(short, long, default_value_t = 0)]
    pub stock: i64,

    /// Category ID
    #[arg(short, long)]
    pub category: CategoryId,

    /// List the product as inactive
    #[arg(long)]
    pub inactive: bool,

    #[arg(long)]
    pub featured: bool,

    /// JSON object of specifications
    #[arg(long)]
    pub specifications: Option<String>,

    /// Image files; on update, any image replaces all existing ones
    #[arg(short, long = "image")]
    pub images: Vec<PathBuf>,

    /// Which of the images is primary
    #[arg(long, default_value_t = 0)]
    pub primary_image: usize,
}

impl ProductArgs {
    fn into_form(self) -> Result<ProductForm, CliError> {
        let specifications = self
            .specifications
            .map(|raw| {
                serde_json::from_str::<serde_json::Value>(&raw)
                    .map_err(|e| CliError::InvalidArgument(format!("specifications: {e}")))
            })
            .transpose()?;
        if self.primary_image > 0 && self.primary_image >= self.images.len() {
            return Err(CliError::InvalidArgument(format!(
                "primary image {} out of range",
                self.primary_image
            )));
        }
        let images = self
            .images
            .iter()
            .map(|path| read_image(path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProductForm {
            title: self.title,
            description: self.description,
            category: Some(self.category),
            price: self.price,
            discount_price: self.discount_price,
            stock: self.stock,
            is_active: !self.inactive,
            is_featured: self.featured,
            specifications,
            images,
            primary_image_index: self.primary_image,
        })
    }
}

#[allow(clippy::print_stdout)]
pub async fn dashboard(ctx: &Context) -> Result<(), CliError> {
    ctx.guard(Requirement::Seller, SELLER_DASHBOARD)?;
    let stats = ctx.state().api().seller_dashboard().await?;
    println!("Products: {} ({} active)", stats.total_products, stats.active_products);
    println!("Orders:   {} ({} pending)", stats.total_orders, stats.pending_orders);
    println!("Revenue:  {}", stats.total_revenue);
    Ok(())
}

pub async fn products(ctx: &Context) -> Result<(), CliError> {
    ctx.guard(Requirement::Seller, SELLER_PRODUCTS)?;
    let seller = ctx.state().session().identity().map(|identity| identity.id);
    let filter = ProductFilter {
        seller,
        ..ProductFilter::default()
    };
    let products = ctx.state().api().list_products(&filter).await?;
    print_products(&products);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn save_product(
    ctx: &Context,
    id: Option<ProductId>,
    product: ProductArgs,
) -> Result<(), CliError> {
    let location = match id {
        Some(id) => format!("{SELLER_PRODUCTS}/{id}/edit"),
        None => format!("{SELLER_PRODUCTS}/new"),
    };
    ctx.guard(Requirement::Seller, &location)?;
    let form = product.into_form()?;
    let record = flows::save_product(ctx.state(), id, &form).await?;
    println!("#{} {} {}", record.id, record.title, record.price);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn upload_image(
    ctx: &Context,
    id: ProductId,
    path: &Path,
    primary: bool,
) -> Result<(), CliError> {
    ctx.guard(Requirement::Seller, &format!("{SELLER_PRODUCTS}/{id}/edit"))?;
    let image = read_image(path)?;
    let uploaded = ctx
        .state()
        .api()
        .upload_product_image(id, &image, primary)
        .await?;
    println!("Image #{} uploaded: {}", uploaded.id, uploaded.image);
    Ok(())
}

pub async fn delete_product(ctx: &Context, id: ProductId) -> Result<(), CliError> {
    ctx.guard(Requirement::Seller, SELLER_PRODUCTS)?;
    flows::delete_product(ctx.state(), id).await?;
    Ok(())
}

pub async fn set_order_status(
    ctx: &Context,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), CliError> {
    ctx.guard(Requirement::Seller, SELLER_ORDERS)?;
    let order = flows::set_order_status(ctx.state(), id, status).await?;
    print_summary(&order);
    Ok(())
}

fn read_image(path: &Path) -> Result<ImageUpload, CliError> {
    let bytes = std::fs::read(path)
        .map_err(|e| CliError::InvalidArgument(format!("{}: {e}", path.display())))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_string(), |name| name.to_string_lossy().into_owned());
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let content_type = match extension.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    };
    Ok(ImageUpload {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    })
}
