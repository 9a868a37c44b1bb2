//! Planet Price CLI - browse the marketplace, manage a cart and place orders.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the session is stored and restored on the next run)
//! pp login -u ada
//!
//! # Browse
//! pp products list --search kettle --ordering price
//! pp products show 42
//!
//! # Cart and checkout
//! pp cart add 42 --quantity 2
//! pp checkout --address "1 Main St" --phone 555-0100
//!
//! # Seller and administration
//! pp seller dashboard
//! pp admin approve-product 42
//! ```
//!
//! # Environment Variables
//!
//! See `ClientConfig` for the full list. `RUST_LOG` controls log output.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use planet_price_core::{
    CartItemId, CategoryId, Email, Money, OrderId, OrderStatus, ProductId, ReviewId, Role, UserId,
};
use planet_price_storefront::api::types::{ProductFilter, ProductOrdering};
use planet_price_storefront::config::ClientConfig;

mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "pp")]
#[command(author, version, about = "Planet Price marketplace CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        #[arg(short, long)]
        username: String,

        /// Read from `PP_PASSWORD` when omitted
        #[arg(short, long, env = "PP_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: Email,

        #[arg(short, long, env = "PP_PASSWORD", hide_env_values = true)]
        password: String,

        /// Defaults to the password
        #[arg(long)]
        password_confirm: Option<String>,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        /// `buyer` or `seller`
        #[arg(short, long, default_value = "buyer")]
        role: Role,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Ask to become a seller
    ApplySeller,
    /// Browse products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Browse categories
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order from the cart
    Checkout {
        #[arg(short, long)]
        address: String,

        #[arg(short, long)]
        phone: String,

        #[arg(short, long)]
        notes: Option<String>,
    },
    /// View orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Read and write product reviews
    Reviews {
        #[command(subcommand)]
        action: ReviewsAction,
    },
    /// Seller tools
    Seller {
        #[command(subcommand)]
        action: SellerAction,
    },
    /// Marketplace administration
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        #[arg(short, long)]
        search: Option<String>,

        /// Category ID
        #[arg(short, long)]
        category: Option<CategoryId>,

        #[arg(long)]
        min_price: Option<Money>,

        #[arg(long)]
        max_price: Option<Money>,

        #[arg(long)]
        min_rating: Option<f64>,

        /// `price`, `-price`, `newest`, `oldest`, `title` or `-title`
        #[arg(short, long)]
        ordering: Option<ProductOrdering>,
    },
    /// Show one product with its reviews
    Show { id: ProductId },
    /// List featured products
    Featured,
}

#[derive(Subcommand)]
enum CategoriesAction {
    /// List categories
    List,
    /// Show a category by slug
    Show { slug: String },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        product: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity
    Update { item: CartItemId, quantity: u32 },
    /// Remove a line
    Remove { item: CartItemId },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List orders
    List,
    /// Show one order
    Show { id: OrderId },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Show the wishlist
    Show,
    /// Add a product
    Add { product: ProductId },
    /// Remove a product
    Remove { product: ProductId },
}

#[derive(Subcommand)]
enum ReviewsAction {
    /// List reviews for a product
    List { product: ProductId },
    /// Review a product
    Add {
        product: ProductId,

        /// 1 to 5
        #[arg(short, long)]
        rating: u8,

        #[arg(short, long, default_value = "")]
        comment: String,
    },
    /// Change the rating or comment of your review
    Update {
        id: ReviewId,

        /// Product the review belongs to
        #[arg(short, long)]
        product: ProductId,

        /// 1 to 5
        #[arg(short, long)]
        rating: u8,

        #[arg(short, long, default_value = "")]
        comment: String,
    },
    /// Delete a review
    Delete { id: ReviewId },
}

#[derive(Subcommand)]
enum SellerAction {
    /// Show sales statistics
    Dashboard,
    /// List own products, including unapproved ones
    Products,
    /// Create a product
    CreateProduct(commands::seller::ProductArgs),
    /// Update a product
    UpdateProduct {
        id: ProductId,

        #[command(flatten)]
        product: commands::seller::ProductArgs,
    },
    /// Attach one more image to a product
    UploadImage {
        id: ProductId,

        path: PathBuf,

        /// Make it the primary image
        #[arg(long)]
        primary: bool,
    },
    /// Delete a product
    DeleteProduct { id: ProductId },
    /// Move an order along
    SetOrderStatus { id: OrderId, status: OrderStatus },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List users
    Users {
        /// Only sellers awaiting approval
        #[arg(long)]
        pending: bool,
    },
    /// Approve a seller application
    ApproveSeller { user: UserId },
    /// List products awaiting approval
    PendingProducts,
    /// Approve a product
    ApproveProduct { id: ProductId },
    /// Reject and remove a product
    RejectProduct { id: ProductId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "planet_price_storefront=warn,pp=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let ctx = Context::start(config).await?;
    let result = dispatch(&ctx, cli.command).await;
    ctx.flush_notifications();
    ctx.report_location();
    result
}

async fn dispatch(ctx: &Context, command: Commands) -> Result<(), CliError> {
    use commands::{account, admin, catalog, orders, seller, shopping};

    match command {
        Commands::Login { username, password } => account::login(ctx, username, password).await,
        Commands::Register {
            username,
            email,
            password,
            password_confirm,
            first_name,
            last_name,
            role,
        } => {
            let password_confirm = password_confirm.unwrap_or_else(|| password.clone());
            account::register(
                ctx,
                account::Registration {
                    username,
                    email,
                    password,
                    password_confirm,
                    first_name,
                    last_name,
                    role,
                },
            )
            .await
        }
        Commands::Logout => account::logout(ctx).await,
        Commands::Whoami => account::whoami(ctx),
        Commands::ApplySeller => account::apply_seller(ctx).await,
        Commands::Products { action } => match action {
            ProductsAction::List {
                search,
                category,
                min_price,
                max_price,
                min_rating,
                ordering,
            } => {
                catalog::list_products(
                    ctx,
                    ProductFilter {
                        search,
                        category,
                        seller: None,
                        min_price,
                        max_price,
                        min_rating,
                        ordering,
                    },
                )
                .await
            }
            ProductsAction::Show { id } => catalog::show_product(ctx, id).await,
            ProductsAction::Featured => catalog::featured(ctx).await,
        },
        Commands::Categories { action } => match action {
            CategoriesAction::List => catalog::list_categories(ctx).await,
            CategoriesAction::Show { slug } => catalog::show_category(ctx, &slug).await,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => shopping::show_cart(ctx).await,
            CartAction::Add { product, quantity } => shopping::add(ctx, product, quantity).await,
            CartAction::Update { item, quantity } => shopping::update(ctx, item, quantity).await,
            CartAction::Remove { item } => shopping::remove(ctx, item).await,
            CartAction::Clear => shopping::clear(ctx).await,
        },
        Commands::Checkout {
            address,
            phone,
            notes,
        } => shopping::checkout(ctx, address, phone, notes).await,
        Commands::Orders { action } => match action {
            OrdersAction::List => orders::list(ctx).await,
            OrdersAction::Show { id } => orders::show(ctx, id).await,
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => shopping::show_wishlist(ctx).await,
            WishlistAction::Add { product } => shopping::wishlist_add(ctx, product).await,
            WishlistAction::Remove { product } => shopping::wishlist_remove(ctx, product).await,
        },
        Commands::Reviews { action } => match action {
            ReviewsAction::List { product } => catalog::list_reviews(ctx, product).await,
            ReviewsAction::Add {
                product,
                rating,
                comment,
            } => catalog::add_review(ctx, product, rating, comment).await,
            ReviewsAction::Update {
                id,
                product,
                rating,
                comment,
            } => catalog::update_review(ctx, id, product, rating, comment).await,
            ReviewsAction::Delete { id } => catalog::delete_review(ctx, id).await,
        },
        Commands::Seller { action } => match action {
            SellerAction::Dashboard => seller::dashboard(ctx).await,
            SellerAction::Products => seller::products(ctx).await,
            SellerAction::CreateProduct(product) => seller::save_product(ctx, None, product).await,
            SellerAction::UpdateProduct { id, product } => {
                seller::save_product(ctx, Some(id), product).await
            }
            SellerAction::UploadImage { id, path, primary } => {
                seller::upload_image(ctx, id, &path, primary).await
            }
            SellerAction::DeleteProduct { id } => seller::delete_product(ctx, id).await,
            SellerAction::SetOrderStatus { id, status } => {
                seller::set_order_status(ctx, id, status).await
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Users { pending } => admin::users(ctx, pending).await,
            AdminAction::ApproveSeller { user } => admin::approve_seller(ctx, user).await,
            AdminAction::PendingProducts => admin::pending_products(ctx).await,
            AdminAction::ApproveProduct { id } => admin::approve_product(ctx, id).await,
            AdminAction::RejectProduct { id } => admin::reject_product(ctx, id).await,
        },
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reviews_update_arguments() {
        let cli = Cli::try_parse_from([
            "pp", "reviews", "update", "12", "--product", "7", "-r", "4", "-c", "Sturdy",
        ])
        .unwrap();

        let Commands::Reviews {
            action:
                ReviewsAction::Update {
                    id,
                    product,
                    rating,
                    comment,
                },
        } = cli.command
        else {
            panic!("expected reviews update");
        };
        assert_eq!(id, ReviewId::new(12));
        assert_eq!(product, ProductId::new(7));
        assert_eq!(rating, 4);
        assert_eq!(comment, "Sturdy");
    }

    #[test]
    fn test_reviews_update_needs_a_rating() {
        assert!(Cli::try_parse_from(["pp", "reviews", "update", "12", "-p", "7"]).is_err());
    }
}
