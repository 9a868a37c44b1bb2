//! Wire types for the Planet Price marketplace API.
//!
//! These mirror the JSON representations the API returns. Every mutating
//! call answers with the full updated resource, which callers adopt as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use planet_price_core::{
    CartId, CartItemId, CategoryId, Email, Money, OrderId, OrderItemId, OrderStatus, ProductId,
    ProductImageId, ReviewId, Role, UserId, WishlistId,
};

// =============================================================================
// Listing Envelope
// =============================================================================

/// A list response, either paginated or a bare array.
///
/// Paginated endpoints wrap items as `{"results": [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Plain(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> Listing<T> {
    /// Flatten either shape into the contained items.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Plain(results) | Self::Page { results } => results,
        }
    }
}

// =============================================================================
// Identity Types
// =============================================================================

/// The authenticated user's profile as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    /// Only meaningful for sellers; set by an administrator.
    #[serde(default)]
    pub seller_approved: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Full name when present, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Username/password pair for the login endpoint.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Registration form payload.
#[derive(Clone, Serialize)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("password_confirm", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("role", &self.role)
            .finish()
    }
}

/// Response to a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: Identity,
    pub token: String,
}

/// Response to a seller application.
#[derive(Debug, Clone, Deserialize)]
pub struct SellerApplication {
    pub message: String,
    pub user: Identity,
}

// =============================================================================
// Catalog Types
// =============================================================================

/// A product category, possibly nested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent: Option<CategoryId>,
    #[serde(default)]
    pub subcategories: Vec<Category>,
}

/// An image attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub image: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub order: i32,
}

/// A product as it appears in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub price: Money,
    #[serde(default)]
    pub discount_price: Option<Money>,
    pub final_price: Money,
    #[serde(default)]
    pub discount_percentage: i32,
    pub stock: i64,
    #[serde(default)]
    pub is_active: bool,
    /// Absent on some listing endpoints.
    #[serde(default)]
    pub is_approved: Option<bool>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub seller_name: String,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub primary_image: Option<String>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Full product detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: ProductId,
    pub seller: Identity,
    #[serde(default)]
    pub category: Option<Category>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub specifications: Option<serde_json::Value>,
    pub price: Money,
    #[serde(default)]
    pub discount_price: Option<Money>,
    pub final_price: Money,
    #[serde(default)]
    pub discount_percentage: i32,
    pub stock: i64,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductDetail {
    /// The primary image, falling back to the first one.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| self.images.first())
    }
}

/// Ordering accepted by the product listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductOrdering {
    PriceAsc,
    PriceDesc,
    Newest,
    Oldest,
    TitleAsc,
    TitleDesc,
}

impl ProductOrdering {
    /// Query parameter value.
    #[must_use]
    pub const fn as_param(&self) -> &'static str {
        match self {
            Self::PriceAsc => "price",
            Self::PriceDesc => "-price",
            Self::Newest => "-created_at",
            Self::Oldest => "created_at",
            Self::TitleAsc => "title",
            Self::TitleDesc => "-title",
        }
    }
}

impl std::str::FromStr for ProductOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price" => Ok(Self::PriceAsc),
            "-price" => Ok(Self::PriceDesc),
            "-created_at" | "newest" => Ok(Self::Newest),
            "created_at" | "oldest" => Ok(Self::Oldest),
            "title" => Ok(Self::TitleAsc),
            "-title" => Ok(Self::TitleDesc),
            _ => Err(format!("invalid ordering: {s}")),
        }
    }
}

/// Filters for the product listing.
///
/// Unset fields are omitted from the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub search: Option<String>,
    /// Category ID.
    pub category: Option<CategoryId>,
    /// Restrict to one seller; sellers see their own unapproved products this way.
    pub seller: Option<UserId>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub min_rating: Option<f64>,
    pub ordering: Option<ProductOrdering>,
}

impl ProductFilter {
    /// Render the filter as query pairs.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(search) = self.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            query.push(("search", search.to_string()));
        }
        if let Some(category) = self.category {
            query.push(("category", category.to_string()));
        }
        if let Some(seller) = self.seller {
            query.push(("seller", seller.to_string()));
        }
        if let Some(min) = self.min_price {
            query.push(("min_price", min.amount().to_string()));
        }
        if let Some(max) = self.max_price {
            query.push(("max_price", max.amount().to_string()));
        }
        if let Some(rating) = self.min_rating {
            query.push(("min_rating", rating.to_string()));
        }
        if let Some(ordering) = self.ordering {
            query.push(("ordering", ordering.as_param().to_string()));
        }
        query
    }
}

/// An image file attached to a product form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Seller product create/update form, sent as multipart.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub title: String,
    pub description: String,
    pub category: Option<CategoryId>,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub stock: i64,
    pub is_active: bool,
    pub is_featured: bool,
    pub specifications: Option<serde_json::Value>,
    /// New images. On update, providing any replaces all existing images.
    pub images: Vec<ImageUpload>,
    pub primary_image_index: usize,
}

/// Product representation returned by create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    #[serde(default)]
    pub category: Option<CategoryId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub discount_price: Option<Money>,
    pub stock: i64,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub image_urls: Vec<ProductImage>,
}

// =============================================================================
// Cart Types
// =============================================================================

/// A line in the cart, priced by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product: ProductId,
    #[serde(default)]
    pub product_title: String,
    pub product_price: Money,
    #[serde(default)]
    pub product_image: Option<String>,
    #[serde(default)]
    pub product_stock: i64,
    pub quantity: u32,
    pub subtotal: Money,
}

/// Server-authoritative cart snapshot.
///
/// Totals are computed by the API; the client never derives them from lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub id: Option<CartId>,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub total_items: u32,
    pub total_amount: Money,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartSnapshot {
    /// Returns true when the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find a line by its ID.
    #[must_use]
    pub fn item(&self, id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Find the line holding a product.
    #[must_use]
    pub fn item_for_product(&self, product: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product == product)
    }
}

// =============================================================================
// Wishlist Types
// =============================================================================

/// The buyer's wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wishlist {
    #[serde(default)]
    pub id: Option<WishlistId>,
    #[serde(default)]
    pub products: Vec<ProductSummary>,
}

impl Wishlist {
    /// Returns true when the product is on the wishlist.
    #[must_use]
    pub fn contains(&self, product: ProductId) -> bool {
        self.products.iter().any(|p| p.id == product)
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// A line in a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product: ProductId,
    #[serde(default)]
    pub product_title: String,
    #[serde(default)]
    pub product_image: Option<String>,
    pub quantity: u32,
    pub price: Money,
    pub subtotal: Money,
    #[serde(default)]
    pub seller: Option<UserId>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    #[serde(default)]
    pub buyer: Option<UserId>,
    #[serde(default)]
    pub buyer_name: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub shipping_phone: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Checkout form. The API builds the order from the server-side cart.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckoutForm {
    pub shipping_address: String,
    pub shipping_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// =============================================================================
// Review Types
// =============================================================================

/// A product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product: ProductId,
    #[serde(default)]
    pub buyer: Option<UserId>,
    #[serde(default)]
    pub buyer_name: String,
    #[serde(default)]
    pub product_title: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub is_verified_purchase: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Review create/update payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewForm {
    pub product: ProductId,
    pub rating: u8,
    pub comment: String,
}

// =============================================================================
// Admin & Seller Types
// =============================================================================

/// Acknowledgement returned by product moderation endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationResult {
    pub status: String,
    pub message: String,
}

/// Aggregate statistics for the seller dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerDashboard {
    pub total_products: i64,
    pub active_products: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub total_revenue: Money,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_accepts_both_shapes() {
        let plain: Listing<Category> = serde_json::from_value(json!([
            {"id": 1, "name": "Books", "slug": "books"}
        ]))
        .unwrap();
        let page: Listing<Category> = serde_json::from_value(json!({
            "count": 1,
            "results": [{"id": 1, "name": "Books", "slug": "books"}]
        }))
        .unwrap();

        assert_eq!(plain.into_vec(), page.into_vec());
    }

    #[test]
    fn test_identity_tolerates_missing_optional_fields() {
        let identity: Identity = serde_json::from_value(json!({
            "id": 3,
            "username": "ada",
            "email": "ada@example.com",
            "role": "seller"
        }))
        .unwrap();

        assert_eq!(identity.role, Role::Seller);
        assert!(!identity.seller_approved);
        assert_eq!(identity.display_name(), "ada");
    }

    #[test]
    fn test_cart_snapshot_parses_decimal_strings() {
        let cart: CartSnapshot = serde_json::from_value(json!({
            "id": 1,
            "items": [{
                "id": 10,
                "product": 42,
                "product_title": "Kettle",
                "product_price": "24.50",
                "product_stock": 9,
                "quantity": 2,
                "subtotal": "49.00"
            }],
            "total_items": 2,
            "total_amount": "49.00"
        }))
        .unwrap();

        assert_eq!(cart.total_amount, Money::from_cents(4900));
        assert_eq!(
            cart.item_for_product(ProductId::new(42)).map(|i| i.id),
            Some(CartItemId::new(10))
        );
    }

    #[test]
    fn test_product_filter_omits_unset_fields() {
        let filter = ProductFilter {
            search: Some("  ".to_string()),
            category: Some(CategoryId::new(4)),
            max_price: Some(Money::from_cents(5000)),
            ordering: Some(ProductOrdering::PriceDesc),
            ..ProductFilter::default()
        };

        assert_eq!(
            filter.to_query(),
            vec![
                ("category", "4".to_string()),
                ("max_price", "50.00".to_string()),
                ("ordering", "-price".to_string()),
            ]
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "ada".to_string(),
            password: "hunter22".to_string(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("ada"));
        assert!(!debug.contains("hunter22"));
    }
}
