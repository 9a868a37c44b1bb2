//! View-level flows that span more than one store.
//!
//! Each flow performs the remote call, announces the outcome on the
//! notification channel and moves the view where the user expects to land.

use tracing::{debug, instrument};

use planet_price_core::{Money, OrderId, OrderStatus, ProductId, ReviewId, UserId};

use crate::api::types::{
    CheckoutForm, Identity, ModerationResult, Order, ProductDetail, ProductForm, ProductRecord,
    Review, ReviewForm, Wishlist,
};
use crate::error::{ActionFailure, FailureKind, add_breadcrumb};
use crate::guard::{Requirement, login_location};
use crate::navigation::{locations, order_location};
use crate::state::AppState;

/// Seller product listing.
pub const SELLER_PRODUCTS: &str = "/seller/products";

// =============================================================================
// Catalog
// =============================================================================

/// Load a product for its detail view.
///
/// A missing product sends the view back to the listing.
///
/// # Errors
///
/// Returns "Product not found" for any failure.
#[instrument(skip(state), fields(product_id = %id))]
pub async fn open_product(state: &AppState, id: ProductId) -> Result<ProductDetail, ActionFailure> {
    match state.api().get_product(id).await {
        Ok(product) => Ok(product),
        Err(e) => {
            debug!(error = %e, "Product unavailable");
            state.notifier().error("Product not found");
            state.navigator().navigate(locations::PRODUCTS);
            Err(ActionFailure::new(FailureKind::from(&e), "Product not found"))
        }
    }
}

// =============================================================================
// Checkout & Orders
// =============================================================================

/// Place an order from the current cart.
///
/// An empty cart sends the view to the cart instead. On success the cart is
/// refreshed (the API empties it) and the view moves to the new order.
///
/// # Errors
///
/// Returns "Your cart is empty" or "Failed to place order".
#[instrument(skip(state, form))]
pub async fn checkout(state: &AppState, form: &CheckoutForm) -> Result<Order, ActionFailure> {
    let cart = state.cart();
    if cart.snapshot().is_none_or(|snapshot| snapshot.is_empty()) {
        state.navigator().navigate(locations::CART);
        return Err(ActionFailure::validation("Your cart is empty"));
    }

    add_breadcrumb("checkout", "Place order", &[]);
    match state.api().create_order(form).await {
        Ok(order) => {
            state.notifier().success("Order placed successfully!");
            if let Err(e) = cart.refresh().await {
                debug!(error = %e, "Cart refresh after checkout failed");
            }
            state.navigator().navigate(&order_location(order.id));
            Ok(order)
        }
        Err(e) => {
            state.notifier().error("Failed to place order");
            Err(ActionFailure::new(FailureKind::from(&e), "Failed to place order"))
        }
    }
}

/// Move an order along (seller only).
///
/// # Errors
///
/// Returns the API's `error` message, or "Failed to update status".
#[instrument(skip(state), fields(order_id = %id, status = %status))]
pub async fn set_order_status(
    state: &AppState,
    id: OrderId,
    status: OrderStatus,
) -> Result<Order, ActionFailure> {
    match state.api().update_order_status(id, status).await {
        Ok(order) => {
            state.notifier().success("Order status updated");
            Ok(order)
        }
        Err(e) => Err(announce(
            state,
            ActionFailure::from_api(
                &e,
                |body| body.error().map(String::from),
                "Failed to update status",
            ),
        )),
    }
}

// =============================================================================
// Wishlist & Reviews
// =============================================================================

/// Add a product to the wishlist, sending anonymous users to login first.
///
/// # Errors
///
/// Returns "Failed to add to wishlist" on failure.
#[instrument(skip(state), fields(product_id = %product))]
pub async fn add_to_wishlist(state: &AppState, product: ProductId) -> Result<Wishlist, ActionFailure> {
    require_login(state, Requirement::Authenticated, "Failed to add to wishlist")?;
    match state.api().add_to_wishlist(product).await {
        Ok(wishlist) => {
            state.notifier().success("Added to wishlist");
            Ok(wishlist)
        }
        Err(e) => Err(announce(
            state,
            ActionFailure::new(FailureKind::from(&e), "Failed to add to wishlist"),
        )),
    }
}

/// Remove a product from the wishlist.
///
/// # Errors
///
/// Returns "Failed to remove from wishlist" on failure.
#[instrument(skip(state), fields(product_id = %product))]
pub async fn remove_from_wishlist(
    state: &AppState,
    product: ProductId,
) -> Result<Wishlist, ActionFailure> {
    match state.api().remove_from_wishlist(product).await {
        Ok(wishlist) => {
            state.notifier().success("Removed from wishlist");
            Ok(wishlist)
        }
        Err(e) => Err(announce(
            state,
            ActionFailure::new(FailureKind::from(&e), "Failed to remove from wishlist"),
        )),
    }
}

/// Post a review, sending anonymous users to login first.
///
/// # Errors
///
/// Returns the first `non_field_errors` message, or "Failed to submit review".
#[instrument(skip(state, form), fields(product_id = %form.product))]
pub async fn submit_review(state: &AppState, form: &ReviewForm) -> Result<Review, ActionFailure> {
    require_login(state, Requirement::Authenticated, "Failed to submit review")?;
    if !(1..=5).contains(&form.rating) {
        return Err(announce(
            state,
            ActionFailure::validation("Rating must be between 1 and 5"),
        ));
    }
    match state.api().create_review(form).await {
        Ok(review) => {
            state.notifier().success("Review submitted successfully");
            Ok(review)
        }
        Err(e) => Err(announce(
            state,
            ActionFailure::from_api(
                &e,
                |body| body.first_field_error(&["non_field_errors", "rating", "comment"]),
                "Failed to submit review",
            ),
        )),
    }
}

/// Replace the rating and comment of one of the buyer's reviews.
///
/// # Errors
///
/// Returns the first field error, or "Failed to update review".
#[instrument(skip(state, form), fields(review_id = %id, rating = form.rating))]
pub async fn update_review(
    state: &AppState,
    id: ReviewId,
    form: &ReviewForm,
) -> Result<Review, ActionFailure> {
    require_login(state, Requirement::Authenticated, "Failed to update review")?;
    if !(1..=5).contains(&form.rating) {
        return Err(announce(
            state,
            ActionFailure::validation("Rating must be between 1 and 5"),
        ));
    }
    match state.api().update_review(id, form).await {
        Ok(review) => {
            state.notifier().success("Review updated");
            Ok(review)
        }
        Err(e) => Err(announce(
            state,
            ActionFailure::from_api(
                &e,
                |body| {
                    body.first_field_error(&["non_field_errors", "rating", "comment"])
                        .or_else(|| body.detail().map(String::from))
                },
                "Failed to update review",
            ),
        )),
    }
}

/// Delete a review.
///
/// # Errors
///
/// Returns "Failed to delete review" on failure.
#[instrument(skip(state), fields(review_id = %id))]
pub async fn delete_review(state: &AppState, id: ReviewId) -> Result<(), ActionFailure> {
    match state.api().delete_review(id).await {
        Ok(()) => {
            state.notifier().success("Review deleted");
            Ok(())
        }
        Err(e) => Err(announce(
            state,
            ActionFailure::new(FailureKind::from(&e), "Failed to delete review"),
        )),
    }
}

// =============================================================================
// Seller Products
// =============================================================================

/// Largest image a seller may attach.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Create or update a product, then return to the seller listing.
///
/// The form is checked locally first; a refused form never reaches the
/// marketplace. New products need at least one image.
///
/// # Errors
///
/// Returns the first field error from the API, or "Failed to save product".
#[instrument(skip(state, form), fields(product_id = ?id, title = %form.title))]
pub async fn save_product(
    state: &AppState,
    id: Option<ProductId>,
    form: &ProductForm,
) -> Result<ProductRecord, ActionFailure> {
    if let Err(message) = check_product_form(id.is_none(), form) {
        return Err(announce(state, ActionFailure::validation(message)));
    }

    let result = match id {
        Some(id) => state.api().update_product(id, form).await,
        None => state.api().create_product(form).await,
    };

    match result {
        Ok(record) => {
            state.notifier().success(if id.is_some() {
                "Product updated"
            } else {
                "Product created"
            });
            state.navigator().navigate(SELLER_PRODUCTS);
            Ok(record)
        }
        Err(e) => Err(announce(
            state,
            ActionFailure::from_api(
                &e,
                |body| {
                    body.first_field_error(&[
                        "non_field_errors",
                        "title",
                        "price",
                        "discount_price",
                        "stock",
                        "category",
                        "images",
                    ])
                    .or_else(|| body.error().map(String::from))
                },
                "Failed to save product",
            ),
        )),
    }
}

/// Delete one of the seller's products.
///
/// # Errors
///
/// Returns "Failed to delete product" on failure.
#[instrument(skip(state), fields(product_id = %id))]
pub async fn delete_product(state: &AppState, id: ProductId) -> Result<(), ActionFailure> {
    match state.api().delete_product(id).await {
        Ok(()) => {
            state.notifier().success("Product deleted");
            Ok(())
        }
        Err(e) => Err(announce(
            state,
            ActionFailure::new(FailureKind::from(&e), "Failed to delete product"),
        )),
    }
}

// =============================================================================
// Administration
// =============================================================================

/// Approve a seller application.
///
/// # Errors
///
/// Returns "Failed to approve seller." on failure.
#[instrument(skip(state), fields(user_id = %user))]
pub async fn approve_seller(state: &AppState, user: UserId) -> Result<Identity, ActionFailure> {
    match state.api().approve_seller(user).await {
        Ok(identity) => {
            state.notifier().success("Seller approved successfully!");
            Ok(identity)
        }
        Err(e) => Err(announce(
            state,
            ActionFailure::from_api(
                &e,
                |body| body.error().map(String::from),
                "Failed to approve seller.",
            ),
        )),
    }
}

/// Approve a pending product.
///
/// # Errors
///
/// Returns the API's `message`, or "Failed to approve product".
#[instrument(skip(state), fields(product_id = %id))]
pub async fn approve_product(
    state: &AppState,
    id: ProductId,
) -> Result<ModerationResult, ActionFailure> {
    moderate(state, id, true).await
}

/// Reject a pending product, removing it.
///
/// # Errors
///
/// Returns the API's `message`, or "Failed to reject product".
#[instrument(skip(state), fields(product_id = %id))]
pub async fn reject_product(
    state: &AppState,
    id: ProductId,
) -> Result<ModerationResult, ActionFailure> {
    moderate(state, id, false).await
}

async fn moderate(
    state: &AppState,
    id: ProductId,
    approve: bool,
) -> Result<ModerationResult, ActionFailure> {
    let (result, fallback) = if approve {
        (state.api().approve_product(id).await, "Failed to approve product")
    } else {
        (state.api().reject_product(id).await, "Failed to reject product")
    };
    match result {
        Ok(outcome) => {
            state.notifier().success(&outcome.message);
            Ok(outcome)
        }
        Err(e) => Err(announce(
            state,
            ActionFailure::from_api(
                &e,
                |body| body.message().or_else(|| body.error()).map(String::from),
                fallback,
            ),
        )),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// First problem with a product form, in the order the form shows fields.
fn check_product_form(is_new: bool, form: &ProductForm) -> Result<(), &'static str> {
    if form.title.trim().is_empty() {
        return Err("Title is required");
    }
    if form.category.is_none() {
        return Err("Category is required");
    }
    if form.description.trim().is_empty() {
        return Err("Description is required");
    }
    if form.price <= Money::ZERO {
        return Err("Price must be greater than zero");
    }
    if form.discount_price.is_some_and(|d| d < Money::ZERO) {
        return Err("Discount price cannot be negative");
    }
    if form.stock < 0 {
        return Err("Stock cannot be negative");
    }
    if form
        .images
        .iter()
        .any(|i| !IMAGE_TYPES.contains(&i.content_type.as_str()))
    {
        return Err("Only JPEG, PNG, GIF and WebP images are allowed");
    }
    if form.images.iter().any(|i| i.bytes.len() > MAX_IMAGE_BYTES) {
        return Err("Images must be 5MB or smaller");
    }
    if is_new && form.images.is_empty() {
        return Err("Please select at least one image for the product");
    }
    Ok(())
}

fn announce(state: &AppState, failure: ActionFailure) -> ActionFailure {
    state.notifier().error(&failure.message);
    failure
}

/// Anonymous users go to login, resuming at the current location.
fn require_login(
    state: &AppState,
    requirement: Requirement,
    fallback: &str,
) -> Result<(), ActionFailure> {
    if state.session().capabilities().satisfies(requirement) {
        return Ok(());
    }
    let here = state.navigator().current_location();
    state.navigator().navigate(&login_location(&here));
    Err(ActionFailure::new(FailureKind::Unauthorized, fallback))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::types::ImageUpload;
    use crate::config::ClientConfig;
    use planet_price_core::CategoryId;
    use crate::navigation::{MemoryNavigator, Navigator};
    use crate::storage::MemoryCredentialStore;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn offline_state(location: &str) -> (AppState, Arc<MemoryNavigator>) {
        let config = ClientConfig::for_api("http://127.0.0.1:9", PathBuf::new()).unwrap();
        let nav = Arc::new(MemoryNavigator::new(location));
        let state =
            AppState::new(config, Arc::new(MemoryCredentialStore::new()), nav.clone()).unwrap();
        (state, nav)
    }

    #[tokio::test]
    async fn test_checkout_with_empty_cart_goes_to_cart() {
        let (state, nav) = offline_state("/checkout");

        let failure = checkout(&state, &CheckoutForm::default()).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Validation);
        assert_eq!(nav.current_location(), "/cart");
    }

    #[tokio::test]
    async fn test_missing_product_goes_to_listing() {
        let (state, nav) = offline_state("/products/999");
        let mut notes = state.notifier().subscribe();

        let failure = open_product(&state, ProductId::new(999)).await.unwrap_err();

        assert_eq!(failure.message, "Product not found");
        assert_eq!(nav.current_location(), "/products");
        assert_eq!(notes.try_recv().unwrap().message, "Product not found");
    }

    #[tokio::test]
    async fn test_anonymous_wishlist_goes_to_login() {
        let (state, nav) = offline_state("/products/7");

        let failure = add_to_wishlist(&state, ProductId::new(7)).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Unauthorized);
        assert_eq!(nav.current_location(), "/login?next=%2Fproducts%2F7");
    }

    fn lamp_form() -> ProductForm {
        ProductForm {
            title: "Lamp".to_string(),
            description: "Brass desk lamp".to_string(),
            category: Some(CategoryId::new(1)),
            price: Money::from_cents(1250),
            stock: 3,
            images: vec![ImageUpload {
                file_name: "lamp.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            }],
            ..ProductForm::default()
        }
    }

    /// Saves `form` as a new product and expects a local refusal.
    async fn refused(form: ProductForm) -> String {
        let (state, nav) = offline_state("/seller/products/new");
        let mut notes = state.notifier().subscribe();

        let failure = save_product(&state, None, &form).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Validation);
        assert_eq!(nav.history().len(), 1);
        assert_eq!(notes.try_recv().unwrap().message, failure.message);
        failure.message
    }

    #[tokio::test]
    async fn test_new_product_needs_an_image() {
        let form = ProductForm {
            images: Vec::new(),
            ..lamp_form()
        };
        assert_eq!(
            refused(form).await,
            "Please select at least one image for the product"
        );
    }

    #[tokio::test]
    async fn test_product_needs_a_title() {
        let form = ProductForm {
            title: "  ".to_string(),
            ..lamp_form()
        };
        assert_eq!(refused(form).await, "Title is required");
    }

    #[tokio::test]
    async fn test_product_needs_a_category() {
        let form = ProductForm {
            category: None,
            ..lamp_form()
        };
        assert_eq!(refused(form).await, "Category is required");
    }

    #[tokio::test]
    async fn test_product_needs_a_description() {
        let form = ProductForm {
            description: "\n".to_string(),
            ..lamp_form()
        };
        assert_eq!(refused(form).await, "Description is required");
    }

    #[tokio::test]
    async fn test_product_price_must_be_positive() {
        for cents in [0, -100] {
            let form = ProductForm {
                price: Money::from_cents(cents),
                ..lamp_form()
            };
            assert_eq!(refused(form).await, "Price must be greater than zero");
        }
    }

    #[tokio::test]
    async fn test_product_discount_cannot_be_negative() {
        let form = ProductForm {
            discount_price: Some(Money::from_cents(-1)),
            ..lamp_form()
        };
        assert_eq!(refused(form).await, "Discount price cannot be negative");

        // A zero discount is allowed
        let form = ProductForm {
            discount_price: Some(Money::ZERO),
            ..lamp_form()
        };
        assert_eq!(check_product_form(true, &form), Ok(()));
    }

    #[tokio::test]
    async fn test_product_stock_cannot_be_negative() {
        let form = ProductForm {
            stock: -1,
            ..lamp_form()
        };
        assert_eq!(refused(form).await, "Stock cannot be negative");
    }

    #[tokio::test]
    async fn test_product_images_are_checked() {
        let mut form = lamp_form();
        form.images[0].content_type = "application/pdf".to_string();
        assert_eq!(
            refused(form).await,
            "Only JPEG, PNG, GIF and WebP images are allowed"
        );

        let mut form = lamp_form();
        form.images[0].bytes = vec![0; MAX_IMAGE_BYTES + 1];
        assert_eq!(refused(form).await, "Images must be 5MB or smaller");
    }

    #[test]
    fn test_existing_product_keeps_its_images() {
        let form = ProductForm {
            images: Vec::new(),
            ..lamp_form()
        };
        assert_eq!(check_product_form(false, &form), Ok(()));
    }

    #[tokio::test]
    async fn test_anonymous_review_update_goes_to_login() {
        let (state, nav) = offline_state("/products/7");
        let form = ReviewForm {
            product: ProductId::new(7),
            rating: 4,
            comment: String::new(),
        };

        let failure = update_review(&state, ReviewId::new(3), &form).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Unauthorized);
        assert_eq!(failure.message, "Failed to update review");
        assert_eq!(nav.current_location(), "/login?next=%2Fproducts%2F7");
    }
}
