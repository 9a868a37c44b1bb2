//! Cart mirror and checkout against the fake marketplace.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use planet_price_core::{Money, OrderStatus};
use planet_price_integration_tests::FakeMarket;
use planet_price_storefront::api::types::CheckoutForm;
use planet_price_storefront::error::FailureKind;
use planet_price_storefront::flows;
use planet_price_storefront::navigation::Navigator;

fn shipping() -> CheckoutForm {
    CheckoutForm {
        shipping_address: "1 Main St".to_string(),
        shipping_phone: "555-0100".to_string(),
        notes: None,
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_cart_loaded_when_buyer_signs_in() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let buyer = market.add_buyer("ada");
    let kettle = market.add_product(seller, "Kettle", 2500, 10);
    market.seed_cart(buyer, kettle, 2);
    let app = market.app("/");

    app.login("ada").await;

    assert!(app.wait_for_cart(|cart| cart.total_items == 2).await);
    assert_eq!(app.state.cart().item_count(), 2);
    assert_eq!(app.state.cart().total_amount(), Money::from_cents(5000));
}

#[tokio::test]
async fn test_logout_hides_cart_without_network() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let buyer = market.add_buyer("ada");
    let kettle = market.add_product(seller, "Kettle", 2500, 10);
    market.seed_cart(buyer, kettle, 1);
    let app = market.app("/");
    app.login("ada").await;
    assert!(app.wait_for_cart(|cart| cart.total_items == 1).await);
    let fetches = market.request_count("/api/cart/");

    app.state.session().logout().await;

    assert_eq!(app.state.cart().snapshot(), None);
    assert_eq!(app.state.cart().item_count(), 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(market.request_count("/api/cart/"), fetches);
}

#[tokio::test]
async fn test_seller_session_has_no_cart() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let lamp = market.add_product(seller, "Lamp", 1000, 3);
    let app = market.app("/");
    app.login("linus").await;

    let failure = app.state.cart().add_item(lamp, 1).await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::Unauthorized);
    assert_eq!(failure.message, "Failed to add to cart");
    assert_eq!(app.state.cart().snapshot(), None);
    assert_eq!(market.request_count("/api/cart/add/"), 0);
}

// ============================================================================
// Mutations
// ============================================================================

#[tokio::test]
async fn test_add_item_adopts_server_totals() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let buyer = market.add_buyer("ada");
    let product = market.add_product_with_id(42, seller, "Teapot", 1250, 5);
    market.seed_cart(buyer, product, 1);
    let app = market.app("/products/42");
    app.login("ada").await;
    assert!(app.wait_for_cart(|cart| cart.total_items == 1).await);
    let mut notes = app.state.notifier().subscribe();

    app.state.cart().add_item(product, 2).await.unwrap();

    // The server merged the request into the existing line
    let cart = app.state.cart().snapshot().unwrap();
    assert_eq!(cart.total_items, 3);
    assert_eq!(cart.total_amount, Money::from_cents(3750));
    assert_eq!(cart.item_for_product(product).unwrap().quantity, 3);
    assert_eq!(cart.items.len(), 1);
    assert_eq!(notes.recv().await.unwrap().message, "Product added to cart!");
}

#[tokio::test]
async fn test_rejected_add_keeps_snapshot_and_shows_server_error() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let _ = market.add_buyer("ada");
    let lamp = market.add_product(seller, "Lamp", 1000, 1);
    let app = market.app("/");
    app.login("ada").await;
    app.state.cart().add_item(lamp, 1).await.unwrap();
    let before = app.state.cart().snapshot();

    let failure = app.state.cart().add_item(lamp, 1).await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::Validation);
    assert_eq!(failure.message, "Only 1 items available");
    assert_eq!(app.state.cart().snapshot(), before);
}

#[tokio::test]
async fn test_update_remove_and_clear() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let _ = market.add_buyer("ada");
    let lamp = market.add_product(seller, "Lamp", 1000, 10);
    let mug = market.add_product(seller, "Mug", 400, 10);
    let app = market.app("/cart");
    app.login("ada").await;
    let cart = app.state.cart();

    cart.add_item(lamp, 1).await.unwrap();
    cart.add_item(mug, 1).await.unwrap();
    let lamp_line = cart.snapshot().unwrap().item_for_product(lamp).unwrap().id;

    cart.update_item(lamp_line, 3).await.unwrap();
    assert_eq!(cart.item_count(), 4);
    assert_eq!(cart.total_amount(), Money::from_cents(3400));

    cart.remove_item(lamp_line).await.unwrap();
    assert_eq!(cart.item_count(), 1);

    cart.clear().await.unwrap();
    assert!(cart.snapshot().unwrap().is_empty());
    assert_eq!(cart.total_amount(), Money::ZERO);
}

#[tokio::test]
async fn test_mutations_are_single_flight() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let buyer = market.add_buyer("ada");
    let lamp = market.add_product(seller, "Lamp", 1000, 10);
    let mug = market.add_product(seller, "Mug", 400, 10);
    let app = market.app("/");
    app.login("ada").await;
    market.set_cart_delay(Duration::from_millis(100));

    let cart = app.state.cart();
    let (first, second) = tokio::join!(cart.add_item(lamp, 1), cart.add_item(mug, 2));

    first.unwrap();
    second.unwrap();
    assert_eq!(market.max_concurrent_cart_mutations(), 1);
    assert_eq!(cart.item_count(), 3);
    assert_eq!(market.cart_quantity(buyer, mug), 2);
}

#[tokio::test]
async fn test_response_after_logout_is_refused() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let buyer = market.add_buyer("ada");
    let lamp = market.add_product(seller, "Lamp", 1000, 5);
    let app = market.app("/");
    app.login("ada").await;
    assert!(app.wait_for_cart(|cart| cart.is_empty()).await);
    market.set_cart_delay(Duration::from_millis(200));
    let mut notes = app.state.notifier().subscribe();

    let cart = app.state.cart();
    let (added, ()) = tokio::join!(cart.add_item(lamp, 1), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        app.state.session().logout().await;
    });

    // The server accepted the add, but the buyer had already left
    assert_eq!(market.cart_quantity(buyer, lamp), 1);
    let failure = added.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Unauthorized);
    assert_eq!(failure.message, "Failed to add to cart");
    assert_eq!(cart.snapshot(), None);
    let mut shown = Vec::new();
    while let Ok(note) = notes.try_recv() {
        shown.push(note.message);
    }
    assert_eq!(shown, ["Logged out successfully"]);
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_places_order_and_refreshes_cart() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let _ = market.add_buyer("ada");
    let lamp = market.add_product(seller, "Lamp", 1000, 10);
    let app = market.app("/checkout");
    app.login("ada").await;
    app.state.cart().add_item(lamp, 2).await.unwrap();

    let order = flows::checkout(&app.state, &shipping()).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, Money::from_cents(2000));
    assert_eq!(
        app.navigator.current_location(),
        format!("/orders/{}", order.id)
    );
    assert_eq!(app.state.cart().item_count(), 0);
    assert!(app.state.cart().snapshot().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_with_empty_cart_goes_to_cart() {
    let market = FakeMarket::start().await.unwrap();
    let _ = market.add_buyer("ada");
    let app = market.app("/checkout");
    app.login("ada").await;
    assert!(app.wait_for_cart(|cart| cart.is_empty()).await);

    let failure = flows::checkout(&app.state, &shipping()).await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::Validation);
    assert_eq!(app.navigator.current_location(), "/cart");
    assert!(
        !market
            .requests()
            .iter()
            .any(|r| r.path == "/api/orders/" && r.method == axum::http::Method::POST)
    );
}
