//! Seller and administrator flows against the fake marketplace.

#![allow(clippy::unwrap_used)]

use planet_price_core::{OrderStatus, ProductId, Role};
use planet_price_integration_tests::FakeMarket;
use planet_price_storefront::api::types::CheckoutForm;
use planet_price_storefront::error::FailureKind;
use planet_price_storefront::flows;
use planet_price_storefront::navigation::Navigator;
use planet_price_storefront::notify::NotificationLevel;

#[tokio::test]
async fn test_admin_moderates_products() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let _ = market.add_admin("root");
    let first = market.add_pending_product(seller, "Lamp");
    let second = market.add_pending_product(seller, "Mug");
    let app = market.app("/admin/products");
    app.login("root").await;
    let mut notes = app.state.notifier().subscribe();

    let pending = app.state.api().pending_products().await.unwrap();
    assert_eq!(pending.len(), 2);

    let approved = flows::approve_product(&app.state, first).await.unwrap();
    assert_eq!(approved.status, "approved");
    assert_eq!(notes.recv().await.unwrap().message, "Product approved successfully!");

    flows::reject_product(&app.state, second).await.unwrap();
    assert_eq!(notes.recv().await.unwrap().message, "Product rejected and removed");
    assert!(!market.has_product(second));

    // Approving twice surfaces the server's message
    let failure = flows::approve_product(&app.state, first).await.unwrap_err();
    assert_eq!(failure.message, "Product is already approved");
    let note = notes.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
}

#[tokio::test]
async fn test_admin_approves_seller() {
    let market = FakeMarket::start().await.unwrap();
    let applicant = market.add_pending_seller("linus");
    let _ = market.add_admin("root");
    let app = market.app("/admin/users");
    app.login("root").await;

    let pending = app.state.api().list_users(true).await.unwrap();
    assert_eq!(pending.len(), 1);

    let identity = flows::approve_seller(&app.state, applicant).await.unwrap();
    assert_eq!(identity.role, Role::Seller);
    assert!(identity.seller_approved);
    assert!(app.state.api().list_users(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let lamp = market.add_pending_product(seller, "Lamp");
    let app = market.app("/");
    app.login("linus").await;

    let failure = flows::approve_product(&app.state, lamp).await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::Forbidden);
    assert_eq!(failure.message, "Failed to approve product");
}

#[tokio::test]
async fn test_seller_fulfils_order_and_deletes_product() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let _ = market.add_buyer("ada");
    let lamp = market.add_product(seller, "Lamp", 1000, 5);

    let buyer_app = market.app("/checkout");
    buyer_app.login("ada").await;
    buyer_app.state.cart().add_item(lamp, 1).await.unwrap();
    let order = flows::checkout(
        &buyer_app.state,
        &CheckoutForm {
            shipping_address: "1 Main St".to_string(),
            shipping_phone: "555-0100".to_string(),
            notes: None,
        },
    )
    .await
    .unwrap();

    let seller_app = market.app("/seller/orders");
    seller_app.login("linus").await;
    let updated = flows::set_order_status(&seller_app.state, order.id, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);

    let dashboard = seller_app.state.api().seller_dashboard().await.unwrap();
    assert_eq!(dashboard.total_products, 1);

    flows::delete_product(&seller_app.state, lamp).await.unwrap();
    assert!(!market.has_product(lamp));
}

#[tokio::test]
async fn test_wishlist_requires_login_then_adds() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let _ = market.add_buyer("ada");
    let lamp = market.add_product(seller, "Lamp", 1000, 5);
    let location = format!("/products/{lamp}");
    let app = market.app(&location);
    app.state.session().bootstrap().await;

    let failure = flows::add_to_wishlist(&app.state, lamp).await.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Unauthorized);
    assert!(app.navigator.current_location().starts_with("/login?next="));

    app.login("ada").await;
    let wishlist = flows::add_to_wishlist(&app.state, lamp).await.unwrap();
    assert!(wishlist.contains(lamp));

    let wishlist = flows::remove_from_wishlist(&app.state, lamp).await.unwrap();
    assert!(!wishlist.contains(lamp));
    assert!(!wishlist.contains(ProductId::new(0)));
}
