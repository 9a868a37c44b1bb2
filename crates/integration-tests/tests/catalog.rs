//! Seller product forms and reviews against the fake marketplace.

#![allow(clippy::unwrap_used)]

use planet_price_core::{CategoryId, Money, ProductId};
use planet_price_integration_tests::FakeMarket;
use planet_price_storefront::api::types::{ImageUpload, ProductForm, ReviewForm};
use planet_price_storefront::error::FailureKind;
use planet_price_storefront::flows;
use planet_price_storefront::navigation::Navigator;

fn png(file_name: &str, size: usize) -> ImageUpload {
    ImageUpload {
        file_name: file_name.to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![7; size],
    }
}

fn lamp_form() -> ProductForm {
    ProductForm {
        title: " Desk Lamp ".to_string(),
        description: "Brass desk lamp".to_string(),
        category: Some(CategoryId::new(1)),
        price: Money::from_cents(1250),
        discount_price: Some(Money::from_cents(999)),
        stock: 4,
        is_active: true,
        is_featured: true,
        images: vec![png("front.png", 10), png("back.png", 20)],
        primary_image_index: 1,
        ..ProductForm::default()
    }
}

fn review(product: ProductId, rating: u8, comment: &str) -> ReviewForm {
    ReviewForm {
        product,
        rating,
        comment: comment.to_string(),
    }
}

// ============================================================================
// Seller products
// ============================================================================

#[tokio::test]
async fn test_create_product_sends_multipart_form() {
    let market = FakeMarket::start().await.unwrap();
    let _ = market.add_seller("linus");
    let app = market.app("/seller/products/new");
    app.login("linus").await;

    let record = flows::save_product(&app.state, None, &lamp_form())
        .await
        .unwrap();

    let received = market.last_product_form().unwrap();
    assert_eq!(received.text("title"), Some("Desk Lamp"));
    assert_eq!(received.text("description"), Some("Brass desk lamp"));
    assert_eq!(received.text("category"), Some("1"));
    assert_eq!(received.text("price"), Some("12.50"));
    assert_eq!(received.text("discount_price"), Some("9.99"));
    assert_eq!(received.text("stock"), Some("4"));
    assert_eq!(received.text("is_active"), Some("true"));
    assert_eq!(received.text("is_featured"), Some("true"));
    assert_eq!(received.text("specifications"), Some("{}"));
    assert_eq!(received.text("primary_image_index"), Some("1"));

    let files = received.files_named("images");
    let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, ["front.png", "back.png"]);
    assert_eq!(files[1].size, 20);
    assert_eq!(files[1].content_type, "image/png");

    assert_eq!(record.title, "Desk Lamp");
    assert_eq!(record.price, Money::from_cents(1250));
    let primary: Vec<_> = record.image_urls.iter().map(|i| i.is_primary).collect();
    assert_eq!(primary, [false, true]);
    assert_eq!(app.navigator.current_location(), flows::SELLER_PRODUCTS);
}

#[tokio::test]
async fn test_primary_index_is_clamped_to_the_images_sent() {
    let market = FakeMarket::start().await.unwrap();
    let _ = market.add_seller("linus");
    let app = market.app("/seller/products/new");
    app.login("linus").await;
    let form = ProductForm {
        primary_image_index: 9,
        ..lamp_form()
    };

    flows::save_product(&app.state, None, &form).await.unwrap();

    let received = market.last_product_form().unwrap();
    assert_eq!(received.text("primary_image_index"), Some("1"));
}

#[tokio::test]
async fn test_create_product_invalidates_featured() {
    let market = FakeMarket::start().await.unwrap();
    let _ = market.add_seller("linus");
    let app = market.app("/seller/products/new");
    app.login("linus").await;
    app.state.api().featured_products().await.unwrap();
    app.state.api().featured_products().await.unwrap();
    assert_eq!(market.request_count("/api/products/featured/"), 1);

    flows::save_product(&app.state, None, &lamp_form())
        .await
        .unwrap();
    app.state.api().featured_products().await.unwrap();

    assert_eq!(market.request_count("/api/products/featured/"), 2);
}

#[tokio::test]
async fn test_update_product_invalidates_cached_detail() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let lamp = market.add_product(seller, "Lamp", 1000, 5);
    let path = format!("/api/products/{lamp}/");
    let app = market.app(&format!("/seller/products/{lamp}/edit"));
    app.login("linus").await;
    let before = app.state.api().get_product(lamp).await.unwrap();
    app.state.api().get_product(lamp).await.unwrap();
    assert_eq!(market.request_count(&path), 1);
    assert_eq!(before.title, "Lamp");

    let form = ProductForm {
        title: "Reading Lamp".to_string(),
        images: Vec::new(),
        ..lamp_form()
    };
    flows::save_product(&app.state, Some(lamp), &form)
        .await
        .unwrap();

    // No images were sent, so the form carries no primary index either
    let received = market.last_product_form().unwrap();
    assert!(received.files_named("images").is_empty());
    assert_eq!(received.text("primary_image_index"), None);

    let after = app.state.api().get_product(lamp).await.unwrap();
    assert_eq!(market.request_count(&path), 3);
    assert_eq!(after.title, "Reading Lamp");
    assert_eq!(after.discount_price, Some(Money::from_cents(999)));
    assert_eq!(after.final_price, Money::from_cents(999));
}

#[tokio::test]
async fn test_other_sellers_cannot_update() {
    let market = FakeMarket::start().await.unwrap();
    let owner = market.add_seller("linus");
    let _ = market.add_seller("grace");
    let lamp = market.add_product(owner, "Lamp", 1000, 5);
    let app = market.app("/seller/products");
    app.login("grace").await;

    let failure = flows::save_product(&app.state, Some(lamp), &lamp_form())
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::Forbidden);
    assert_eq!(app.navigator.current_location(), "/seller/products");
}

#[tokio::test]
async fn test_upload_image_marks_primary() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let lamp = market.add_product(seller, "Lamp", 1000, 5);
    let app = market.app("/seller/products");
    app.login("linus").await;
    assert!(app.state.api().get_product(lamp).await.unwrap().images.is_empty());

    let image = app
        .state
        .api()
        .upload_product_image(lamp, &png("side.png", 64), true)
        .await
        .unwrap();

    let received = market.last_product_form().unwrap();
    assert_eq!(received.text("is_primary"), Some("true"));
    assert_eq!(received.files_named("image")[0].size, 64);
    assert!(image.is_primary);
    assert_eq!(image.image, "/media/products/side.png");

    let detail = app.state.api().get_product(lamp).await.unwrap();
    assert_eq!(detail.primary_image().unwrap().id, image.id);
}

// ============================================================================
// Reviews
// ============================================================================

#[tokio::test]
async fn test_buyer_reviews_then_edits_and_deletes() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let _ = market.add_buyer("ada");
    let lamp = market.add_product(seller, "Lamp", 1000, 5);
    let app = market.app(&format!("/products/{lamp}"));
    app.login("ada").await;
    let mut notes = app.state.notifier().subscribe();

    let posted = flows::submit_review(&app.state, &review(lamp, 5, "Bright"))
        .await
        .unwrap();
    assert_eq!(notes.recv().await.unwrap().message, "Review submitted successfully");
    assert_eq!(posted.buyer_name, "ada");

    let failure = flows::submit_review(&app.state, &review(lamp, 4, "Again"))
        .await
        .unwrap_err();
    assert_eq!(failure.message, "You have already reviewed this product.");
    let _ = notes.recv().await.unwrap();

    let updated = flows::update_review(&app.state, posted.id, &review(lamp, 2, "Flickers"))
        .await
        .unwrap();
    assert_eq!(notes.recv().await.unwrap().message, "Review updated");
    assert_eq!(updated.id, posted.id);
    assert_eq!(updated.rating, 2);

    let listed = app.state.api().list_reviews(lamp).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].comment, "Flickers");

    flows::delete_review(&app.state, posted.id).await.unwrap();
    assert!(app.state.api().list_reviews(lamp).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_review_update_rules() {
    let market = FakeMarket::start().await.unwrap();
    let seller = market.add_seller("linus");
    let _ = market.add_buyer("ada");
    let _ = market.add_buyer("bob");
    let lamp = market.add_product(seller, "Lamp", 1000, 5);
    let author = market.app("/");
    author.login("ada").await;
    let posted = flows::submit_review(&author.state, &review(lamp, 5, "Bright"))
        .await
        .unwrap();

    // Out-of-range ratings never leave the client
    let puts = market.request_count(&format!("/api/reviews/{}/", posted.id));
    let failure = flows::update_review(&author.state, posted.id, &review(lamp, 6, ""))
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::Validation);
    assert_eq!(
        market.request_count(&format!("/api/reviews/{}/", posted.id)),
        puts
    );

    let other = market.app("/");
    other.login("bob").await;
    let failure = flows::update_review(&other.state, posted.id, &review(lamp, 1, "Dim"))
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::Forbidden);
    assert_eq!(failure.message, "You can only edit your own reviews.");

    let listed = author.state.api().list_reviews(lamp).await.unwrap();
    assert_eq!(listed[0].rating, 5);
}
