//! Access guard decisions across a real sign-in.

#![allow(clippy::unwrap_used)]

use planet_price_integration_tests::FakeMarket;
use planet_price_storefront::guard::{AccessGuard, GuardDecision, Requirement, return_location};
use planet_price_storefront::navigation::Navigator;

#[tokio::test]
async fn test_login_redirect_then_resume() {
    let market = FakeMarket::start().await.unwrap();
    let _ = market.add_buyer("ada");
    let app = market.app("/cart");
    let nav = app.navigator.as_ref();

    app.state.session().bootstrap().await;
    let decision = AccessGuard::enforce(&app.state.session().state(), Requirement::Buyer, "/cart", nav);

    assert_eq!(
        decision,
        GuardDecision::RedirectToLogin {
            return_to: "/cart".to_string()
        }
    );
    assert_eq!(nav.current_location(), "/login?next=%2Fcart");

    app.login("ada").await;
    let resume = return_location(&nav.current_location()).unwrap();
    assert_eq!(resume, "/cart");
    nav.navigate(&resume);

    let decision = AccessGuard::enforce(&app.state.session().state(), Requirement::Buyer, &resume, nav);
    assert!(decision.is_authorized());
    assert_eq!(nav.current_location(), "/cart");
}

#[tokio::test]
async fn test_wrong_role_goes_home() {
    let market = FakeMarket::start().await.unwrap();
    let _ = market.add_seller("linus");
    let app = market.app("/cart");
    app.login("linus").await;

    let decision = AccessGuard::enforce(
        &app.state.session().state(),
        Requirement::Buyer,
        "/cart",
        app.navigator.as_ref(),
    );

    assert_eq!(decision, GuardDecision::RedirectToHome);
    assert_eq!(app.navigator.current_location(), "/");

    let decision = AccessGuard::evaluate(
        &app.state.session().state(),
        Requirement::Seller,
        "/seller/dashboard",
    );
    assert!(decision.is_authorized());
}

#[tokio::test]
async fn test_pending_session_renders_loading() {
    let market = FakeMarket::start().await.unwrap();
    let app = market.app("/orders");

    let decision = AccessGuard::enforce(
        &app.state.session().state(),
        Requirement::Authenticated,
        "/orders",
        app.navigator.as_ref(),
    );

    assert_eq!(decision, GuardDecision::Loading);
    assert_eq!(app.navigator.history(), vec!["/orders".to_string()]);
}
