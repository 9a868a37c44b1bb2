//! Integration tests for the Planet Price client.
//!
//! [`FakeMarket`] is an in-process stand-in for the marketplace REST API,
//! served by axum on an ephemeral port. Tests drive the real gateway and
//! stores against it and inspect what the server saw.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p planet-price-integration-tests
//! ```

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use planet_price_core::{ProductId, UserId};
use planet_price_storefront::api::REQUEST_ID_HEADER;
use planet_price_storefront::api::types::{CartSnapshot, Credentials, Identity};
use planet_price_storefront::config::ClientConfig;
use planet_price_storefront::navigation::MemoryNavigator;
use planet_price_storefront::state::AppState;
use planet_price_storefront::storage::MemoryCredentialStore;

/// Password given to every seeded account.
pub const PASSWORD: &str = "correct horse";

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Fake Marketplace
// =============================================================================

/// A request as seen by the fake server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
}

/// A multipart product form as decoded by the fake server.
#[derive(Debug, Clone, Default)]
pub struct ReceivedForm {
    pub fields: BTreeMap<String, String>,
    pub files: Vec<ReceivedFile>,
}

impl ReceivedForm {
    /// Value of a text field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Files sent under `field`, in order.
    #[must_use]
    pub fn files_named(&self, field: &str) -> Vec<&ReceivedFile> {
        self.files.iter().filter(|f| f.field == field).collect()
    }
}

/// A file part of a [`ReceivedForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Clone)]
struct Account {
    id: i64,
    username: String,
    email: String,
    password: String,
    role: &'static str,
    seller_approved: bool,
    is_superuser: bool,
}

#[derive(Debug, Clone)]
struct ProductRow {
    id: i64,
    title: String,
    description: String,
    category: Option<i64>,
    price_cents: i64,
    discount_cents: Option<i64>,
    stock: i64,
    seller: i64,
    approved: bool,
    featured: bool,
    images: Vec<ImageRow>,
}

#[derive(Debug, Clone)]
struct ImageRow {
    id: i64,
    url: String,
    primary: bool,
}

#[derive(Debug, Clone)]
struct ReviewRow {
    id: i64,
    product: i64,
    buyer: i64,
    rating: i64,
    comment: String,
}

#[derive(Debug, Clone)]
struct Line {
    id: i64,
    product: i64,
    quantity: i64,
}

#[derive(Debug, Clone)]
struct OrderRow {
    id: i64,
    buyer: i64,
    status: String,
    shipping_address: String,
    shipping_phone: String,
    /// (product, title, quantity, unit price in cents)
    items: Vec<(i64, String, i64, i64)>,
}

#[derive(Debug, Default)]
struct MarketData {
    next_id: i64,
    accounts: BTreeMap<i64, Account>,
    tokens: HashMap<String, i64>,
    products: BTreeMap<i64, ProductRow>,
    carts: HashMap<i64, Vec<Line>>,
    wishlists: HashMap<i64, Vec<i64>>,
    orders: BTreeMap<i64, OrderRow>,
    reviews: BTreeMap<i64, ReviewRow>,
    product_forms: Vec<ReceivedForm>,
    requests: Vec<RecordedRequest>,
}

impl MarketData {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_token(&mut self, user: i64) -> String {
        let token = format!("tok-{user}-{}", self.next_id());
        self.tokens.insert(token.clone(), user);
        token
    }

    fn add_account(&mut self, username: &str, role: &'static str, superuser: bool) -> i64 {
        let id = self.next_id();
        self.accounts.insert(
            id,
            Account {
                id,
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: PASSWORD.to_string(),
                role,
                seller_approved: role == "seller",
                is_superuser: superuser,
            },
        );
        id
    }

    fn account_for(&self, headers: &HeaderMap) -> Result<&Account, Response> {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Token "))
            .and_then(|token| self.tokens.get(token))
            .and_then(|id| self.accounts.get(id))
            .ok_or_else(|| reply(StatusCode::UNAUTHORIZED, json!({"detail": "Invalid token."})))
    }

    fn buyer_for(&self, headers: &HeaderMap) -> Result<i64, Response> {
        let account = self.account_for(headers)?;
        if account.role == "buyer" {
            Ok(account.id)
        } else {
            Err(reply(
                StatusCode::FORBIDDEN,
                json!({"detail": "Only buyers can use the cart."}),
            ))
        }
    }

    fn seller_for(&self, headers: &HeaderMap) -> Result<i64, Response> {
        let account = self.account_for(headers)?;
        if account.role == "seller" && account.seller_approved {
            Ok(account.id)
        } else {
            Err(reply(
                StatusCode::FORBIDDEN,
                json!({"detail": "Only approved sellers can manage products."}),
            ))
        }
    }

    fn identity_json(&self, id: i64) -> Value {
        self.accounts.get(&id).map_or(Value::Null, |account| {
            json!({
                "id": account.id,
                "username": account.username,
                "email": account.email,
                "first_name": "",
                "last_name": "",
                "role": account.role,
                "seller_approved": account.seller_approved,
                "is_superuser": account.is_superuser,
            })
        })
    }

    fn auth_json(&mut self, user: i64) -> Value {
        let token = self.issue_token(user);
        json!({"user": self.identity_json(user), "token": token})
    }

    fn product_summary(&self, product: &ProductRow) -> Value {
        let seller_name = self
            .accounts
            .get(&product.seller)
            .map(|a| a.username.clone())
            .unwrap_or_default();
        json!({
            "id": product.id,
            "title": product.title,
            "slug": product.title.to_lowercase().replace(' ', "-"),
            "price": money(product.price_cents),
            "discount_price": null,
            "final_price": money(product.price_cents),
            "discount_percentage": 0,
            "stock": product.stock,
            "is_active": true,
            "is_approved": product.approved,
            "is_featured": product.featured,
            "seller_name": seller_name,
            "average_rating": 0.0,
            "review_count": 0,
        })
    }

    fn product_detail(&self, product: &ProductRow) -> Value {
        let category = product
            .category
            .map(|id| json!({"id": id, "name": "Kitchen", "slug": "kitchen"}));
        let review_count = self
            .reviews
            .values()
            .filter(|r| r.product == product.id)
            .count();
        json!({
            "id": product.id,
            "seller": self.identity_json(product.seller),
            "category": category,
            "title": product.title,
            "slug": product.title.to_lowercase().replace(' ', "-"),
            "description": product.description,
            "price": money(product.price_cents),
            "discount_price": product.discount_cents.map(money),
            "final_price": money(product.discount_cents.unwrap_or(product.price_cents)),
            "stock": product.stock,
            "is_active": true,
            "is_featured": product.featured,
            "images": product.images.iter().map(image_json).collect::<Vec<_>>(),
            "review_count": review_count,
        })
    }

    /// Representation returned by product create/update.
    fn product_record(product: &ProductRow) -> Value {
        json!({
            "id": product.id,
            "category": product.category,
            "title": product.title,
            "description": product.description,
            "price": money(product.price_cents),
            "discount_price": product.discount_cents.map(money),
            "stock": product.stock,
            "is_active": true,
            "is_featured": product.featured,
            "image_urls": product.images.iter().map(image_json).collect::<Vec<_>>(),
        })
    }

    /// Turn the `images` parts of `form` into stored images.
    fn image_rows(&mut self, form: &ReceivedForm) -> Vec<ImageRow> {
        let primary = form
            .text("primary_image_index")
            .and_then(|i| i.parse::<usize>().ok())
            .unwrap_or_default();
        form.files_named("images")
            .into_iter()
            .enumerate()
            .map(|(n, file)| ImageRow {
                id: self.next_id(),
                url: format!("/media/products/{}", file.file_name),
                primary: n == primary,
            })
            .collect()
    }

    fn review_json(&self, review: &ReviewRow) -> Value {
        let buyer_name = self
            .accounts
            .get(&review.buyer)
            .map(|a| a.username.clone())
            .unwrap_or_default();
        let product_title = self
            .products
            .get(&review.product)
            .map(|p| p.title.clone())
            .unwrap_or_default();
        json!({
            "id": review.id,
            "product": review.product,
            "buyer": review.buyer,
            "buyer_name": buyer_name,
            "product_title": product_title,
            "rating": review.rating,
            "comment": review.comment,
            "is_verified_purchase": false,
        })
    }

    fn cart_json(&self, user: i64) -> Value {
        let lines = self.carts.get(&user).map(Vec::as_slice).unwrap_or_default();
        let mut total_items = 0;
        let mut total_cents = 0;
        let items: Vec<Value> = lines
            .iter()
            .filter_map(|line| {
                let product = self.products.get(&line.product)?;
                total_items += line.quantity;
                total_cents += product.price_cents * line.quantity;
                Some(json!({
                    "id": line.id,
                    "product": product.id,
                    "product_title": product.title,
                    "product_price": money(product.price_cents),
                    "product_stock": product.stock,
                    "quantity": line.quantity,
                    "subtotal": money(product.price_cents * line.quantity),
                }))
            })
            .collect();
        json!({
            "id": user,
            "items": items,
            "total_items": total_items,
            "total_amount": money(total_cents),
        })
    }

    fn wishlist_json(&self, user: i64) -> Value {
        let products: Vec<Value> = self
            .wishlists
            .get(&user)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.products.get(id))
            .map(|product| self.product_summary(product))
            .collect();
        json!({"id": user, "products": products})
    }

    fn order_json(&self, order: &OrderRow) -> Value {
        let items: Vec<Value> = order
            .items
            .iter()
            .enumerate()
            .map(|(n, (product, title, quantity, price))| {
                json!({
                    "id": order.id * 100 + i64::try_from(n).unwrap_or_default(),
                    "product": product,
                    "product_title": title,
                    "quantity": quantity,
                    "price": money(*price),
                    "subtotal": money(price * quantity),
                })
            })
            .collect();
        let total: i64 = order.items.iter().map(|(_, _, q, p)| q * p).sum();
        json!({
            "id": order.id,
            "order_number": format!("ORD-{:06}", order.id),
            "buyer": order.buyer,
            "status": order.status,
            "total_amount": money(total),
            "shipping_address": order.shipping_address,
            "shipping_phone": order.shipping_phone,
            "items": items,
        })
    }
}

struct Market {
    data: Mutex<MarketData>,
    cart_delay: Mutex<Duration>,
    cart_in_flight: AtomicUsize,
    cart_max_in_flight: AtomicUsize,
}

type Shared = Arc<Market>;

impl Market {
    fn lock(&self) -> MutexGuard<'_, MarketData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count an in-progress cart mutation and apply the configured delay.
    async fn enter_cart_mutation(self: &Arc<Self>) -> CartFlight {
        let now = self.cart_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.cart_max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.cart_delay.lock().unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        CartFlight(Arc::clone(self))
    }
}

struct CartFlight(Shared);

impl Drop for CartFlight {
    fn drop(&mut self) {
        self.0.cart_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-process fake of the marketplace API.
///
/// The server stops when this value is dropped.
pub struct FakeMarket {
    addr: SocketAddr,
    market: Shared,
    server: JoinHandle<()>,
}

impl Drop for FakeMarket {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl FakeMarket {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let market = Arc::new(Market {
            data: Mutex::new(MarketData::default()),
            cart_delay: Mutex::new(Duration::ZERO),
            cart_in_flight: AtomicUsize::new(0),
            cart_max_in_flight: AtomicUsize::new(0),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(Arc::clone(&market));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            market,
            server,
        })
    }

    /// Origin to configure the client with.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this server.
    ///
    /// # Panics
    ///
    /// Never in practice; the origin is always a valid URL.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::for_api(&self.url(), PathBuf::new()).unwrap()
    }

    /// Start a client at `location` with an empty credential store.
    #[must_use]
    pub fn app(&self, location: &str) -> TestApp {
        self.app_with(Arc::new(MemoryCredentialStore::new()), location)
    }

    /// Start a client at `location` over existing credentials.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn app_with(&self, credentials: Arc<MemoryCredentialStore>, location: &str) -> TestApp {
        let navigator = Arc::new(MemoryNavigator::new(location));
        let state = AppState::new(self.config(), credentials.clone(), navigator.clone()).unwrap();
        TestApp {
            state,
            navigator,
            credentials,
        }
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Add a buyer account.
    #[must_use]
    pub fn add_buyer(&self, username: &str) -> UserId {
        UserId::new(self.market.lock().add_account(username, "buyer", false))
    }

    /// Add an approved seller account.
    #[must_use]
    pub fn add_seller(&self, username: &str) -> UserId {
        UserId::new(self.market.lock().add_account(username, "seller", false))
    }

    /// Add a seller awaiting approval.
    #[must_use]
    pub fn add_pending_seller(&self, username: &str) -> UserId {
        let mut data = self.market.lock();
        let id = data.add_account(username, "seller", false);
        if let Some(account) = data.accounts.get_mut(&id) {
            account.seller_approved = false;
        }
        UserId::new(id)
    }

    /// Add a superuser account.
    #[must_use]
    pub fn add_admin(&self, username: &str) -> UserId {
        UserId::new(self.market.lock().add_account(username, "buyer", true))
    }

    /// Add an approved product with a fixed ID, owned by `seller`.
    pub fn add_product_with_id(
        &self,
        id: i64,
        seller: UserId,
        title: &str,
        price_cents: i64,
        stock: i64,
    ) -> ProductId {
        let mut data = self.market.lock();
        data.next_id = data.next_id.max(id);
        data.products.insert(
            id,
            ProductRow {
                id,
                title: title.to_string(),
                description: format!("A fine {}", title.to_lowercase()),
                category: Some(1),
                price_cents,
                discount_cents: None,
                stock,
                seller: seller.as_i64(),
                approved: true,
                featured: false,
                images: Vec::new(),
            },
        );
        ProductId::new(id)
    }

    /// Add an approved product owned by `seller`.
    pub fn add_product(
        &self,
        seller: UserId,
        title: &str,
        price_cents: i64,
        stock: i64,
    ) -> ProductId {
        let id = self.market.lock().next_id() + 1;
        self.add_product_with_id(id, seller, title, price_cents, stock)
    }

    /// Add a product awaiting moderation.
    pub fn add_pending_product(&self, seller: UserId, title: &str) -> ProductId {
        let id = self.add_product(seller, title, 1000, 1);
        if let Some(product) = self.market.lock().products.get_mut(&id.as_i64()) {
            product.approved = false;
        }
        id
    }

    /// Put a line straight into a buyer's cart.
    pub fn seed_cart(&self, buyer: UserId, product: ProductId, quantity: i64) {
        let mut data = self.market.lock();
        let line = data.next_id();
        data.carts.entry(buyer.as_i64()).or_default().push(Line {
            id: line,
            product: product.as_i64(),
            quantity,
        });
    }

    /// Issue a token for `user` as if they had logged in elsewhere.
    #[must_use]
    pub fn issue_token(&self, user: UserId) -> String {
        self.market.lock().issue_token(user.as_i64())
    }

    /// The identity the API reports for `user`.
    ///
    /// # Panics
    ///
    /// Panics if `user` does not exist.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn identity(&self, user: UserId) -> Identity {
        serde_json::from_value(self.market.lock().identity_json(user.as_i64())).unwrap()
    }

    // =========================================================================
    // Control & Inspection
    // =========================================================================

    /// Invalidate every issued token.
    pub fn revoke_tokens(&self) {
        self.market.lock().tokens.clear();
    }

    /// Make every cart mutation take at least `delay`.
    pub fn set_cart_delay(&self, delay: Duration) {
        *self
            .market
            .cart_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Highest number of cart mutations the server processed at once.
    #[must_use]
    pub fn max_concurrent_cart_mutations(&self) -> usize {
        self.market.cart_max_in_flight.load(Ordering::SeqCst)
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.market.lock().requests.clone()
    }

    /// Number of requests received for `path` (e.g. `/api/cart/`).
    #[must_use]
    pub fn request_count(&self, path: &str) -> usize {
        self.market
            .lock()
            .requests
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// Quantity of `product` in a buyer's server-side cart.
    #[must_use]
    pub fn cart_quantity(&self, buyer: UserId, product: ProductId) -> i64 {
        self.market
            .lock()
            .carts
            .get(&buyer.as_i64())
            .map(|lines| {
                lines
                    .iter()
                    .filter(|l| l.product == product.as_i64())
                    .map(|l| l.quantity)
                    .sum()
            })
            .unwrap_or_default()
    }

    /// The most recent multipart product form the server decoded.
    #[must_use]
    pub fn last_product_form(&self) -> Option<ReceivedForm> {
        self.market.lock().product_forms.last().cloned()
    }

    /// Whether the product still exists.
    #[must_use]
    pub fn has_product(&self, product: ProductId) -> bool {
        self.market.lock().products.contains_key(&product.as_i64())
    }
}

/// A running client wired to a [`FakeMarket`].
pub struct TestApp {
    pub state: AppState,
    pub navigator: Arc<MemoryNavigator>,
    pub credentials: Arc<MemoryCredentialStore>,
}

impl TestApp {
    /// Sign in as a seeded account.
    ///
    /// # Panics
    ///
    /// Panics if the login is rejected.
    #[allow(clippy::unwrap_used)]
    pub async fn login(&self, username: &str) -> Identity {
        self.state
            .session()
            .login(&Credentials {
                username: username.to_string(),
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap()
    }

    /// Wait until the cart mirror holds a snapshot matching `pred`.
    pub async fn wait_for_cart(&self, mut pred: impl FnMut(&CartSnapshot) -> bool) -> bool {
        let mut rx = self.state.cart().subscribe();
        wait_for(&mut rx, |cart| cart.as_ref().is_some_and(&mut pred)).await
    }
}

/// Wait until the watched value satisfies `pred`.
///
/// Returns false on timeout or if the sender went away.
pub async fn wait_for<T>(rx: &mut watch::Receiver<T>, pred: impl FnMut(&T) -> bool) -> bool {
    matches!(
        tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(pred)).await,
        Ok(Ok(_))
    )
}

fn money(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

fn image_json(image: &ImageRow) -> Value {
    json!({"id": image.id, "image": image.url, "is_primary": image.primary, "order": 0})
}

/// Parse a decimal amount such as `12.5` into cents.
fn parse_cents(text: &str) -> Option<i64> {
    let text = text.trim();
    let (whole, frac) = text.split_once('.').unwrap_or((text, "0"));
    let frac = format!("{frac:0<2}");
    let whole: i64 = whole.parse().ok()?;
    let frac: i64 = frac.get(..2)?.parse().ok()?;
    Some(whole * 100 + frac)
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

// =============================================================================
// Routes
// =============================================================================

fn router(market: Shared) -> Router {
    let api = Router::new()
        .route("/auth/login/", post(login))
        .route("/auth/register/", post(register))
        .route("/auth/logout/", post(logout))
        .route("/auth/user/", get(current_user))
        .route("/auth/apply-seller/", post(apply_seller))
        .route("/categories/", get(categories))
        .route("/products/", get(products).post(create_product))
        .route("/products/featured/", get(featured))
        .route(
            "/products/{id}/",
            get(product).put(update_product).delete(delete_product),
        )
        .route("/products/{id}/upload_image/", post(upload_image))
        .route("/reviews/", get(reviews).post(create_review))
        .route("/reviews/{id}/", put(update_review).delete(delete_review))
        .route("/cart/", get(cart))
        .route("/cart/add/", post(cart_add))
        .route("/cart/update/", patch(cart_update))
        .route("/cart/remove/", delete(cart_remove))
        .route("/cart/clear/", post(cart_clear))
        .route("/wishlist/", get(wishlist))
        .route("/wishlist/add/", post(wishlist_add))
        .route("/wishlist/remove/", delete(wishlist_remove))
        .route("/orders/", get(orders).post(create_order))
        .route("/orders/{id}/", get(order))
        .route("/orders/{id}/update_status/", patch(update_order_status))
        .route("/admin/list_users/", get(list_users))
        .route("/admin/{id}/approve_seller/", post(approve_seller))
        .route("/admin/pending_products/", get(pending_products))
        .route("/admin/products/{id}/approve/", post(approve_product))
        .route("/admin/products/{id}/reject/", post(reject_product))
        .route("/seller/dashboard/", get(seller_dashboard));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(market.clone(), record))
        .with_state(market)
}

async fn record(State(market): State<Shared>, request: Request, next: Next) -> Response {
    let entry = {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        RecordedRequest {
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            authorization: header(AUTHORIZATION.as_str()),
            request_id: header(REQUEST_ID_HEADER),
        }
    };
    market.lock().requests.push(entry);
    next.run(request).await
}

fn field<'a>(body: &'a Value, name: &str) -> &'a str {
    body.get(name).and_then(Value::as_str).unwrap_or_default()
}

fn number(body: &Value, name: &str) -> Option<i64> {
    body.get(name).and_then(Value::as_i64)
}

// ----- Auth -----

async fn login(State(market): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut data = market.lock();
    let found = data
        .accounts
        .values()
        .find(|a| a.username == field(&body, "username") && a.password == field(&body, "password"))
        .map(|a| a.id);
    match found {
        Some(id) => reply(StatusCode::OK, data.auth_json(id)),
        None => reply(
            StatusCode::BAD_REQUEST,
            json!({"non_field_errors": ["Unable to log in with provided credentials."]}),
        ),
    }
}

async fn register(State(market): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut data = market.lock();
    let username = field(&body, "username");
    let email = field(&body, "email");
    if data.accounts.values().any(|a| a.username == username) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"username": ["A user with that username already exists."]}),
        );
    }
    if data.accounts.values().any(|a| a.email == email) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"email": ["user with this email already exists."]}),
        );
    }
    if field(&body, "password") != field(&body, "password_confirm") {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"password": ["Password fields didn't match."]}),
        );
    }
    let role = if field(&body, "role") == "seller" {
        "seller"
    } else {
        "buyer"
    };
    let id = data.add_account(username, role, false);
    if let Some(account) = data.accounts.get_mut(&id) {
        account.email = email.to_string();
        account.password = field(&body, "password").to_string();
        account.seller_approved = false;
    }
    reply(StatusCode::CREATED, data.auth_json(id))
}

async fn logout(State(market): State<Shared>, headers: HeaderMap) -> Response {
    let mut data = market.lock();
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Token "))
        .map(String::from);
    if let Some(token) = token {
        data.tokens.remove(&token);
    }
    reply(StatusCode::OK, json!({"message": "Logged out"}))
}

async fn current_user(State(market): State<Shared>, headers: HeaderMap) -> Response {
    let data = market.lock();
    match data.account_for(&headers) {
        Ok(account) => reply(StatusCode::OK, data.identity_json(account.id)),
        Err(response) => response,
    }
}

async fn apply_seller(State(market): State<Shared>, headers: HeaderMap) -> Response {
    let mut data = market.lock();
    let id = match data.account_for(&headers) {
        Ok(account) if account.role == "seller" => {
            return reply(
                StatusCode::BAD_REQUEST,
                json!({"message": "You are already a seller"}),
            );
        }
        Ok(account) => account.id,
        Err(response) => return response,
    };
    if let Some(account) = data.accounts.get_mut(&id) {
        account.role = "seller";
        account.seller_approved = false;
    }
    reply(
        StatusCode::OK,
        json!({
            "message": "Seller application submitted. Awaiting admin approval.",
            "user": data.identity_json(id),
        }),
    )
}

// ----- Catalog -----

async fn categories() -> Response {
    reply(
        StatusCode::OK,
        json!([{"id": 1, "name": "Kitchen", "slug": "kitchen", "subcategories": []}]),
    )
}

async fn products(
    State(market): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let data = market.lock();
    let search = query.get("search").map(|s| s.to_lowercase());
    let seller = query.get("seller").and_then(|s| s.parse::<i64>().ok());
    let results: Vec<Value> = data
        .products
        .values()
        .filter(|p| p.approved || seller == Some(p.seller))
        .filter(|p| seller.is_none_or(|s| s == p.seller))
        .filter(|p| {
            search
                .as_ref()
                .is_none_or(|s| p.title.to_lowercase().contains(s))
        })
        .map(|p| data.product_summary(p))
        .collect();
    reply(
        StatusCode::OK,
        json!({"count": results.len(), "next": null, "previous": null, "results": results}),
    )
}

async fn featured(State(market): State<Shared>) -> Response {
    let data = market.lock();
    let results: Vec<Value> = data
        .products
        .values()
        .filter(|p| p.approved && p.featured)
        .map(|p| data.product_summary(p))
        .collect();
    reply(StatusCode::OK, json!(results))
}

async fn product(State(market): State<Shared>, Path(id): Path<i64>) -> Response {
    let data = market.lock();
    match data.products.get(&id) {
        Some(product) => reply(StatusCode::OK, data.product_detail(product)),
        None => reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
    }
}

async fn delete_product(
    State(market): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut data = market.lock();
    let user = match data.account_for(&headers) {
        Ok(account) => account.id,
        Err(response) => return response,
    };
    match data.products.get(&id) {
        Some(product) if product.seller == user => {
            data.products.remove(&id);
            StatusCode::NO_CONTENT.into_response()
        }
        Some(_) => reply(StatusCode::FORBIDDEN, json!({"detail": "Not your product."})),
        None => reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
    }
}

async fn read_form(mut multipart: Multipart) -> Result<ReceivedForm, Response> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        reply(StatusCode::BAD_REQUEST, json!({"detail": e.body_text()}))
    };
    let mut form = ReceivedForm::default();
    while let Some(part) = multipart.next_field().await.map_err(malformed)? {
        let name = part.name().unwrap_or_default().to_string();
        match part.file_name().map(String::from) {
            Some(file_name) => {
                let content_type = part.content_type().unwrap_or_default().to_string();
                let bytes = part.bytes().await.map_err(malformed)?;
                form.files.push(ReceivedFile {
                    field: name,
                    file_name,
                    content_type,
                    size: bytes.len(),
                });
            }
            None => {
                let text = part.text().await.map_err(malformed)?;
                form.fields.insert(name, text);
            }
        }
    }
    Ok(form)
}

async fn create_product(
    State(market): State<Shared>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let seller = match market.lock().seller_for(&headers) {
        Ok(seller) => seller,
        Err(response) => return response,
    };
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let mut data = market.lock();
    data.product_forms.push(form.clone());
    let title = form.text("title").unwrap_or_default().trim().to_string();
    if title.is_empty() {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"title": ["This field may not be blank."]}),
        );
    }
    let Some(price_cents) = form.text("price").and_then(parse_cents) else {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"price": ["A valid number is required."]}),
        );
    };

    let id = data.next_id();
    let images = data.image_rows(&form);
    let product = ProductRow {
        id,
        title,
        description: form.text("description").unwrap_or_default().to_string(),
        category: form.text("category").and_then(|c| c.parse().ok()),
        price_cents,
        discount_cents: form.text("discount_price").and_then(parse_cents),
        stock: form
            .text("stock")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        seller,
        approved: false,
        featured: form.text("is_featured") == Some("true"),
        images,
    };
    let json = MarketData::product_record(&product);
    data.products.insert(id, product);
    reply(StatusCode::CREATED, json)
}

async fn update_product(
    State(market): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Response {
    let seller = match market.lock().seller_for(&headers) {
        Ok(seller) => seller,
        Err(response) => return response,
    };
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let mut data = market.lock();
    data.product_forms.push(form.clone());
    let images = data.image_rows(&form);
    let Some(product) = data.products.get_mut(&id) else {
        return reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."}));
    };
    if product.seller != seller {
        return reply(StatusCode::FORBIDDEN, json!({"detail": "Not your product."}));
    }
    if let Some(title) = form.text("title") {
        product.title = title.trim().to_string();
    }
    if let Some(description) = form.text("description") {
        product.description = description.to_string();
    }
    if let Some(price) = form.text("price").and_then(parse_cents) {
        product.price_cents = price;
    }
    product.discount_cents = form.text("discount_price").and_then(parse_cents);
    if let Some(stock) = form.text("stock").and_then(|s| s.parse().ok()) {
        product.stock = stock;
    }
    if let Some(category) = form.text("category").and_then(|c| c.parse().ok()) {
        product.category = Some(category);
    }
    product.featured = form.text("is_featured") == Some("true");
    if !images.is_empty() {
        product.images = images;
    }
    let json = MarketData::product_record(product);
    reply(StatusCode::OK, json)
}

async fn upload_image(
    State(market): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Response {
    let seller = match market.lock().seller_for(&headers) {
        Ok(seller) => seller,
        Err(response) => return response,
    };
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let mut data = market.lock();
    data.product_forms.push(form.clone());
    let Some(file) = form.files_named("image").into_iter().next().cloned() else {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"image": ["No file was submitted."]}),
        );
    };
    let image_id = data.next_id();
    let Some(product) = data.products.get_mut(&id) else {
        return reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."}));
    };
    if product.seller != seller {
        return reply(StatusCode::FORBIDDEN, json!({"detail": "Not your product."}));
    }
    let primary = form.text("is_primary") == Some("true");
    if primary {
        for image in &mut product.images {
            image.primary = false;
        }
    }
    let image = ImageRow {
        id: image_id,
        url: format!("/media/products/{}", file.file_name),
        primary,
    };
    let json = image_json(&image);
    product.images.push(image);
    reply(StatusCode::CREATED, json)
}

// ----- Reviews -----

async fn reviews(
    State(market): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let data = market.lock();
    let product = query.get("product").and_then(|p| p.parse::<i64>().ok());
    let results: Vec<Value> = data
        .reviews
        .values()
        .filter(|r| product.is_none_or(|p| p == r.product))
        .map(|r| data.review_json(r))
        .collect();
    reply(
        StatusCode::OK,
        json!({"count": results.len(), "next": null, "previous": null, "results": results}),
    )
}

async fn create_review(
    State(market): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = market.lock();
    let buyer = match data.buyer_for(&headers) {
        Ok(buyer) => buyer,
        Err(response) => return response,
    };
    let product = number(&body, "product").unwrap_or_default();
    let rating = number(&body, "rating").unwrap_or_default();
    if !data.products.contains_key(&product) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"product": ["Invalid pk - object does not exist."]}),
        );
    }
    if !(1..=5).contains(&rating) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"rating": ["Ensure this value is between 1 and 5."]}),
        );
    }
    if data
        .reviews
        .values()
        .any(|r| r.product == product && r.buyer == buyer)
    {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"non_field_errors": ["You have already reviewed this product."]}),
        );
    }
    let id = data.next_id();
    let review = ReviewRow {
        id,
        product,
        buyer,
        rating,
        comment: field(&body, "comment").to_string(),
    };
    let json = data.review_json(&review);
    data.reviews.insert(id, review);
    reply(StatusCode::CREATED, json)
}

async fn update_review(
    State(market): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut data = market.lock();
    let user = match data.account_for(&headers) {
        Ok(account) => account.id,
        Err(response) => return response,
    };
    let rating = number(&body, "rating").unwrap_or_default();
    if !(1..=5).contains(&rating) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"rating": ["Ensure this value is between 1 and 5."]}),
        );
    }
    let Some(review) = data.reviews.get_mut(&id) else {
        return reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."}));
    };
    if review.buyer != user {
        return reply(
            StatusCode::FORBIDDEN,
            json!({"detail": "You can only edit your own reviews."}),
        );
    }
    review.rating = rating;
    review.comment = field(&body, "comment").to_string();
    let updated = review.clone();
    reply(StatusCode::OK, data.review_json(&updated))
}

async fn delete_review(
    State(market): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut data = market.lock();
    let user = match data.account_for(&headers) {
        Ok(account) => account.id,
        Err(response) => return response,
    };
    match data.reviews.get(&id) {
        Some(review) if review.buyer == user => {
            data.reviews.remove(&id);
            StatusCode::NO_CONTENT.into_response()
        }
        Some(_) => reply(
            StatusCode::FORBIDDEN,
            json!({"detail": "You can only delete your own reviews."}),
        ),
        None => reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
    }
}

// ----- Cart -----

async fn cart(State(market): State<Shared>, headers: HeaderMap) -> Response {
    let data = market.lock();
    match data.buyer_for(&headers) {
        Ok(buyer) => reply(StatusCode::OK, data.cart_json(buyer)),
        Err(response) => response,
    }
}

async fn cart_add(
    State(market): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let buyer = match market.lock().buyer_for(&headers) {
        Ok(buyer) => buyer,
        Err(response) => return response,
    };
    let _flight = market.enter_cart_mutation().await;
    let mut data = market.lock();
    let product_id = number(&body, "product_id").unwrap_or_default();
    let quantity = number(&body, "quantity").unwrap_or(1);
    let Some(stock) = data.products.get(&product_id).map(|p| p.stock) else {
        return reply(StatusCode::NOT_FOUND, json!({"error": "Product not found"}));
    };

    let existing = data
        .carts
        .get(&buyer)
        .and_then(|lines| lines.iter().find(|l| l.product == product_id))
        .map_or(0, |l| l.quantity);
    if existing + quantity > stock {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"error": format!("Only {stock} items available")}),
        );
    }

    let line_id = data.next_id();
    let lines = data.carts.entry(buyer).or_default();
    match lines.iter_mut().find(|l| l.product == product_id) {
        Some(line) => line.quantity += quantity,
        None => lines.push(Line {
            id: line_id,
            product: product_id,
            quantity,
        }),
    }
    reply(StatusCode::OK, data.cart_json(buyer))
}

async fn cart_update(
    State(market): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let buyer = match market.lock().buyer_for(&headers) {
        Ok(buyer) => buyer,
        Err(response) => return response,
    };
    let _flight = market.enter_cart_mutation().await;
    let mut data = market.lock();
    let item_id = number(&body, "item_id").unwrap_or_default();
    let quantity = number(&body, "quantity").unwrap_or_default();
    let Some(product) = data
        .carts
        .get(&buyer)
        .and_then(|lines| lines.iter().find(|l| l.id == item_id))
        .map(|l| l.product)
    else {
        return reply(StatusCode::NOT_FOUND, json!({"error": "Item not found"}));
    };
    let stock = data.products.get(&product).map_or(0, |p| p.stock);
    if quantity > stock {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"error": format!("Only {stock} items available")}),
        );
    }
    if let Some(line) = data
        .carts
        .get_mut(&buyer)
        .and_then(|lines| lines.iter_mut().find(|l| l.id == item_id))
    {
        line.quantity = quantity;
    }
    reply(StatusCode::OK, data.cart_json(buyer))
}

async fn cart_remove(
    State(market): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let buyer = match market.lock().buyer_for(&headers) {
        Ok(buyer) => buyer,
        Err(response) => return response,
    };
    let _flight = market.enter_cart_mutation().await;
    let mut data = market.lock();
    let item_id = number(&body, "item_id").unwrap_or_default();
    let lines = data.carts.entry(buyer).or_default();
    let before = lines.len();
    lines.retain(|l| l.id != item_id);
    if lines.len() == before {
        return reply(StatusCode::NOT_FOUND, json!({"error": "Item not found"}));
    }
    reply(StatusCode::OK, data.cart_json(buyer))
}

async fn cart_clear(State(market): State<Shared>, headers: HeaderMap) -> Response {
    let buyer = match market.lock().buyer_for(&headers) {
        Ok(buyer) => buyer,
        Err(response) => return response,
    };
    let _flight = market.enter_cart_mutation().await;
    let mut data = market.lock();
    data.carts.remove(&buyer);
    reply(StatusCode::OK, data.cart_json(buyer))
}

// ----- Wishlist -----

async fn wishlist(State(market): State<Shared>, headers: HeaderMap) -> Response {
    let data = market.lock();
    match data.account_for(&headers) {
        Ok(account) => reply(StatusCode::OK, data.wishlist_json(account.id)),
        Err(response) => response,
    }
}

async fn wishlist_add(
    State(market): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = market.lock();
    let user = match data.account_for(&headers) {
        Ok(account) => account.id,
        Err(response) => return response,
    };
    let product = number(&body, "product_id").unwrap_or_default();
    if !data.products.contains_key(&product) {
        return reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."}));
    }
    let list = data.wishlists.entry(user).or_default();
    if !list.contains(&product) {
        list.push(product);
    }
    reply(StatusCode::OK, data.wishlist_json(user))
}

async fn wishlist_remove(
    State(market): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = market.lock();
    let user = match data.account_for(&headers) {
        Ok(account) => account.id,
        Err(response) => return response,
    };
    let product = number(&body, "product_id").unwrap_or_default();
    data.wishlists.entry(user).or_default().retain(|p| *p != product);
    reply(StatusCode::OK, data.wishlist_json(user))
}

// ----- Orders -----

async fn orders(State(market): State<Shared>, headers: HeaderMap) -> Response {
    let data = market.lock();
    let user = match data.account_for(&headers) {
        Ok(account) => account.id,
        Err(response) => return response,
    };
    let results: Vec<Value> = data
        .orders
        .values()
        .filter(|o| o.buyer == user)
        .map(|o| data.order_json(o))
        .collect();
    reply(StatusCode::OK, json!(results))
}

async fn order(
    State(market): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let data = market.lock();
    let user = match data.account_for(&headers) {
        Ok(account) => account.id,
        Err(response) => return response,
    };
    match data.orders.get(&id).filter(|o| o.buyer == user) {
        Some(order) => reply(StatusCode::OK, data.order_json(order)),
        None => reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
    }
}

async fn create_order(
    State(market): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut data = market.lock();
    let buyer = match data.buyer_for(&headers) {
        Ok(buyer) => buyer,
        Err(response) => return response,
    };
    let lines = data.carts.remove(&buyer).unwrap_or_default();
    if lines.is_empty() {
        return reply(StatusCode::BAD_REQUEST, json!({"error": "Cart is empty"}));
    }
    let mut items = Vec::new();
    for line in &lines {
        if let Some(product) = data.products.get_mut(&line.product) {
            product.stock -= line.quantity;
            items.push((
                product.id,
                product.title.clone(),
                line.quantity,
                product.price_cents,
            ));
        }
    }
    let id = data.next_id();
    let order = OrderRow {
        id,
        buyer,
        status: "pending".to_string(),
        shipping_address: field(&body, "shipping_address").to_string(),
        shipping_phone: field(&body, "shipping_phone").to_string(),
        items,
    };
    let json = data.order_json(&order);
    data.orders.insert(id, order);
    reply(StatusCode::CREATED, json)
}

async fn update_order_status(
    State(market): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut data = market.lock();
    let seller = match data.account_for(&headers) {
        Ok(account) if account.role == "seller" => account.id,
        Ok(_) => return reply(StatusCode::FORBIDDEN, json!({"detail": "Sellers only."})),
        Err(response) => return response,
    };
    let owned = data
        .orders
        .get(&id)
        .filter(|order| {
            order
                .items
                .iter()
                .any(|(p, ..)| data.products.get(p).is_some_and(|p| p.seller == seller))
        })
        .cloned();
    let Some(order) = owned else {
        return reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."}));
    };
    let status = field(&body, "status").to_string();
    let updated = OrderRow { status, ..order };
    let json = data.order_json(&updated);
    data.orders.insert(id, updated);
    reply(StatusCode::OK, json)
}

// ----- Admin & Seller -----

fn require_admin(data: &MarketData, headers: &HeaderMap) -> Result<(), Response> {
    if data.account_for(headers)?.is_superuser {
        Ok(())
    } else {
        Err(reply(
            StatusCode::FORBIDDEN,
            json!({"detail": "You do not have permission to perform this action."}),
        ))
    }
}

async fn list_users(
    State(market): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let data = market.lock();
    if let Err(response) = require_admin(&data, &headers) {
        return response;
    }
    let pending = query.get("pending").is_some_and(|v| v == "true");
    let users: Vec<Value> = data
        .accounts
        .values()
        .filter(|a| !pending || (a.role == "seller" && !a.seller_approved))
        .map(|a| data.identity_json(a.id))
        .collect();
    reply(StatusCode::OK, json!(users))
}

async fn approve_seller(
    State(market): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut data = market.lock();
    if let Err(response) = require_admin(&data, &headers) {
        return response;
    }
    match data.accounts.get_mut(&id) {
        Some(account) if account.role == "seller" => account.seller_approved = true,
        Some(_) => return reply(StatusCode::BAD_REQUEST, json!({"error": "User is not a seller"})),
        None => return reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
    }
    reply(StatusCode::OK, data.identity_json(id))
}

async fn pending_products(State(market): State<Shared>, headers: HeaderMap) -> Response {
    let data = market.lock();
    if let Err(response) = require_admin(&data, &headers) {
        return response;
    }
    let results: Vec<Value> = data
        .products
        .values()
        .filter(|p| !p.approved)
        .map(|p| data.product_summary(p))
        .collect();
    reply(StatusCode::OK, json!(results))
}

async fn approve_product(
    State(market): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut data = market.lock();
    if let Err(response) = require_admin(&data, &headers) {
        return response;
    }
    match data.products.get_mut(&id) {
        Some(product) if product.approved => reply(
            StatusCode::BAD_REQUEST,
            json!({"message": "Product is already approved"}),
        ),
        Some(product) => {
            product.approved = true;
            reply(
                StatusCode::OK,
                json!({"status": "approved", "message": "Product approved successfully!"}),
            )
        }
        None => reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
    }
}

async fn reject_product(
    State(market): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut data = market.lock();
    if let Err(response) = require_admin(&data, &headers) {
        return response;
    }
    if data.products.remove(&id).is_some() {
        reply(
            StatusCode::OK,
            json!({"status": "rejected", "message": "Product rejected and removed"}),
        )
    } else {
        reply(StatusCode::NOT_FOUND, json!({"detail": "Not found."}))
    }
}

async fn seller_dashboard(State(market): State<Shared>, headers: HeaderMap) -> Response {
    let data = market.lock();
    let seller = match data.account_for(&headers) {
        Ok(account) if account.role == "seller" && account.seller_approved => account.id,
        Ok(_) => return reply(StatusCode::FORBIDDEN, json!({"detail": "Sellers only."})),
        Err(response) => return response,
    };
    let own: Vec<&ProductRow> = data.products.values().filter(|p| p.seller == seller).collect();
    reply(
        StatusCode::OK,
        json!({
            "total_products": own.len(),
            "active_products": own.len(),
            "total_orders": 0,
            "pending_orders": 0,
            "total_revenue": money(0),
        }),
    )
}
