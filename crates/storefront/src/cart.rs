//! Cart store: a local mirror of the buyer's server-side cart.
//!
//! The snapshot is only ever replaced wholesale by an API response; totals
//! are never recomputed locally. Mutations are single-flight. Each snapshot
//! write is tagged with the epoch it started in, and the epoch moves on
//! every discard, so a response that lands after logout is dropped.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, info, instrument, warn};

use planet_price_core::{CartItemId, Money, ProductId, UserId};

use crate::api::types::CartSnapshot;
use crate::api::{ApiClient, ApiError};
use crate::error::{ActionFailure, FailureKind, add_breadcrumb};
use crate::notify::Notifier;
use crate::session::SessionState;

const ADD_FAILED: &str = "Failed to add to cart";
const UPDATE_FAILED: &str = "Failed to update cart";
const REMOVE_FAILED: &str = "Failed to remove from cart";
const CLEAR_FAILED: &str = "Failed to clear cart";
const FETCH_FAILED: &str = "Failed to load cart";

/// Mirror of the current buyer's cart.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    api: ApiClient,
    notifier: Notifier,
    session: watch::Receiver<SessionState>,
    snapshot: watch::Sender<Option<CartSnapshot>>,
    /// Buyer the current snapshot belongs to.
    owner: Mutex<Option<UserId>>,
    epoch: AtomicU64,
    in_flight: AsyncMutex<()>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("epoch", &self.inner.epoch.load(Ordering::SeqCst))
            .field("item_count", &self.item_count())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create an empty store following `session`.
    #[must_use]
    pub fn new(api: ApiClient, notifier: Notifier, session: watch::Receiver<SessionState>) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            inner: Arc::new(CartInner {
                api,
                notifier,
                session,
                snapshot,
                owner: Mutex::new(None),
                epoch: AtomicU64::new(0),
                in_flight: AsyncMutex::new(()),
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The last-known cart, if the current session is a buyer's.
    #[must_use]
    pub fn snapshot(&self) -> Option<CartSnapshot> {
        let buyer = self.current_buyer()?;
        if *self.owner() != Some(buyer) {
            return None;
        }
        self.inner.snapshot.borrow().clone()
    }

    /// Total quantity across lines, as reported by the API.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.snapshot().map_or(0, |cart| cart.total_items)
    }

    /// Cart total, as reported by the API.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.snapshot().map_or(Money::ZERO, |cart| cart.total_amount)
    }

    /// Receive every snapshot change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<CartSnapshot>> {
        self.inner.snapshot.subscribe()
    }

    /// Current epoch. Moves forward whenever the cart is discarded.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Follow the session: fetch when a buyer appears, discard when they go.
    ///
    /// Discarding never touches the network. Fetch failures are logged only.
    #[instrument(skip(self))]
    pub async fn sync(&self) {
        let buyer = self.current_buyer();
        if !self.transition_to(buyer) {
            return;
        }
        if buyer.is_some() {
            let _flight = self.inner.in_flight.lock().await;
            if let Err(e) = self.fetch().await {
                warn!(error = %e, "Failed to fetch cart");
            }
        }
    }

    /// Re-fetch the cart, e.g. after checkout emptied it server-side.
    ///
    /// # Errors
    ///
    /// Returns a failure if nobody is signed in as a buyer or the request
    /// fails. No notification is shown.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), ActionFailure> {
        let _flight = self.inner.in_flight.lock().await;
        let Some(buyer) = self.current_buyer() else {
            return Err(ActionFailure::new(FailureKind::Unauthorized, FETCH_FAILED));
        };
        self.transition_to(Some(buyer));
        self.fetch().await.map_err(|e| {
            warn!(error = %e, "Failed to refresh cart");
            ActionFailure::from_api(&e, |body| body.error().map(String::from), FETCH_FAILED)
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of a product.
    ///
    /// # Errors
    ///
    /// Returns the API's `error` message, or "Failed to add to cart".
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ActionFailure> {
        let id = product_id.to_string();
        self.mutate(
            "Add item",
            &[("product_id", id.as_str())],
            ADD_FAILED,
            Some("Product added to cart!"),
            |api| async move { api.add_to_cart(product_id, quantity).await },
        )
        .await
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns the API's `error` message, or "Failed to update cart".
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update_item(&self, item_id: CartItemId, quantity: u32) -> Result<(), ActionFailure> {
        let id = item_id.to_string();
        self.mutate(
            "Update item",
            &[("item_id", id.as_str())],
            UPDATE_FAILED,
            None,
            |api| async move { api.update_cart_item(item_id, quantity).await },
        )
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns the API's `error` message, or "Failed to remove from cart".
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_item(&self, item_id: CartItemId) -> Result<(), ActionFailure> {
        let id = item_id.to_string();
        self.mutate(
            "Remove item",
            &[("item_id", id.as_str())],
            REMOVE_FAILED,
            Some("Product removed from cart"),
            |api| async move { api.remove_from_cart(item_id).await },
        )
        .await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns the API's `error` message, or "Failed to clear cart".
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), ActionFailure> {
        self.mutate(
            "Clear cart",
            &[],
            CLEAR_FAILED,
            Some("Cart cleared"),
            |api| async move { api.clear_cart().await },
        )
        .await
    }

    /// Run one mutation under the single-flight lock.
    ///
    /// On failure the previous snapshot is left exactly as it was. A response
    /// that lands after the buyer signed out is dropped and reported as
    /// `Unauthorized`, without a notification.
    async fn mutate<F, Fut>(
        &self,
        action: &str,
        data: &[(&str, &str)],
        fallback: &str,
        success: Option<&str>,
        call: F,
    ) -> Result<(), ActionFailure>
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<CartSnapshot, ApiError>>,
    {
        let _flight = self.inner.in_flight.lock().await;

        let Some(buyer) = self.current_buyer() else {
            debug!(action, "Cart mutation without a buyer session");
            self.inner.notifier.error(fallback);
            return Err(ActionFailure::new(FailureKind::Unauthorized, fallback));
        };
        self.transition_to(Some(buyer));

        add_breadcrumb("cart", action, data);
        let epoch = self.epoch();

        match call(self.inner.api.clone()).await {
            Ok(snapshot) => {
                if !self.apply(epoch, snapshot) {
                    // The buyer left while the call was in flight
                    return Err(ActionFailure::new(FailureKind::Unauthorized, fallback));
                }
                if let Some(message) = success {
                    self.inner.notifier.success(message);
                }
                Ok(())
            }
            Err(e) => {
                let failure =
                    ActionFailure::from_api(&e, |body| body.error().map(String::from), fallback);
                debug!(action, error = %e, "Cart mutation failed");
                self.inner.notifier.error(&failure.message);
                Err(failure)
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn current_buyer(&self) -> Option<UserId> {
        self.inner.session.borrow().buyer()
    }

    fn owner(&self) -> std::sync::MutexGuard<'_, Option<UserId>> {
        self.inner.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-home the snapshot to `buyer`. Returns true if ownership changed,
    /// in which case the old snapshot is gone and the epoch has moved.
    fn transition_to(&self, buyer: Option<UserId>) -> bool {
        {
            let mut owner = self.owner();
            if *owner == buyer {
                return false;
            }
            *owner = buyer;
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.snapshot.send_replace(None);
        if buyer.is_none() {
            info!("Cart discarded");
        }
        true
    }

    /// Call with the in-flight lock held.
    async fn fetch(&self) -> Result<(), ApiError> {
        let epoch = self.epoch();
        let snapshot = self.inner.api.get_cart().await?;
        self.apply(epoch, snapshot);
        Ok(())
    }

    /// Adopt `snapshot` unless the cart was discarded since `epoch`.
    fn apply(&self, epoch: u64, snapshot: CartSnapshot) -> bool {
        let applied = self.inner.snapshot.send_if_modified(|current| {
            if self.inner.epoch.load(Ordering::SeqCst) != epoch || self.current_buyer().is_none() {
                return false;
            }
            *current = Some(snapshot);
            true
        });
        if !applied {
            debug!(epoch, "Dropping stale cart response");
        }
        applied
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::types::{CartItem, Identity};
    use crate::config::ClientConfig;
    use crate::navigation::MemoryNavigator;
    use crate::storage::MemoryCredentialStore;
    use planet_price_core::{Email, Role};
    use std::path::PathBuf;

    fn identity(id: i64, role: Role) -> Identity {
        Identity {
            id: UserId::new(id),
            username: format!("user{id}"),
            email: Email::parse("user@example.com").unwrap(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            seller_approved: true,
            is_superuser: false,
            phone_number: None,
            address: None,
            profile_image: None,
            created_at: None,
        }
    }

    fn cart(total_items: u32, cents: i64) -> CartSnapshot {
        CartSnapshot {
            id: None,
            items: vec![CartItem {
                id: CartItemId::new(1),
                product: ProductId::new(42),
                product_title: "Kettle".to_string(),
                product_price: Money::from_cents(cents),
                product_image: None,
                product_stock: 10,
                quantity: total_items,
                subtotal: Money::from_cents(cents),
            }],
            total_items,
            total_amount: Money::from_cents(cents),
            updated_at: None,
        }
    }

    fn offline_cart() -> (CartStore, watch::Sender<SessionState>, Notifier) {
        let config = ClientConfig::for_api("http://127.0.0.1:9", PathBuf::new()).unwrap();
        let api = ApiClient::new(
            &config,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryNavigator::default()),
        )
        .unwrap();
        let (session, rx) = watch::channel(SessionState::SignedOut);
        let notifier = Notifier::new();
        (CartStore::new(api, notifier.clone(), rx), session, notifier)
    }

    #[test]
    fn test_empty_accessors_are_zero() {
        let (store, _session, _) = offline_cart();
        assert_eq!(store.snapshot(), None);
        assert_eq!(store.item_count(), 0);
        assert_eq!(store.total_amount(), Money::ZERO);
    }

    #[test]
    fn test_accessors_read_server_totals() {
        let (store, session, _) = offline_cart();
        session.send_replace(SessionState::Confirmed(identity(1, Role::Buyer)));
        store.transition_to(Some(UserId::new(1)));

        // Server says 5 even though the single line holds 2
        let mut snapshot = cart(5, 1250);
        snapshot.items.first_mut().unwrap().quantity = 2;
        assert!(store.apply(store.epoch(), snapshot));

        assert_eq!(store.item_count(), 5);
        assert_eq!(store.total_amount(), Money::from_cents(1250));
    }

    #[test]
    fn test_logout_hides_cart_immediately() {
        let (store, session, _) = offline_cart();
        session.send_replace(SessionState::Confirmed(identity(1, Role::Buyer)));
        store.transition_to(Some(UserId::new(1)));
        assert!(store.apply(store.epoch(), cart(2, 500)));

        session.send_replace(SessionState::SignedOut);

        assert_eq!(store.snapshot(), None);
        assert_eq!(store.item_count(), 0);
    }

    #[test]
    fn test_stale_response_after_discard_is_dropped() {
        let (store, session, _) = offline_cart();
        session.send_replace(SessionState::Confirmed(identity(1, Role::Buyer)));
        store.transition_to(Some(UserId::new(1)));
        let started = store.epoch();

        // Logout and log back in while the request is outstanding
        store.transition_to(None);
        store.transition_to(Some(UserId::new(1)));

        assert!(!store.apply(started, cart(3, 900)));
        assert_eq!(store.snapshot(), None);
    }

    #[test]
    fn test_user_switch_hides_previous_cart() {
        let (store, session, _) = offline_cart();
        session.send_replace(SessionState::Confirmed(identity(1, Role::Buyer)));
        store.transition_to(Some(UserId::new(1)));
        assert!(store.apply(store.epoch(), cart(2, 500)));

        session.send_replace(SessionState::Confirmed(identity(2, Role::Buyer)));

        assert_eq!(store.snapshot(), None);
    }

    #[tokio::test]
    async fn test_sync_discards_on_role_change_without_network() {
        let (store, session, _) = offline_cart();
        session.send_replace(SessionState::Confirmed(identity(1, Role::Buyer)));
        store.transition_to(Some(UserId::new(1)));
        assert!(store.apply(store.epoch(), cart(2, 500)));
        let before = store.epoch();

        session.send_replace(SessionState::Confirmed(identity(1, Role::Seller)));
        store.sync().await;

        assert_eq!(store.snapshot(), None);
        assert!(store.epoch() > before);
        assert_eq!(*store.subscribe().borrow(), None);
    }

    #[tokio::test]
    async fn test_mutation_without_buyer_is_refused() {
        let (store, _session, notifier) = offline_cart();
        let mut notes = notifier.subscribe();

        let failure = store.add_item(ProductId::new(42), 1).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Unauthorized);
        assert_eq!(failure.message, "Failed to add to cart");
        assert_eq!(notes.try_recv().unwrap().message, "Failed to add to cart");
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_previous_snapshot() {
        let (store, session, _) = offline_cart();
        session.send_replace(SessionState::Confirmed(identity(1, Role::Buyer)));
        store.transition_to(Some(UserId::new(1)));
        assert!(store.apply(store.epoch(), cart(2, 500)));

        // Nothing listens on the configured port
        let failure = store.remove_item(CartItemId::new(1)).await.unwrap_err();

        assert_eq!(failure.message, "Failed to remove from cart");
        assert_eq!(store.snapshot(), Some(cart(2, 500)));
    }
}
