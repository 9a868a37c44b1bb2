//! Application state shared across views.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError, GatewayEvent};
use crate::cart::CartStore;
use crate::config::ClientConfig;
use crate::navigation::Navigator;
use crate::notify::Notifier;
use crate::session::SessionStore;
use crate::storage::CredentialStore;

/// Application state shared across all views.
///
/// This struct is cheaply cloneable via `Arc` and wires the gateway, the
/// session and cart stores together. Two background tasks keep them in
/// step and are stopped when the last clone is dropped:
/// - gateway 401 events expire the session
/// - session changes drive the cart lifecycle
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    api: ApiClient,
    session: SessionStore,
    cart: CartStore,
    navigator: Arc<dyn Navigator>,
    notifier: Notifier,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for AppStateInner {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl AppState {
    /// Create a new application state.
    ///
    /// Must be called from within a Tokio runtime. The session starts out
    /// `Pending`; call [`SessionStore::bootstrap`] to restore it.
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration
    /// * `credentials` - Durable credential storage
    /// * `navigator` - View navigation
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config, credentials, Arc::clone(&navigator))?;
        let notifier = Notifier::new();
        let session = SessionStore::new(api.clone(), notifier.clone());
        let cart = CartStore::new(api.clone(), notifier.clone(), session.subscribe());

        let tasks = vec![
            spawn_session_expiry(&api, session.clone()),
            spawn_cart_sync(&session, cart.clone()),
        ];

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                session,
                cart,
                navigator,
                notifier,
                tasks,
            }),
        })
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the API gateway.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the navigator.
    #[must_use]
    pub fn navigator(&self) -> &dyn Navigator {
        self.inner.navigator.as_ref()
    }

    /// Get a reference to the notification channel.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}

/// Expire the session whenever the gateway reports a revoked credential.
fn spawn_session_expiry(api: &ApiClient, session: SessionStore) -> JoinHandle<()> {
    let mut events = api.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(GatewayEvent::Unauthorized { had_credential }) => {
                    debug!(had_credential, "Gateway reported 401");
                    session.expire();
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Gateway events lagged");
                    session.expire();
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Re-evaluate the cart on every session change.
fn spawn_cart_sync(session: &SessionStore, cart: CartStore) -> JoinHandle<()> {
    let mut changes = session.subscribe();
    tokio::spawn(async move {
        loop {
            cart.sync().await;
            if changes.changed().await.is_err() {
                break;
            }
        }
    })
}
