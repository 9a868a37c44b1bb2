//! Session store: who is signed in, and what they may do.
//!
//! # Lifecycle
//!
//! ```text
//! Pending ──bootstrap──▶ Tentative ──verified──▶ Confirmed
//!    │                       │                      │
//!    │                       └──rejected──┐         │ logout / expire
//!    └──nothing stored───────────────────▶ SignedOut ◀┘
//!                                            │
//!                                  login / register
//!                                            ▼
//!                                        Confirmed
//! ```
//!
//! The stored credential is always written as a `{token, identity}` pair, so
//! a restart can show the last identity immediately while the API confirms
//! the token is still good.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use planet_price_core::{Role, UserId};

use crate::api::types::{Credentials, Identity, RegistrationForm};
use crate::api::ApiClient;
use crate::error::{ActionFailure, FailureKind, add_breadcrumb, scope_sentry_user};
use crate::guard::Requirement;
use crate::notify::Notifier;
use crate::storage::{CredentialStore, PersistedCredential};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const SELLER_APPLICATION_FAILED: &str = "Failed to apply as seller";
const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match";

// =============================================================================
// SessionState
// =============================================================================

/// Where the session currently stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Bootstrap has not run yet.
    #[default]
    Pending,
    /// Restored from storage; the API has not confirmed it yet.
    Tentative(Identity),
    /// Confirmed by the API or freshly established.
    Confirmed(Identity),
    SignedOut,
}

impl SessionState {
    /// The identity, confirmed or not.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Tentative(identity) | Self::Confirmed(identity) => Some(identity),
            Self::Pending | Self::SignedOut => None,
        }
    }

    /// Returns true once bootstrap has reached a verdict.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Confirmed(_) | Self::SignedOut)
    }

    /// Permissions derived from the identity.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::of(self.identity())
    }

    /// The signed-in user when they hold the buyer role.
    #[must_use]
    pub fn buyer(&self) -> Option<UserId> {
        self.identity()
            .filter(|identity| identity.role == Role::Buyer)
            .map(|identity| identity.id)
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Role flags derived from an identity. Never stored, always recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub is_authenticated: bool,
    pub is_buyer: bool,
    /// A seller whose application has been approved.
    pub is_seller: bool,
    pub is_super_admin: bool,
}

impl Capabilities {
    #[must_use]
    pub fn of(identity: Option<&Identity>) -> Self {
        identity.map_or_else(Self::default, |identity| Self {
            is_authenticated: true,
            is_buyer: identity.role == Role::Buyer,
            is_seller: identity.role == Role::Seller && identity.seller_approved,
            is_super_admin: identity.is_superuser,
        })
    }

    /// The single predicate behind route guards and in-page actions.
    #[must_use]
    pub const fn satisfies(&self, requirement: Requirement) -> bool {
        match requirement {
            Requirement::Authenticated => self.is_authenticated,
            Requirement::Buyer => self.is_authenticated && self.is_buyer,
            Requirement::Seller => self.is_authenticated && self.is_seller,
            Requirement::SuperAdmin => self.is_authenticated && self.is_super_admin,
        }
    }
}

// =============================================================================
// SessionStore
// =============================================================================

/// Owner of the current identity.
///
/// Cheap to clone; clones share state. Observe changes with [`subscribe`].
///
/// [`subscribe`]: SessionStore::subscribe
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: ApiClient,
    credentials: Arc<dyn CredentialStore>,
    notifier: Notifier,
    state: watch::Sender<SessionState>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store in the `Pending` state.
    #[must_use]
    pub fn new(api: ApiClient, notifier: Notifier) -> Self {
        let credentials = Arc::clone(api.credentials());
        let (state, _) = watch::channel(SessionState::Pending);
        Self {
            inner: Arc::new(SessionInner {
                api,
                credentials,
                notifier,
                state,
            }),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Current identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity().cloned()
    }

    /// Current permissions.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.inner.state.borrow().capabilities()
    }

    /// Receive every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    fn set_state(&self, state: SessionState) {
        self.inner.state.send_replace(state);
    }

    /// Restore the persisted session and verify it with the API.
    ///
    /// Any verification failure signs out locally. There is no retry.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> SessionState {
        let persisted = match self.inner.credentials.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(error = %e, "Stored credential unreadable, discarding");
                self.clear_local();
                return self.state();
            }
        };

        let Some(PersistedCredential { token, identity }) = persisted else {
            // A token without an identity (or the reverse) cannot be restored
            if let Err(e) = self.inner.credentials.clear() {
                warn!(error = %e, "Failed to clear partial credential");
            }
            self.set_state(SessionState::SignedOut);
            return self.state();
        };

        debug!(user = %identity.username, "Restored identity, verifying");
        self.set_state(SessionState::Tentative(identity));

        match self.inner.api.current_user().await {
            Ok(verified) => {
                // A logout or expiry may have landed while we waited
                if !matches!(*self.inner.state.borrow(), SessionState::Tentative(_)) {
                    debug!("Session changed during verification; dropping result");
                    return self.state();
                }
                let credential = PersistedCredential {
                    token,
                    identity: verified.clone(),
                };
                if let Err(e) = self.inner.credentials.save(&credential) {
                    error!(error = %e, "Failed to persist verified identity");
                }
                scope_sentry_user(Some(&verified));
                info!(user = %verified.username, "Session verified");
                self.set_state(SessionState::Confirmed(verified));
            }
            Err(e) => {
                if matches!(*self.inner.state.borrow(), SessionState::Tentative(_)) {
                    info!(error = %e, "Stored session rejected, signing out");
                    self.clear_local();
                }
            }
        }

        self.state()
    }

    /// Sign in with a username and password.
    ///
    /// # Errors
    ///
    /// Returns the first `non_field_errors` message from the API, or
    /// "Login failed".
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Identity, ActionFailure> {
        add_breadcrumb("auth", "Login", &[]);
        match self.inner.api.login(credentials).await {
            Ok(response) => {
                let identity = self.establish(response.token, response.user, LOGIN_FAILED)?;
                self.inner.notifier.success("Login successful!");
                Ok(identity)
            }
            Err(e) => {
                let failure = ActionFailure::from_api(
                    &e,
                    |body| body.first_field_error(&["non_field_errors"]),
                    LOGIN_FAILED,
                );
                debug!(error = %e, "Login rejected");
                self.inner.notifier.error(&failure.message);
                Err(failure)
            }
        }
    }

    /// Create an account and sign in as it.
    ///
    /// Mismatched passwords are rejected locally without contacting the API.
    ///
    /// # Errors
    ///
    /// Returns the first `username`, then `email` message from the API, or
    /// "Registration failed".
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: &RegistrationForm) -> Result<Identity, ActionFailure> {
        if form.password != form.password_confirm {
            self.inner.notifier.error(PASSWORDS_DO_NOT_MATCH);
            return Err(ActionFailure::validation(PASSWORDS_DO_NOT_MATCH));
        }

        add_breadcrumb("auth", "Register", &[]);
        match self.inner.api.register(form).await {
            Ok(response) => {
                let identity = self.establish(response.token, response.user, REGISTRATION_FAILED)?;
                self.inner.notifier.success("Registration successful!");
                Ok(identity)
            }
            Err(e) => {
                let failure = ActionFailure::from_api(
                    &e,
                    |body| body.first_field_error(&["username", "email"]),
                    REGISTRATION_FAILED,
                );
                debug!(error = %e, "Registration rejected");
                self.inner.notifier.error(&failure.message);
                Err(failure)
            }
        }
    }

    /// Persist a freshly issued token and identity, then adopt them.
    fn establish(
        &self,
        token: String,
        identity: Identity,
        fallback: &str,
    ) -> Result<Identity, ActionFailure> {
        let credential = PersistedCredential::new(token, identity);
        if let Err(e) = self.inner.credentials.save(&credential) {
            let event_id = sentry::capture_error(&e);
            error!(error = %e, sentry_event_id = %event_id, "Failed to persist credential");
            self.inner.notifier.error(fallback);
            return Err(ActionFailure::new(FailureKind::Transient, fallback));
        }

        let identity = credential.identity;
        scope_sentry_user(Some(&identity));
        info!(user = %identity.username, role = %identity.role, "Signed in");
        self.set_state(SessionState::Confirmed(identity.clone()));
        Ok(identity)
    }

    /// Sign out. Remote invalidation is best-effort; local state is always
    /// cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        add_breadcrumb("auth", "Logout", &[]);
        if let Err(e) = self.inner.api.logout().await {
            warn!(error = %e, "Remote logout failed");
        }
        self.clear_local();
        self.inner.notifier.info("Logged out successfully");
    }

    /// Apply to become a seller.
    ///
    /// # Errors
    ///
    /// Returns the API's `message`, or "Failed to apply as seller".
    #[instrument(skip(self))]
    pub async fn apply_for_seller_role(&self) -> Result<Identity, ActionFailure> {
        add_breadcrumb("auth", "Apply for seller role", &[]);
        match self.inner.api.apply_seller().await {
            Ok(application) => {
                self.adopt_identity(application.user.clone());
                self.inner.notifier.success(&application.message);
                Ok(application.user)
            }
            Err(e) => {
                let failure = ActionFailure::from_api(
                    &e,
                    |body| body.message().map(String::from),
                    SELLER_APPLICATION_FAILED,
                );
                self.inner.notifier.error(&failure.message);
                Err(failure)
            }
        }
    }

    /// Replace the identity after an out-of-band profile change.
    ///
    /// Ignored when nobody is signed in.
    #[instrument(skip(self, identity), fields(user = %identity.username))]
    pub fn update_identity(&self, identity: Identity) {
        if self.inner.state.borrow().identity().is_none() {
            warn!("Identity update without a session; ignoring");
            return;
        }
        self.adopt_identity(identity);
    }

    /// Drop the identity after the API revoked the credential.
    ///
    /// No remote call; the gateway has already cleared storage. If a token
    /// is stored again by the time this runs, a newer session was
    /// established after the 401 and is left alone.
    #[instrument(skip(self))]
    pub fn expire(&self) {
        if self.inner.state.borrow().identity().is_none() {
            return;
        }
        if matches!(self.inner.credentials.read_token(), Ok(Some(_))) {
            debug!("Credential re-established since 401; keeping session");
            return;
        }
        info!("Session expired");
        self.clear_local();
    }

    /// Re-persist `identity` with the current token and mark it confirmed.
    fn adopt_identity(&self, identity: Identity) {
        match self.inner.credentials.read_token() {
            Ok(Some(token)) => {
                let credential = PersistedCredential::new(token.expose_secret(), identity.clone());
                if let Err(e) = self.inner.credentials.save(&credential) {
                    error!(error = %e, "Failed to persist updated identity");
                }
            }
            Ok(None) => warn!("No stored token; identity kept in memory only"),
            Err(e) => error!(error = %e, "Failed to read stored token"),
        }
        self.set_state(SessionState::Confirmed(identity));
    }

    fn clear_local(&self) {
        if let Err(e) = self.inner.credentials.clear() {
            error!(error = %e, "Failed to clear stored credential");
        }
        scope_sentry_user(None);
        self.set_state(SessionState::SignedOut);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::navigation::MemoryNavigator;
    use crate::notify::NotificationLevel;
    use crate::storage::{MemoryCredentialStore, StoredEntries};
    use planet_price_core::Email;
    use std::path::PathBuf;

    fn identity(role: Role, seller_approved: bool) -> Identity {
        Identity {
            id: UserId::new(5),
            username: "lin".to_string(),
            email: Email::parse("lin@example.com").unwrap(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            seller_approved,
            is_superuser: false,
            phone_number: None,
            address: None,
            profile_image: None,
            created_at: None,
        }
    }

    // Port 9 (discard) is never listening, so any request fails fast.
    fn offline_store(entries: StoredEntries) -> (SessionStore, Arc<MemoryCredentialStore>, Notifier) {
        let creds = Arc::new(MemoryCredentialStore::with_entries(entries));
        let config = ClientConfig::for_api("http://127.0.0.1:9", PathBuf::new()).unwrap();
        let api = ApiClient::new(&config, creds.clone(), Arc::new(MemoryNavigator::default())).unwrap();
        let notifier = Notifier::new();
        (SessionStore::new(api, notifier.clone()), creds, notifier)
    }

    #[test]
    fn test_capabilities_follow_identity() {
        let none = Capabilities::of(None);
        assert_eq!(none, Capabilities::default());
        assert!(!none.satisfies(Requirement::Authenticated));

        let buyer = Capabilities::of(Some(&identity(Role::Buyer, false)));
        assert!(buyer.is_buyer && !buyer.is_seller);
        assert!(buyer.satisfies(Requirement::Buyer));

        let pending_seller = Capabilities::of(Some(&identity(Role::Seller, false)));
        assert!(!pending_seller.is_seller);
        assert!(!pending_seller.is_buyer);
        assert!(pending_seller.satisfies(Requirement::Authenticated));
        assert!(!pending_seller.satisfies(Requirement::Seller));

        let seller = Capabilities::of(Some(&identity(Role::Seller, true)));
        assert!(seller.satisfies(Requirement::Seller));
        assert!(!seller.satisfies(Requirement::SuperAdmin));
    }

    #[test]
    fn test_buyer_only_for_buyer_role() {
        assert_eq!(
            SessionState::Confirmed(identity(Role::Buyer, false)).buyer(),
            Some(UserId::new(5))
        );
        assert_eq!(
            SessionState::Tentative(identity(Role::Buyer, false)).buyer(),
            Some(UserId::new(5))
        );
        assert_eq!(SessionState::Confirmed(identity(Role::Seller, true)).buyer(), None);
        assert_eq!(SessionState::SignedOut.buyer(), None);
    }

    #[tokio::test]
    async fn test_bootstrap_with_nothing_stored_signs_out() {
        let (store, _, _) = offline_store(StoredEntries::default());
        assert_eq!(store.state(), SessionState::Pending);

        assert_eq!(store.bootstrap().await, SessionState::SignedOut);
    }

    #[tokio::test]
    async fn test_bootstrap_with_orphan_token_clears_it() {
        let (store, creds, _) = offline_store(StoredEntries {
            token: Some("orphan".to_string()),
            user: None,
        });

        assert_eq!(store.bootstrap().await, SessionState::SignedOut);
        assert_eq!(creds.entries(), StoredEntries::default());
    }

    #[tokio::test]
    async fn test_bootstrap_unreachable_api_signs_out() {
        let stored = identity(Role::Buyer, false);
        let (store, creds, _) = offline_store(StoredEntries {
            token: Some("tok".to_string()),
            user: Some(serde_json::to_string(&stored).unwrap()),
        });
        let mut rx = store.subscribe();

        assert_eq!(store.bootstrap().await, SessionState::SignedOut);
        assert_eq!(creds.entries(), StoredEntries::default());
        // Tentative was published before verification failed
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn test_register_password_mismatch_is_local() {
        let (store, creds, notifier) = offline_store(StoredEntries::default());
        let mut notes = notifier.subscribe();
        let form = RegistrationForm {
            username: "lin".to_string(),
            email: "lin@example.com".to_string(),
            password: "one".to_string(),
            password_confirm: "two".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::Buyer,
        };

        let failure = store.register(&form).await.unwrap_err();

        assert_eq!(failure, ActionFailure::validation("Passwords do not match"));
        let note = notes.try_recv().unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(note.message, "Passwords do not match");
        assert_eq!(creds.entries(), StoredEntries::default());
    }

    #[tokio::test]
    async fn test_login_transport_failure_uses_fallback() {
        let (store, _, _) = offline_store(StoredEntries::default());
        let failure = store
            .login(&Credentials {
                username: "lin".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(failure.message, "Login failed");
        assert_eq!(failure.kind, FailureKind::Transient);
        assert_eq!(store.identity(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_remote_fails() {
        let stored = identity(Role::Buyer, false);
        let (store, creds, notifier) = offline_store(StoredEntries::default());
        creds
            .save(&PersistedCredential::new("tok", stored.clone()))
            .unwrap();
        store.set_state(SessionState::Confirmed(stored));
        let mut notes = notifier.subscribe();

        store.logout().await;

        assert_eq!(store.state(), SessionState::SignedOut);
        assert_eq!(creds.entries(), StoredEntries::default());
        assert_eq!(notes.try_recv().unwrap().message, "Logged out successfully");
    }

    #[test]
    fn test_expire_drops_identity() {
        let (store, _, _) = offline_store(StoredEntries::default());
        store.set_state(SessionState::Confirmed(identity(Role::Buyer, false)));

        store.expire();

        assert_eq!(store.state(), SessionState::SignedOut);
    }

    #[test]
    fn test_expire_ignored_once_new_credential_stored() {
        let (store, creds, _) = offline_store(StoredEntries::default());
        let fresh = identity(Role::Buyer, false);
        creds
            .save(&PersistedCredential::new("new-token", fresh.clone()))
            .unwrap();
        store.set_state(SessionState::Confirmed(fresh.clone()));

        store.expire();

        assert_eq!(store.state(), SessionState::Confirmed(fresh));
    }

    #[test]
    fn test_update_identity_repersists_with_same_token() {
        let (store, creds, _) = offline_store(StoredEntries::default());
        let original = identity(Role::Buyer, false);
        creds
            .save(&PersistedCredential::new("tok", original.clone()))
            .unwrap();
        store.set_state(SessionState::Confirmed(original));

        let mut edited = identity(Role::Buyer, false);
        edited.first_name = "Lin".to_string();
        store.update_identity(edited.clone());

        let loaded = creds.load().unwrap().unwrap();
        assert_eq!(loaded.token.expose_secret(), "tok");
        assert_eq!(loaded.identity, edited);
        assert_eq!(store.identity(), Some(edited));
    }

    #[test]
    fn test_update_identity_without_session_is_ignored() {
        let (store, creds, _) = offline_store(StoredEntries::default());
        store.update_identity(identity(Role::Buyer, false));

        assert_eq!(store.identity(), None);
        assert_eq!(creds.entries(), StoredEntries::default());
    }
}
