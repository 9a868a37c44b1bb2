//! CLI commands.
//!
//! Every command runs against a [`Context`] whose session has already been
//! restored from the credential file.

pub mod account;
pub mod admin;
pub mod catalog;
pub mod orders;
pub mod seller;
pub mod shopping;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast::Receiver;

use planet_price_storefront::api::ApiError;
use planet_price_storefront::config::{ClientConfig, ConfigError};
use planet_price_storefront::error::ActionFailure;
use planet_price_storefront::guard::{AccessGuard, GuardDecision, Requirement};
use planet_price_storefront::navigation::{MemoryNavigator, Navigator};
use planet_price_storefront::notify::{Notification, NotificationLevel};
use planet_price_storefront::state::AppState;
use planet_price_storefront::storage::FileCredentialStore;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A request failed outside any store action.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// A store action failed; the message is already user-facing.
    #[error("{0}")]
    Action(#[from] ActionFailure),

    /// The signed-in user may not run this command.
    #[error("Access denied: {0}")]
    Denied(&'static str),

    /// An argument was rejected before anything was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// A running client: application state plus a recorded navigation history.
pub struct Context {
    state: AppState,
    navigator: Arc<MemoryNavigator>,
    notifications: std::sync::Mutex<Receiver<Notification>>,
}

impl Context {
    /// Build the application state and restore the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub async fn start(config: ClientConfig) -> Result<Self, CliError> {
        let credentials = Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
        let navigator = Arc::new(MemoryNavigator::default());
        let state = AppState::new(config, credentials, navigator.clone())?;
        let notifications = state.notifier().subscribe();

        let session = state.session().bootstrap().await;
        tracing::debug!(?session, "Session restored");

        Ok(Self {
            state,
            navigator,
            notifications: std::sync::Mutex::new(notifications),
        })
    }

    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Pretend the user opened `location`, as a browser would before
    /// rendering the view.
    pub fn open(&self, location: &str) {
        self.navigator.navigate(location);
    }

    /// Open `location` and check it may be shown.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Denied` when the guard redirects.
    pub fn guard(&self, requirement: Requirement, location: &str) -> Result<(), CliError> {
        self.open(location);
        let session = self.state.session().state();
        match AccessGuard::enforce(&session, requirement, location, self.navigator.as_ref()) {
            GuardDecision::Authorized => Ok(()),
            GuardDecision::RedirectToLogin { .. } => Err(CliError::Denied("sign in first")),
            GuardDecision::RedirectToHome => Err(CliError::Denied(match requirement {
                Requirement::Buyer => "buyers only",
                Requirement::Seller => "approved sellers only",
                Requirement::SuperAdmin => "administrators only",
                Requirement::Authenticated => "sign in first",
            })),
            GuardDecision::Loading => Err(CliError::Denied("session not verified")),
        }
    }

    /// Print every notification raised so far.
    #[allow(clippy::print_stdout)]
    pub fn flush_notifications(&self) {
        let mut rx = self
            .notifications
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        while let Ok(note) = rx.try_recv() {
            let tag = match note.level {
                NotificationLevel::Success => "ok",
                NotificationLevel::Info => "info",
                NotificationLevel::Error => "error",
            };
            println!("[{tag}] {}", note.message);
        }
    }

    /// Mention where the view ended up if a command moved it.
    pub fn report_location(&self) {
        let history = self.navigator.history();
        if history.len() > 1 {
            tracing::info!(location = %self.navigator.current_location(), "Navigated");
        }
    }
}
