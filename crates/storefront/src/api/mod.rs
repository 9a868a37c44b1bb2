//! Marketplace API gateway.
//!
//! Every remote call goes through [`ApiClient`]. It:
//! - attaches `Authorization: Token <token>` when a credential is stored
//! - tags each request with an `X-Request-Id` for log correlation
//! - intercepts 401 responses, clears the stored credential and redirects
//!   to the login view when a session was actually lost
//! - caches public catalog reads via `moka`
//!
//! All other failures are returned as typed [`ApiError`]s for the caller
//! to handle locally.
//!
//! # Example
//!
//! ```rust,ignore
//! use planet_price_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config, credentials, navigator)?;
//! let cart = client.add_to_cart(ProductId::new(42), 2).await?;
//! ```

mod admin;
mod auth;
mod cache;
mod cart;
mod catalog;
mod orders;
mod reviews;
mod wishlist;

pub mod types;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use moka::future::Cache;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::navigation::{Navigator, is_unauthenticated_entry, locations};
use crate::storage::{CredentialStore, StorageError};

use cache::{CacheKey, CacheValue};

/// Header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

const CACHE_CAPACITY: u64 = 1000;
const EVENT_CHANNEL_CAPACITY: usize = 16;
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur when calling the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the credential. Already handled globally.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(ErrorBody),

    /// Validation or permission failure (4xx other than 401/404).
    #[error("Request rejected ({status}): {body}")]
    Rejected { status: StatusCode, body: ErrorBody },

    /// The API failed (5xx).
    #[error("Server error ({status}): {body}")]
    Server { status: StatusCode, body: ErrorBody },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Credential storage could not be read.
    #[error("Credential storage error: {0}")]
    Storage(#[from] StorageError),

    /// Endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status of the failed response, if one was received.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            Self::NotFound(_) => Some(StatusCode::NOT_FOUND),
            Self::Rejected { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            Self::Parse(_) | Self::Storage(_) | Self::InvalidUrl(_) => None,
        }
    }

    /// Decoded error payload, if the API sent one.
    #[must_use]
    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            Self::NotFound(body) | Self::Rejected { body, .. } | Self::Server { body, .. } => {
                Some(body)
            }
            _ => None,
        }
    }

    /// Returns true when the resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for failures on our side of the wire or the server's,
    /// as opposed to the API rejecting the request.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Server { .. })
    }
}

/// Error payload returned by the API.
///
/// The API answers failures with a JSON object whose keys are either field
/// names mapping to message lists (`{"username": ["already taken"]}`) or
/// one of `error`, `message`, `detail` mapping to a single string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorBody(serde_json::Value);

impl ErrorBody {
    /// Decode a response body. Non-JSON text is kept as a plain string.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self(serde_json::Value::Null);
        }
        serde_json::from_str(trimmed).map_or_else(
            |_| {
                Self(serde_json::Value::String(
                    trimmed.chars().take(LOG_BODY_LIMIT).collect(),
                ))
            },
            Self,
        )
    }

    /// Wrap an already decoded value.
    #[must_use]
    pub const fn from_value(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The raw payload.
    #[must_use]
    pub const fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// Messages attached to one field. A bare string counts as one message.
    #[must_use]
    pub fn field_messages(&self, field: &str) -> Vec<&str> {
        match self.0.get(field) {
            Some(serde_json::Value::Array(items)) => {
                items.iter().filter_map(serde_json::Value::as_str).collect()
            }
            Some(serde_json::Value::String(s)) => vec![s.as_str()],
            _ => Vec::new(),
        }
    }

    /// First message from the first field in `fields` that has one.
    #[must_use]
    pub fn first_field_error(&self, fields: &[&str]) -> Option<String> {
        fields
            .iter()
            .find_map(|field| self.field_messages(field).first().map(|s| (*s).to_string()))
            .filter(|s| !s.trim().is_empty())
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// The `error` field.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.string_field("error")
    }

    /// The `message` field.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.string_field("message")
    }

    /// The `detail` field.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.string_field("detail")
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.detail().or_else(|| self.error()).or_else(|| self.message()) {
            return f.write_str(text);
        }
        match &self.0 {
            serde_json::Value::Null => f.write_str("(no details)"),
            serde_json::Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

// =============================================================================
// Gateway Events
// =============================================================================

/// Events the gateway publishes to the rest of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEvent {
    /// A response came back 401. The stored credential has been cleared.
    Unauthorized {
        /// Whether a credential was stored when the response arrived.
        had_credential: bool,
    },
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the marketplace REST API.
///
/// Cheap to clone; clones share the HTTP pool, cache and event channel.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base: Url,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    events: broadcast::Sender<GatewayEvent>,
    cache: Cache<CacheKey, CacheValue>,
    // Serializes "read token, clear, redirect" across concurrent 401s
    unauthorized: Mutex<()>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.inner.base.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is unusable or the HTTP client
    /// cannot be built.
    pub fn new(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("planet-price/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base: config.api_base()?,
                credentials,
                navigator,
                events,
                cache,
                unauthorized: Mutex::new(()),
            }),
        })
    }

    /// Base URL endpoint paths are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    /// The durable credential store this client reads tokens from.
    #[must_use]
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.credentials
    }

    /// Subscribe to gateway events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.events.subscribe()
    }

    // =========================================================================
    // Request Pipeline
    // =========================================================================

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.base.join(path)?;
        Ok(self.inner.http.request(method, url))
    }

    /// Attach headers, send, and map non-success statuses to errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let mut request = request.header(REQUEST_ID_HEADER, &request_id);

        if let Some(token) = self.inner.credentials.read_token()? {
            request = request.header(AUTHORIZATION, format!("Token {}", token.expose_secret()));
        }

        let request = request.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();
        debug!(%method, %path, %request_id, "API request");

        let response = match self.inner.http.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let err = ApiError::from(e);
                let event_id = sentry::capture_error(&err);
                error!(%method, %path, %request_id, error = %err, sentry_event_id = %event_id, "API request failed");
                return Err(err);
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!(%method, %path, %request_id, "API rejected credential");
            self.handle_unauthorized();
            return Err(ApiError::Unauthorized);
        }

        let text = response.text().await?;
        let body = ErrorBody::parse(&text);

        if status == StatusCode::NOT_FOUND {
            debug!(%method, %path, %request_id, "API resource not found");
            return Err(ApiError::NotFound(body));
        }

        if status.is_server_error() {
            let err = ApiError::Server { status, body };
            let event_id = sentry::capture_error(&err);
            error!(
                %method,
                %path,
                %request_id,
                %status,
                body = %text.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                sentry_event_id = %event_id,
                "API returned server error"
            );
            return Err(err);
        }

        debug!(%method, %path, %request_id, %status, "API rejected request");
        Err(ApiError::Rejected { status, body })
    }

    /// Global handling of an authorization-denied response.
    ///
    /// Whether a session was lost is decided by what storage holds *now*, so
    /// of several concurrent 401s only the first one redirects.
    fn handle_unauthorized(&self) {
        let _guard = self
            .inner
            .unauthorized
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let had_credential = match self.inner.credentials.read_token() {
            Ok(token) => token.is_some(),
            Err(e) => {
                warn!(error = %e, "Could not read credential during 401 handling");
                false
            }
        };

        if let Err(e) = self.inner.credentials.clear() {
            error!(error = %e, "Failed to clear credential after 401");
        }

        if had_credential {
            let current = self.inner.navigator.current_location();
            if !is_unauthenticated_entry(&current) {
                debug!(from = %current, "Session lost, redirecting to login");
                self.inner.navigator.navigate(locations::LOGIN);
            }
        }

        // No subscribers is fine
        let _ = self
            .inner
            .events
            .send(GatewayEvent::Unauthorized { had_credential });
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            error!(
                error = %e,
                body = %text.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Failed to parse API response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Typed Helpers
    // =========================================================================

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        Self::decode(response).await
    }

    async fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .send(self.request(Method::GET, path)?.query(query))
            .await?;
        Self::decode(response).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.request(method, path)?.json(body)).await?;
        Self::decode(response).await
    }

    /// Send without a body and decode the response.
    async fn send_bare<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(method, path)?).await?;
        Self::decode(response).await
    }

    /// Send without a body and ignore whatever comes back.
    async fn send_unit(&self, method: Method, path: &str) -> Result<(), ApiError> {
        self.send(self.request(method, path)?).await?;
        Ok(())
    }

    async fn send_multipart<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let response = self.send(self.request(method, path)?.multipart(form)).await?;
        Self::decode(response).await
    }

    // =========================================================================
    // Catalog Cache
    // =========================================================================

    /// Drop cached entries that a change to `product` could make stale.
    #[instrument(skip(self))]
    async fn invalidate_product(&self, product: Option<planet_price_core::ProductId>) {
        if let Some(id) = product {
            self.inner.cache.invalidate(&CacheKey::Product(id)).await;
        }
        self.inner.cache.invalidate(&CacheKey::Featured).await;
        debug!("Catalog cache invalidated");
    }

    /// Drop every cached catalog entry.
    pub fn clear_cache(&self) {
        self.inner.cache.invalidate_all();
    }
}
