//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `PLANET_PRICE_API_URL` - Marketplace API origin (default: `http://localhost:8000`).
//!   The `/api/` prefix is appended automatically.
//! - `PLANET_PRICE_CREDENTIALS_PATH` - File holding the persisted token and identity
//!   (default: `<config dir>/planet-price/credentials.json`)
//! - `PLANET_PRICE_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `PLANET_PRICE_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;
const CREDENTIALS_DIR: &str = "planet-price";
const CREDENTIALS_FILE: &str = "credentials.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("No configuration directory available; set PLANET_PRICE_CREDENTIALS_PATH")]
    NoConfigDir,
}

/// Marketplace client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API origin, e.g. `https://api.planetprice.example`
    pub api_url: Url,
    /// Location of the durable credential store
    pub credentials_path: PathBuf,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
    /// How long catalog reads stay cached
    pub catalog_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production", "staging")
    pub sentry_environment: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed, or no
    /// credentials location can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(
            "PLANET_PRICE_API_URL",
            &get_env_or_default("PLANET_PRICE_API_URL", DEFAULT_API_URL),
        )?;

        let credentials_path = match get_optional_env("PLANET_PRICE_CREDENTIALS_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_credentials_path()?,
        };

        let request_timeout = get_duration_secs(
            "PLANET_PRICE_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let catalog_cache_ttl = get_duration_secs(
            "PLANET_PRICE_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )?;

        Ok(Self {
            api_url,
            credentials_path,
            request_timeout,
            catalog_cache_ttl,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Build a configuration for an explicit API origin with default settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not an absolute
    /// http(s) URL.
    pub fn for_api(api_url: &str, credentials_path: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url("api_url", api_url)?,
            credentials_path,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// Base URL every endpoint path is joined onto (always ends in `/api/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the origin cannot carry a path (e.g. `data:` URLs).
    pub fn api_base(&self) -> Result<Url, url::ParseError> {
        let origin = self.api_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{origin}/api/"))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a whole number of seconds, falling back to `default` when unset.
fn get_duration_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(Duration::from_secs(default)), |raw| {
        raw.trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Validate that the API origin is an absolute http(s) URL.
fn parse_api_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{other}' (expected http or https)"),
        )),
    }
}

fn default_credentials_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(CREDENTIALS_DIR).join(CREDENTIALS_FILE))
        .ok_or(ConfigError::NoConfigDir)
}
