//! Authentication endpoints.

use reqwest::Method;
use tracing::instrument;

use super::types::{AuthResponse, Credentials, Identity, RegistrationForm, SellerApplication};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Exchange a username and password for a token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with `non_field_errors` on bad credentials.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.send_json(Method::POST, "auth/login/", credentials).await
    }

    /// Create an account. The response carries a token like login does.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with per-field messages on invalid input.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: &RegistrationForm) -> Result<AuthResponse, ApiError> {
        self.send_json(Method::POST, "auth/register/", form).await
    }

    /// Invalidate the current token server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.send_unit(Method::POST, "auth/logout/").await
    }

    /// Fetch the identity bound to the current token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is no longer valid.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<Identity, ApiError> {
        self.get_json("auth/user/").await
    }

    /// Ask to become a seller. The returned identity reflects the new role.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with a `message` if the application is refused.
    #[instrument(skip(self))]
    pub async fn apply_seller(&self) -> Result<SellerApplication, ApiError> {
        self.send_bare(Method::POST, "auth/apply-seller/").await
    }
}
