//! Administrator and seller endpoints.

use reqwest::Method;
use tracing::instrument;

use planet_price_core::{ProductId, UserId};

use super::types::{Identity, Listing, ModerationResult, ProductSummary, SellerDashboard};
use super::{ApiClient, ApiError};

impl ApiClient {
    // =========================================================================
    // Admin Methods
    // =========================================================================

    /// List users, optionally only sellers awaiting approval.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` unless the caller is a superuser.
    #[instrument(skip(self))]
    pub async fn list_users(&self, pending_only: bool) -> Result<Vec<Identity>, ApiError> {
        let listing: Listing<Identity> = if pending_only {
            self.get_json_query("admin/list_users/", &[("pending", "true".to_string())])
                .await?
        } else {
            self.get_json("admin/list_users/").await?
        };
        Ok(listing.into_vec())
    }

    /// Approve a seller application.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` unless the caller is a superuser.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn approve_seller(&self, user: UserId) -> Result<Identity, ApiError> {
        self.send_bare(Method::POST, &format!("admin/{user}/approve_seller/"))
            .await
    }

    /// Products awaiting moderation.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` unless the caller is a superuser.
    #[instrument(skip(self))]
    pub async fn pending_products(&self) -> Result<Vec<ProductSummary>, ApiError> {
        let listing: Listing<ProductSummary> = self.get_json("admin/pending_products/").await?;
        Ok(listing.into_vec())
    }

    /// Approve a product for public listing.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` unless the caller is a superuser.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn approve_product(&self, product: ProductId) -> Result<ModerationResult, ApiError> {
        let result = self
            .send_bare(Method::POST, &format!("admin/products/{product}/approve/"))
            .await?;
        self.invalidate_product(Some(product)).await;
        Ok(result)
    }

    /// Reject a product, hiding it from listings.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` unless the caller is a superuser.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn reject_product(&self, product: ProductId) -> Result<ModerationResult, ApiError> {
        let result = self
            .send_bare(Method::POST, &format!("admin/products/{product}/reject/"))
            .await?;
        self.invalidate_product(Some(product)).await;
        Ok(result)
    }

    // =========================================================================
    // Seller Methods
    // =========================================================================

    /// Sales figures for the current seller.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` unless the caller is an approved seller.
    #[instrument(skip(self))]
    pub async fn seller_dashboard(&self) -> Result<SellerDashboard, ApiError> {
        self.get_json("seller/dashboard/").await
    }
}
