//! Wishlist endpoints.

use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use planet_price_core::ProductId;

use super::types::Wishlist;
use super::{ApiClient, ApiError};

#[derive(Serialize)]
struct WishlistProduct {
    product_id: ProductId,
}

impl ApiClient {
    /// Get the current buyer's wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_wishlist(&self) -> Result<Wishlist, ApiError> {
        self.get_json("wishlist/").await
    }

    /// Add a product to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_wishlist(&self, product_id: ProductId) -> Result<Wishlist, ApiError> {
        self.send_json(Method::POST, "wishlist/add/", &WishlistProduct { product_id })
            .await
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_wishlist(&self, product_id: ProductId) -> Result<Wishlist, ApiError> {
        self.send_json(
            Method::DELETE,
            "wishlist/remove/",
            &WishlistProduct { product_id },
        )
        .await
    }
}
