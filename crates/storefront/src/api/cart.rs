//! Cart endpoints.
//!
//! Every call answers with the full updated cart. Nothing here is cached.

use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use planet_price_core::{CartItemId, ProductId};

use super::types::CartSnapshot;
use super::{ApiClient, ApiError};

#[derive(Serialize)]
struct AddToCart {
    product_id: ProductId,
    quantity: u32,
}

#[derive(Serialize)]
struct UpdateCartItem {
    item_id: CartItemId,
    quantity: u32,
}

#[derive(Serialize)]
struct RemoveCartItem {
    item_id: CartItemId,
}

impl ApiClient {
    /// Get the current buyer's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<CartSnapshot, ApiError> {
        self.get_json("cart/").await
    }

    /// Add a product to the cart, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with an `error` field when stock is short.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartSnapshot, ApiError> {
        self.send_json(
            Method::POST,
            "cart/add/",
            &AddToCart {
                product_id,
                quantity,
            },
        )
        .await
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with an `error` field when stock is short.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update_cart_item(
        &self,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartSnapshot, ApiError> {
        self.send_json(
            Method::PATCH,
            "cart/update/",
            &UpdateCartItem { item_id, quantity },
        )
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_from_cart(&self, item_id: CartItemId) -> Result<CartSnapshot, ApiError> {
        self.send_json(Method::DELETE, "cart/remove/", &RemoveCartItem { item_id })
            .await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<CartSnapshot, ApiError> {
        self.send_bare(Method::POST, "cart/clear/").await
    }
}
