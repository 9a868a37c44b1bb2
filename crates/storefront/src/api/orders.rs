//! Order endpoints.
//!
//! Buyers see their own orders; sellers see orders containing their products.

use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use planet_price_core::{OrderId, OrderStatus};

use super::types::{CheckoutForm, Listing, Order};
use super::{ApiClient, ApiError};

#[derive(Serialize)]
struct StatusUpdate {
    status: OrderStatus,
}

impl ApiClient {
    /// List orders visible to the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        let listing: Listing<Order> = self.get_json("orders/").await?;
        Ok(listing.into_vec())
    }

    /// Get one order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order does not exist or belongs
    /// to someone else.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.get_json(&format!("orders/{id}/")).await
    }

    /// Place an order from the server-side cart.
    ///
    /// The API empties the cart as part of this call.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the cart is empty or stock ran out.
    #[instrument(skip(self, form))]
    pub async fn create_order(&self, form: &CheckoutForm) -> Result<Order, ApiError> {
        self.send_json(Method::POST, "orders/", form).await
    }

    /// Move an order to a new status (seller only).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the transition is not allowed.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        self.send_json(
            Method::PATCH,
            &format!("orders/{id}/update_status/"),
            &StatusUpdate { status },
        )
        .await
    }
}
