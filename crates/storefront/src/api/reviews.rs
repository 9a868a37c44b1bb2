//! Review endpoints.

use reqwest::Method;
use tracing::instrument;

use planet_price_core::{ProductId, ReviewId};

use super::types::{Listing, Review, ReviewForm};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// List reviews for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn list_reviews(&self, product: ProductId) -> Result<Vec<Review>, ApiError> {
        let listing: Listing<Review> = self
            .get_json_query("reviews/", &[("product", product.to_string())])
            .await?;
        Ok(listing.into_vec())
    }

    /// Post a review.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the buyer already reviewed the product
    /// or the rating is out of range.
    #[instrument(skip(self, form), fields(product_id = %form.product, rating = form.rating))]
    pub async fn create_review(&self, form: &ReviewForm) -> Result<Review, ApiError> {
        let review = self.send_json(Method::POST, "reviews/", form).await?;
        self.invalidate_product(Some(form.product)).await;
        Ok(review)
    }

    /// Replace a review.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, form), fields(review_id = %id))]
    pub async fn update_review(&self, id: ReviewId, form: &ReviewForm) -> Result<Review, ApiError> {
        let review = self
            .send_json(Method::PUT, &format!("reviews/{id}/"), form)
            .await?;
        self.invalidate_product(Some(form.product)).await;
        Ok(review)
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(review_id = %id))]
    pub async fn delete_review(&self, id: ReviewId) -> Result<(), ApiError> {
        self.send_unit(Method::DELETE, &format!("reviews/{id}/"))
            .await
    }
}
