//! Product and category endpoints.
//!
//! Categories, featured products and product detail are cached. Listings
//! with filters are not, since the filter space is unbounded.

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tracing::{debug, instrument};

use planet_price_core::ProductId;

use super::cache::{CacheKey, CacheValue};
use super::types::{
    Category, ImageUpload, Listing, ProductDetail, ProductFilter, ProductForm, ProductImage,
    ProductRecord, ProductSummary,
};
use super::{ApiClient, ApiError};

impl ApiClient {
    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductSummary>, ApiError> {
        let listing: Listing<ProductSummary> =
            self.get_json_query("products/", &filter.to_query()).await?;
        Ok(listing.into_vec())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist or is not
    /// visible to the current user.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<ProductDetail, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: ProductDetail = self.get_json(&format!("products/{id}/")).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get featured products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn featured_products(&self) -> Result<Vec<ProductSummary>, ApiError> {
        if let Some(CacheValue::Featured(products)) =
            self.inner.cache.get(&CacheKey::Featured).await
        {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let listing: Listing<ProductSummary> = self.get_json("products/featured/").await?;
        let products = listing.into_vec();

        self.inner
            .cache
            .insert(CacheKey::Featured, CacheValue::Featured(products.clone()))
            .await;

        Ok(products)
    }

    /// Create a product owned by the current seller.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with per-field messages on invalid input.
    #[instrument(skip(self, form), fields(title = %form.title))]
    pub async fn create_product(&self, form: &ProductForm) -> Result<ProductRecord, ApiError> {
        let record: ProductRecord = self
            .send_multipart(Method::POST, "products/", product_form(form)?)
            .await?;
        self.invalidate_product(None).await;
        Ok(record)
    }

    /// Replace a product. Supplying images replaces the existing set.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` on invalid input or when the product
    /// belongs to another seller.
    #[instrument(skip(self, form), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        form: &ProductForm,
    ) -> Result<ProductRecord, ApiError> {
        let record: ProductRecord = self
            .send_multipart(Method::PUT, &format!("products/{id}/"), product_form(form)?)
            .await?;
        self.invalidate_product(Some(id)).await;
        Ok(record)
    }

    /// Attach one more image to an existing product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, image), fields(product_id = %id, file = %image.file_name))]
    pub async fn upload_product_image(
        &self,
        id: ProductId,
        image: &ImageUpload,
        is_primary: bool,
    ) -> Result<ProductImage, ApiError> {
        let form = Form::new()
            .part("image", image_part(image)?)
            .text("is_primary", is_primary.to_string());
        let uploaded: ProductImage = self
            .send_multipart(Method::POST, &format!("products/{id}/upload_image/"), form)
            .await?;
        self.invalidate_product(Some(id)).await;
        Ok(uploaded)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        self.send_unit(Method::DELETE, &format!("products/{id}/"))
            .await?;
        self.invalidate_product(Some(id)).await;
        Ok(())
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let listing: Listing<Category> = self.get_json("categories/").await?;
        let categories = listing.into_vec();

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Get a category by its slug.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no category has that slug.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_category(&self, slug: &str) -> Result<Category, ApiError> {
        let key = CacheKey::Category(slug.to_string());
        if let Some(CacheValue::Category(category)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for category");
            return Ok(*category);
        }

        let category: Category = self.get_json(&format!("categories/{slug}/")).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Category(Box::new(category.clone())))
            .await;

        Ok(category)
    }
}

/// Build the multipart body for product create/update.
fn product_form(form: &ProductForm) -> Result<Form, ApiError> {
    let mut multipart = Form::new()
        .text("title", form.title.trim().to_string())
        .text("description", form.description.trim().to_string())
        .text("price", form.price.amount().to_string())
        .text("stock", form.stock.to_string())
        .text("is_active", form.is_active.to_string())
        .text("is_featured", form.is_featured.to_string());

    if let Some(category) = form.category {
        multipart = multipart.text("category", category.to_string());
    }
    if let Some(discount) = form.discount_price {
        multipart = multipart.text("discount_price", discount.amount().to_string());
    }

    let specifications = match &form.specifications {
        Some(value) => serde_json::to_string(value)?,
        None => "{}".to_string(),
    };
    multipart = multipart.text("specifications", specifications);

    if !form.images.is_empty() {
        for image in &form.images {
            multipart = multipart.part("images", image_part(image)?);
        }
        let primary = form.primary_image_index.min(form.images.len() - 1);
        multipart = multipart.text("primary_image_index", primary.to_string());
    }

    Ok(multipart)
}

fn image_part(image: &ImageUpload) -> Result<Part, ApiError> {
    Ok(Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.content_type)?)
}
