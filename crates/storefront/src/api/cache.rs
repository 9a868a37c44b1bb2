//! Cache types for catalog responses.

use planet_price_core::ProductId;

use super::types::{Category, ProductDetail, ProductSummary};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    Category(String),
    Featured,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Vec<Category>),
    Category(Box<Category>),
    Featured(Vec<ProductSummary>),
    Product(Box<ProductDetail>),
}
