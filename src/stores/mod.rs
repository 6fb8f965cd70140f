// ============================================================================
// STORES - PERSISTENCE CAPABILITIES
// ============================================================================
//
// Workflows only see these traits. Each one has a SeaORM implementation used
// by the server and an in-memory implementation used by the unit tests.
//
//   - UserStore    : users table (credential store)
//   - SessionStore : sessions table (refresh tokens)
//   - CatalogStore : products + variants + images, with transactions
//   - NameResolver : display names of categories and brands
//
// ============================================================================

pub mod catalog;
pub mod sessions;
pub mod users;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::dto::ProductResponse;
use crate::models::users::Role;
use crate::models::{product_images, product_variants, products, sessions as session_model, users as user_model};

pub use catalog::{SeaCatalogStore, SeaNameResolver};
pub use sessions::SeaSessionStore;
pub use users::SeaUserStore;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub refresh_token: String,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProductRow {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: i32,
    pub brand_id: i32,
}

#[derive(Debug, Clone)]
pub struct NewVariantRow {
    pub product_id: i32,
    pub price: Decimal,
    pub stock: i32,
    pub size: String,
}

#[derive(Debug, Clone)]
pub struct NewImageRow {
    pub product_id: i32,
    pub image_url: String,
    pub image_public_id: String,
    pub display_order: i32,
}

/// Column changes of a product update, `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub brand_id: Option<i32>,
}

/// A product with its owned rows, variants by id and images by display order.
#[derive(Debug, Clone)]
pub struct ProductAggregate {
    pub product: products::Model,
    pub variants: Vec<product_variants::Model>,
    pub images: Vec<product_images::Model>,
}

impl From<ProductAggregate> for ProductResponse {
    fn from(aggregate: ProductAggregate) -> Self {
        ProductResponse::from_parts(aggregate.product, aggregate.variants, aggregate.images)
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `UniqueViolation` when the email is taken.
    async fn create(&self, user: NewUser) -> Result<user_model::Model, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<user_model::Model, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<user_model::Model, StoreError>;
    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: NewSession) -> Result<session_model::Model, StoreError>;
    async fn find_by_refresh_token(&self, token: &str) -> Result<session_model::Model, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError>;
    async fn find_product(&self, id: i32) -> Result<ProductAggregate, StoreError>;
    async fn list_products(&self) -> Result<Vec<ProductAggregate>, StoreError>;
    async fn update_product(&self, id: i32, changes: ProductChanges) -> Result<products::Model, StoreError>;
    /// Removes the product with its variants and images, returns the removed images.
    async fn delete_product(&self, id: i32) -> Result<Vec<product_images::Model>, StoreError>;
}

/// Writes of one product creation. Nothing is visible outside until `commit`.
#[async_trait]
pub trait CatalogTx: Send {
    async fn insert_product(&mut self, row: NewProductRow) -> Result<products::Model, StoreError>;
    async fn insert_variant(&mut self, row: NewVariantRow) -> Result<product_variants::Model, StoreError>;
    async fn set_variant_sku(&mut self, variant_id: i32, sku: &str) -> Result<(), StoreError>;
    async fn insert_image(&mut self, row: NewImageRow) -> Result<product_images::Model, StoreError>;
    async fn set_total_stock(&mut self, product_id: i32, total_stock: i32) -> Result<(), StoreError>;
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn category_name(&self, id: i32) -> Result<String, StoreError>;
    async fn brand_name(&self, id: i32) -> Result<String, StoreError>;
}
