// In-memory stores for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::*;
use crate::errors::StoreError;
use crate::models::{product_images, product_variants, products, sessions, users};

// ----------------------------------------------------------------------------
// Users
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, users::Model>>,
}

impl MemoryUserStore {
    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn update(&self, id: Uuid, apply: impl FnOnce(&mut users::Model)) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            apply(user);
        }
    }

    pub fn insert_raw(&self, user: users::Model) {
        self.users.lock().unwrap().insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<users::Model, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }

        let now = Utc::now();
        let model = users::Model {
            id: Uuid::new_v4(),
            full_name: user.full_name,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            role: user.role,
            is_active: true,
            avatar_url: None,
            avatar_public_id: None,
            created_at: now,
            updated_at: now,
            last_login: None,
            deleted_at: None,
        };
        users.insert(model.id, model.clone());
        Ok(model)
    }

    async fn find_by_email(&self, email: &str) -> Result<users::Model, StoreError> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<users::Model, StoreError> {
        self.users
            .lock()
            .unwrap()
            .get(&id)
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.last_login = Some(at);
        user.updated_at = at;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Sessions
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Uuid, sessions::Model>>,
}

impl MemorySessionStore {
    pub fn count_for(&self, user_id: Uuid) -> usize {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id)
            .count()
    }

    pub fn update(&self, refresh_token: &str, apply: impl FnOnce(&mut sessions::Model)) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.values_mut().find(|s| s.refresh_token == refresh_token) {
            apply(session);
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: NewSession) -> Result<sessions::Model, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.values().any(|s| s.refresh_token == session.refresh_token) {
            return Err(StoreError::UniqueViolation("sessions_refresh_token_key".to_string()));
        }

        let model = sessions::Model {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            refresh_token: session.refresh_token,
            user_agent: session.user_agent,
            client_ip: session.client_ip,
            is_blocked: false,
            expires_at: session.expires_at,
            created_at: Utc::now(),
        };
        sessions.insert(model.id, model.clone());
        Ok(model)
    }

    async fn find_by_refresh_token(&self, token: &str) -> Result<sessions::Model, StoreError> {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.refresh_token == token)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

// ----------------------------------------------------------------------------
// Catalog
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct CatalogState {
    products: BTreeMap<i32, products::Model>,
    variants: BTreeMap<i32, product_variants::Model>,
    images: BTreeMap<i32, product_images::Model>,
}

impl CatalogState {
    fn aggregate(&self, product: &products::Model) -> ProductAggregate {
        let variants = self
            .variants
            .values()
            .filter(|v| v.product_id == product.id)
            .cloned()
            .collect();
        let mut images: Vec<_> = self
            .images
            .values()
            .filter(|img| img.product_id == product.id)
            .cloned()
            .collect();
        images.sort_by_key(|img| img.display_order);

        ProductAggregate {
            product: product.clone(),
            variants,
            images,
        }
    }

    fn slug_taken(&self, slug: &str, except: Option<i32>) -> bool {
        self.products
            .values()
            .any(|p| p.slug == slug && Some(p.id) != except)
    }
}

/// Id sequences, shared by every transaction and never rolled back.
#[derive(Debug)]
struct Sequences {
    product: AtomicI32,
    variant: AtomicI32,
    image: AtomicI32,
}

impl Default for Sequences {
    fn default() -> Self {
        Self {
            product: AtomicI32::new(1),
            variant: AtomicI32::new(1),
            image: AtomicI32::new(1),
        }
    }
}

#[derive(Default)]
pub struct MemoryCatalogStore {
    state: Arc<Mutex<CatalogState>>,
    sequences: Arc<Sequences>,
}

impl MemoryCatalogStore {
    pub fn product_count(&self) -> usize {
        self.state.lock().unwrap().products.len()
    }

    pub fn variant_count(&self) -> usize {
        self.state.lock().unwrap().variants.len()
    }

    pub fn image_count(&self) -> usize {
        self.state.lock().unwrap().images.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError> {
        Ok(Box::new(MemoryCatalogTx {
            shared: Arc::clone(&self.state),
            sequences: Arc::clone(&self.sequences),
            pending: CatalogState::default(),
        }))
    }

    async fn find_product(&self, id: i32) -> Result<ProductAggregate, StoreError> {
        let state = self.state.lock().unwrap();
        state
            .products
            .get(&id)
            .map(|product| state.aggregate(product))
            .ok_or(StoreError::NotFound)
    }

    async fn list_products(&self) -> Result<Vec<ProductAggregate>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.products.values().map(|p| state.aggregate(p)).collect())
    }

    async fn update_product(&self, id: i32, changes: ProductChanges) -> Result<products::Model, StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(slug) = &changes.slug {
            if state.slug_taken(slug, Some(id)) {
                return Err(StoreError::UniqueViolation("products_slug_key".to_string()));
            }
        }

        let product = state.products.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(slug) = changes.slug {
            product.slug = slug;
        }
        if let Some(description) = changes.description {
            product.description = Some(description);
        }
        if let Some(category_id) = changes.category_id {
            product.category_id = category_id;
        }
        if let Some(brand_id) = changes.brand_id {
            product.brand_id = brand_id;
        }
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: i32) -> Result<Vec<product_images::Model>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.products.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.variants.retain(|_, v| v.product_id != id);

        let (removed, kept): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut state.images)
            .into_iter()
            .partition(|(_, img)| img.product_id == id);
        state.images = kept;
        Ok(removed.into_values().collect())
    }
}

/// Buffers the rows written by one transaction and merges them into the
/// shared catalog on commit. Uniqueness is checked against both.
pub struct MemoryCatalogTx {
    shared: Arc<Mutex<CatalogState>>,
    sequences: Arc<Sequences>,
    pending: CatalogState,
}

impl MemoryCatalogTx {
    fn require_product(&self, product_id: i32) -> Result<(), StoreError> {
        let known = self.pending.products.contains_key(&product_id)
            || self.shared.lock().unwrap().products.contains_key(&product_id);
        if known {
            Ok(())
        } else {
            Err(StoreError::Db(format!("foreign key violation: product {product_id}")))
        }
    }

    fn slug_taken(&self, slug: &str) -> bool {
        self.pending.slug_taken(slug, None) || self.shared.lock().unwrap().slug_taken(slug, None)
    }

    fn sku_taken(&self, sku: &str, except: i32) -> bool {
        self.pending.sku_taken(sku, Some(except)) || self.shared.lock().unwrap().sku_taken(sku, None)
    }
}

impl CatalogState {
    fn sku_taken(&self, sku: &str, except: Option<i32>) -> bool {
        self.variants
            .values()
            .any(|v| Some(v.id) != except && v.sku.as_deref() == Some(sku))
    }
}

#[async_trait]
impl CatalogTx for MemoryCatalogTx {
    async fn insert_product(&mut self, row: NewProductRow) -> Result<products::Model, StoreError> {
        if self.slug_taken(&row.slug) {
            return Err(StoreError::UniqueViolation("products_slug_key".to_string()));
        }

        let now = Utc::now();
        let product = products::Model {
            id: self.sequences.product.fetch_add(1, Ordering::SeqCst),
            name: row.name,
            slug: row.slug,
            description: row.description,
            category_id: row.category_id,
            brand_id: row.brand_id,
            total_stock: 0,
            rating_avg: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.pending.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn insert_variant(&mut self, row: NewVariantRow) -> Result<product_variants::Model, StoreError> {
        self.require_product(row.product_id)?;

        let now = Utc::now();
        let variant = product_variants::Model {
            id: self.sequences.variant.fetch_add(1, Ordering::SeqCst),
            product_id: row.product_id,
            price: row.price,
            stock: row.stock,
            size: row.size,
            sku: None,
            created_at: now,
            updated_at: now,
        };
        self.pending.variants.insert(variant.id, variant.clone());
        Ok(variant)
    }

    async fn set_variant_sku(&mut self, variant_id: i32, sku: &str) -> Result<(), StoreError> {
        if self.sku_taken(sku, variant_id) {
            return Err(StoreError::UniqueViolation("product_variants_sku_key".to_string()));
        }

        let variant = self.pending.variants.get_mut(&variant_id).ok_or(StoreError::NotFound)?;
        variant.sku = Some(sku.to_string());
        Ok(())
    }

    async fn insert_image(&mut self, row: NewImageRow) -> Result<product_images::Model, StoreError> {
        self.require_product(row.product_id)?;

        let now = Utc::now();
        let image = product_images::Model {
            id: self.sequences.image.fetch_add(1, Ordering::SeqCst),
            product_id: row.product_id,
            image_url: row.image_url,
            image_public_id: row.image_public_id,
            display_order: row.display_order,
            created_at: now,
            updated_at: now,
        };
        self.pending.images.insert(image.id, image.clone());
        Ok(image)
    }

    async fn set_total_stock(&mut self, product_id: i32, total_stock: i32) -> Result<(), StoreError> {
        let product = self.pending.products.get_mut(&product_id).ok_or(StoreError::NotFound)?;
        product.total_stock = total_stock;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryCatalogTx { shared, pending, .. } = *self;
        let mut state = shared.lock().unwrap();

        // another transaction may have committed the same slug or SKU meanwhile
        if pending.products.values().any(|p| state.slug_taken(&p.slug, None)) {
            return Err(StoreError::UniqueViolation("products_slug_key".to_string()));
        }
        let sku_clash = pending
            .variants
            .values()
            .filter_map(|v| v.sku.as_deref())
            .any(|sku| state.sku_taken(sku, None));
        if sku_clash {
            return Err(StoreError::UniqueViolation("product_variants_sku_key".to_string()));
        }

        state.products.extend(pending.products);
        state.variants.extend(pending.variants);
        state.images.extend(pending.images);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Names
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryNameResolver {
    categories: HashMap<i32, String>,
    brands: HashMap<i32, String>,
}

impl MemoryNameResolver {
    pub fn with_category(mut self, id: i32, name: &str) -> Self {
        self.categories.insert(id, name.to_string());
        self
    }

    pub fn with_brand(mut self, id: i32, name: &str) -> Self {
        self.brands.insert(id, name.to_string());
        self
    }
}

#[async_trait]
impl NameResolver for MemoryNameResolver {
    async fn category_name(&self, id: i32) -> Result<String, StoreError> {
        self.categories.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn brand_name(&self, id: i32) -> Result<String, StoreError> {
        self.brands.get(&id).cloned().ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product_row(slug: &str) -> NewProductRow {
        NewProductRow {
            name: slug.to_string(),
            slug: slug.to_string(),
            description: None,
            category_id: 1,
            brand_id: 1,
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_invisible() {
        let store = MemoryCatalogStore::default();

        let mut tx = store.begin().await.unwrap();
        let product = tx.insert_product(product_row("shirt")).await.unwrap();
        tx.insert_variant(NewVariantRow {
            product_id: product.id,
            price: Decimal::new(100, 0),
            stock: 2,
            size: "M".to_string(),
        })
            .await
            .unwrap();
        assert_eq!(store.product_count(), 0);

        tx.rollback().await.unwrap();
        assert_eq!(store.product_count(), 0);
        assert_eq!(store.variant_count(), 0);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_rollback() {
        let store = MemoryCatalogStore::default();

        let mut tx = store.begin().await.unwrap();
        let first = tx.insert_product(product_row("a")).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let second = tx.insert_product(product_row("a")).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.product_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_unique_violation() {
        let store = MemoryCatalogStore::default();
        let mut tx = store.begin().await.unwrap();
        tx.insert_product(product_row("shirt")).await.unwrap();

        let err = tx.insert_product(product_row("shirt")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn overlapping_transactions_both_keep_their_writes() {
        let store = MemoryCatalogStore::default();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.insert_product(product_row("shirt")).await.unwrap();
        second.insert_product(product_row("jacket")).await.unwrap();

        first.commit().await.unwrap();
        second.commit().await.unwrap();

        assert_eq!(store.product_count(), 2);
    }

    #[tokio::test]
    async fn commit_detects_slug_taken_by_a_concurrent_commit() {
        let store = MemoryCatalogStore::default();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.insert_product(product_row("shirt")).await.unwrap();
        second.insert_product(product_row("shirt")).await.unwrap();

        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(StoreError::UniqueViolation(_))));
        assert_eq!(store.product_count(), 1);
    }
}
