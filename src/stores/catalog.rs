use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};

use super::{CatalogStore, CatalogTx, NameResolver, NewImageRow, NewProductRow, NewVariantRow, ProductAggregate, ProductChanges};
use crate::errors::StoreError;
use crate::models::{brands, categories, product_images, product_variants, products};

pub struct SeaCatalogStore {
    db: DatabaseConnection,
}

impl SeaCatalogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Open SeaORM transaction; dropped without `commit` it rolls back.
pub struct SeaCatalogTx {
    txn: DatabaseTransaction,
}

#[async_trait]
impl CatalogStore for SeaCatalogStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError> {
        let txn = self.db.begin().await?;
        Ok(Box::new(SeaCatalogTx { txn }))
    }

    async fn find_product(&self, id: i32) -> Result<ProductAggregate, StoreError> {
        load_aggregate(&self.db, id).await
    }

    async fn list_products(&self) -> Result<Vec<ProductAggregate>, StoreError> {
        let products = products::Entity::find()
            .order_by_asc(products::Column::Id)
            .all(&self.db)
            .await?;
        let ids: Vec<i32> = products.iter().map(|p| p.id).collect();

        let mut variants: HashMap<i32, Vec<product_variants::Model>> = HashMap::new();
        for variant in product_variants::Entity::find()
            .filter(product_variants::Column::ProductId.is_in(ids.clone()))
            .order_by_asc(product_variants::Column::Id)
            .all(&self.db)
            .await?
        {
            variants.entry(variant.product_id).or_default().push(variant);
        }

        let mut images: HashMap<i32, Vec<product_images::Model>> = HashMap::new();
        for image in product_images::Entity::find()
            .filter(product_images::Column::ProductId.is_in(ids))
            .order_by_asc(product_images::Column::DisplayOrder)
            .all(&self.db)
            .await?
        {
            images.entry(image.product_id).or_default().push(image);
        }

        Ok(products
            .into_iter()
            .map(|product| ProductAggregate {
                variants: variants.remove(&product.id).unwrap_or_default(),
                images: images.remove(&product.id).unwrap_or_default(),
                product,
            })
            .collect())
    }

    async fn update_product(&self, id: i32, changes: ProductChanges) -> Result<products::Model, StoreError> {
        let mut product = products::ActiveModel {
            id: Unchanged(id),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(name) = changes.name {
            product.name = Set(name);
        }
        if let Some(slug) = changes.slug {
            product.slug = Set(slug);
        }
        if let Some(description) = changes.description {
            product.description = Set(Some(description));
        }
        if let Some(category_id) = changes.category_id {
            product.category_id = Set(category_id);
        }
        if let Some(brand_id) = changes.brand_id {
            product.brand_id = Set(brand_id);
        }

        Ok(product.update(&self.db).await?)
    }

    async fn delete_product(&self, id: i32) -> Result<Vec<product_images::Model>, StoreError> {
        let txn = self.db.begin().await?;

        let images = product_images::Entity::find()
            .filter(product_images::Column::ProductId.eq(id))
            .all(&txn)
            .await?;

        product_images::Entity::delete_many()
            .filter(product_images::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        product_variants::Entity::delete_many()
            .filter(product_variants::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;

        let deleted = products::Entity::delete_by_id(id).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Err(StoreError::NotFound);
        }

        txn.commit().await?;
        Ok(images)
    }
}

#[async_trait]
impl CatalogTx for SeaCatalogTx {
    async fn insert_product(&mut self, row: NewProductRow) -> Result<products::Model, StoreError> {
        let now = Utc::now();
        let product = products::ActiveModel {
            name: Set(row.name),
            slug: Set(row.slug),
            description: Set(row.description),
            category_id: Set(row.category_id),
            brand_id: Set(row.brand_id),
            total_stock: Set(0),
            rating_avg: Set(0.0),
            review_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(product.insert(&self.txn).await?)
    }

    async fn insert_variant(&mut self, row: NewVariantRow) -> Result<product_variants::Model, StoreError> {
        let now = Utc::now();
        let variant = product_variants::ActiveModel {
            product_id: Set(row.product_id),
            price: Set(row.price),
            stock: Set(row.stock),
            size: Set(row.size),
            sku: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(variant.insert(&self.txn).await?)
    }

    async fn set_variant_sku(&mut self, variant_id: i32, sku: &str) -> Result<(), StoreError> {
        let variant = product_variants::ActiveModel {
            id: Unchanged(variant_id),
            sku: Set(Some(sku.to_string())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        variant.update(&self.txn).await?;
        Ok(())
    }

    async fn insert_image(&mut self, row: NewImageRow) -> Result<product_images::Model, StoreError> {
        let now = Utc::now();
        let image = product_images::ActiveModel {
            product_id: Set(row.product_id),
            image_url: Set(row.image_url),
            image_public_id: Set(row.image_public_id),
            display_order: Set(row.display_order),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(image.insert(&self.txn).await?)
    }

    async fn set_total_stock(&mut self, product_id: i32, total_stock: i32) -> Result<(), StoreError> {
        let product = products::ActiveModel {
            id: Unchanged(product_id),
            total_stock: Set(total_stock),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        product.update(&self.txn).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        Ok(self.txn.commit().await?)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(self.txn.rollback().await?)
    }
}

async fn load_aggregate<C: ConnectionTrait>(conn: &C, id: i32) -> Result<ProductAggregate, StoreError> {
    let product = products::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(StoreError::NotFound)?;

    let variants = product_variants::Entity::find()
        .filter(product_variants::Column::ProductId.eq(id))
        .order_by_asc(product_variants::Column::Id)
        .all(conn)
        .await?;

    let images = product_images::Entity::find()
        .filter(product_images::Column::ProductId.eq(id))
        .order_by_asc(product_images::Column::DisplayOrder)
        .all(conn)
        .await?;

    Ok(ProductAggregate { product, variants, images })
}

/// Category and brand display names, read from their own tables.
pub struct SeaNameResolver {
    db: DatabaseConnection,
}

impl SeaNameResolver {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NameResolver for SeaNameResolver {
    async fn category_name(&self, id: i32) -> Result<String, StoreError> {
        categories::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|category| category.name)
            .ok_or(StoreError::NotFound)
    }

    async fn brand_name(&self, id: i32) -> Result<String, StoreError> {
        brands::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|brand| brand.name)
            .ok_or(StoreError::NotFound)
    }
}
