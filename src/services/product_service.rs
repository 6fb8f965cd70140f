use std::sync::Arc;

use tracing::{error, info, warn};
use validator::Validate;

use crate::errors::{ServiceError, ServiceResult, StoreError};
use crate::models::dto::{NewProduct, ProductResponse, UpdateProductRequest};
use crate::services::object_storage::ObjectStorage;
use crate::stores::{
    CatalogStore, CatalogTx, NameResolver, NewImageRow, NewProductRow, NewVariantRow, ProductAggregate,
    ProductChanges,
};
use crate::utils::slug::{generate_sku, slugify, total_stock};

pub const MAX_PRODUCT_IMAGES: usize = 5;
const IMAGE_FOLDER: &str = "products";

/// Catalog workflows. Creation builds the whole product aggregate
/// (product, variants with SKUs, uploaded images, total stock) in one transaction.
pub struct ProductService {
    catalog: Arc<dyn CatalogStore>,
    names: Arc<dyn NameResolver>,
    storage: Arc<dyn ObjectStorage>,
}

impl ProductService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        names: Arc<dyn NameResolver>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self { catalog, names, storage }
    }

    pub async fn create(&self, command: NewProduct) -> ServiceResult<ProductResponse> {
        // 1. Validate before touching the store or the storage
        command.validate()?;
        if command.variants.is_empty() {
            return Err(ServiceError::Validation("at least 1 variant is required".to_string()));
        }
        if command.images.is_empty() || command.images.len() > MAX_PRODUCT_IMAGES {
            return Err(ServiceError::Validation(format!(
                "between 1 and {} images are required, got {}",
                MAX_PRODUCT_IMAGES,
                command.images.len()
            )));
        }
        let slug = slug_for(&command.name)?;

        // 2. Display names, the category one feeds the SKUs
        let category_name = self.category_name(command.category_id).await?;
        self.brand_name(command.brand_id).await?;

        // 3. Build everything inside one transaction
        let mut tx = self.catalog.begin().await?;
        let mut uploaded = Vec::new();

        let built = self.build(tx.as_mut(), command, slug, &category_name, &mut uploaded).await;
        let result = match built {
            Ok(aggregate) => tx.commit().await.map(|_| aggregate).map_err(ServiceError::from),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "rollback of product creation failed");
                }
                Err(e)
            }
        };

        match result {
            Ok(aggregate) => {
                info!(
                    product_id = aggregate.product.id,
                    variants = aggregate.variants.len(),
                    images = aggregate.images.len(),
                    "product created"
                );
                Ok(aggregate.into())
            }
            Err(e) => {
                // uploads cannot be undone, leave them for reconciliation
                if !uploaded.is_empty() {
                    warn!(public_ids = ?uploaded, error = %e, "product creation failed, uploaded assets are orphaned");
                }
                Err(e)
            }
        }
    }

    async fn build(
        &self,
        tx: &mut dyn CatalogTx,
        command: NewProduct,
        slug: String,
        category_name: &str,
        uploaded: &mut Vec<String>,
    ) -> ServiceResult<ProductAggregate> {
        // Product row, total stock filled in at the end
        let mut product = tx
            .insert_product(NewProductRow {
                name: command.name,
                slug,
                description: command.description,
                category_id: command.category_id,
                brand_id: command.brand_id,
            })
            .await?;

        // Variants: the SKU embeds the row id, so insert first then set it
        let mut variants = Vec::with_capacity(command.variants.len());
        for input in command.variants {
            let mut variant = tx
                .insert_variant(NewVariantRow {
                    product_id: product.id,
                    price: input.price,
                    stock: input.stock,
                    size: input.size,
                })
                .await?;

            let sku = generate_sku(category_name, &product.name, variant.id);
            tx.set_variant_sku(variant.id, &sku).await?;
            variant.sku = Some(sku);
            variants.push(variant);
        }

        // Images, display order starts at 1
        let mut images = Vec::with_capacity(command.images.len());
        for (display_order, bytes) in (1..).zip(command.images) {
            let asset = self.storage.upload(bytes, IMAGE_FOLDER).await.map_err(|e| {
                error!(product_id = product.id, display_order, error = %e, "image upload failed");
                ServiceError::Upload(e.to_string())
            })?;
            uploaded.push(asset.public_id.clone());

            let image = tx
                .insert_image(NewImageRow {
                    product_id: product.id,
                    image_url: asset.url,
                    image_public_id: asset.public_id,
                    display_order,
                })
                .await?;
            images.push(image);
        }

        let total = total_stock(variants.iter().map(|v| v.stock))
            .ok_or_else(|| ServiceError::Validation("total stock is too large".to_string()))?;
        tx.set_total_stock(product.id, total).await?;
        product.total_stock = total;

        Ok(ProductAggregate { product, variants, images })
    }

    pub async fn get(&self, id: i32) -> ServiceResult<ProductResponse> {
        self.catalog
            .find_product(id)
            .await
            .map(ProductResponse::from)
            .map_err(product_not_found)
    }

    pub async fn list(&self) -> ServiceResult<Vec<ProductResponse>> {
        let products = self.catalog.list_products().await?;
        Ok(products.into_iter().map(ProductResponse::from).collect())
    }

    /// Overwrites only the supplied fields; a new name also renews the slug.
    pub async fn update(&self, id: i32, request: UpdateProductRequest) -> ServiceResult<ProductResponse> {
        request.validate()?;

        if let Some(category_id) = request.category_id {
            self.category_name(category_id).await?;
        }
        if let Some(brand_id) = request.brand_id {
            self.brand_name(brand_id).await?;
        }
        let slug = request.name.as_deref().map(slug_for).transpose()?;

        let changes = ProductChanges {
            name: request.name,
            slug,
            description: request.description,
            category_id: request.category_id,
            brand_id: request.brand_id,
        };
        self.catalog.update_product(id, changes).await.map_err(product_not_found)?;

        info!(product_id = id, "product updated");
        self.get(id).await
    }

    /// Removes the product and its rows, then deletes the stored images.
    /// Storage failures are logged and do not fail the call.
    pub async fn delete(&self, id: i32) -> ServiceResult<()> {
        let images = self.catalog.delete_product(id).await.map_err(product_not_found)?;

        for image in images.iter().filter(|img| !img.image_public_id.is_empty()) {
            if let Err(e) = self.storage.delete(&image.image_public_id).await {
                warn!(product_id = id, public_id = %image.image_public_id, error = %e, "failed to delete stored image");
            }
        }

        info!(product_id = id, images = images.len(), "product deleted");
        Ok(())
    }

    async fn category_name(&self, id: i32) -> ServiceResult<String> {
        self.names.category_name(id).await.map_err(|e| match e {
            StoreError::NotFound => ServiceError::Validation(format!("category {} does not exist", id)),
            other => other.into(),
        })
    }

    async fn brand_name(&self, id: i32) -> ServiceResult<String> {
        self.names.brand_name(id).await.map_err(|e| match e {
            StoreError::NotFound => ServiceError::Validation(format!("brand {} does not exist", id)),
            other => other.into(),
        })
    }
}

fn slug_for(name: &str) -> ServiceResult<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ServiceError::Validation("name must contain letters or digits".to_string()));
    }
    Ok(slug)
}

fn product_not_found(err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound => ServiceError::NotFound("product".to_string()),
        other => other.into(),
    }
}
