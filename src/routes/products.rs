use actix_web::{delete, get, post, put, web, HttpResponse};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::json;
use tracing::info;

use crate::errors::ServiceError;
use crate::middleware::RequireAdmin;
use crate::models::dto::{CreateProductRequest, NewProduct, UpdateProductRequest};
use crate::services::product_service::ProductService;

/// POST /admin/products - create product + variants + images in one go
#[post("")]
pub async fn create_product(
    RequireAdmin(admin): RequireAdmin,
    body: web::Json<CreateProductRequest>,
    products: web::Data<ProductService>,
) -> Result<HttpResponse, ServiceError> {
    // 1. Decode the image payloads
    let request = body.into_inner();
    let images = request
        .images
        .iter()
        .enumerate()
        .map(|(index, payload)| decode_image(payload).map_err(|e| {
            ServiceError::Validation(format!("image {} is not valid base64: {}", index + 1, e))
        }))
        .collect::<Result<Vec<_>, _>>()?;

    // 2. Build the aggregate
    let product = products
        .create(NewProduct {
            name: request.name,
            description: request.description,
            category_id: request.category_id,
            brand_id: request.brand_id,
            variants: request.variants,
            images,
        })
        .await?;
    info!(admin_id = %admin.user_id, product_id = product.id, action = "create", "admin catalog change");

    Ok(HttpResponse::Created().json(json!({
        "message": "product created",
        "data": product,
    })))
}

/// GET /admin/products
#[get("")]
pub async fn list_products(
    _admin: RequireAdmin,
    products: web::Data<ProductService>,
) -> Result<HttpResponse, ServiceError> {
    let all = products.list().await?;
    Ok(HttpResponse::Ok().json(json!({ "data": all })))
}

/// GET /admin/products/{id}
#[get("/{id}")]
pub async fn get_product(
    _admin: RequireAdmin,
    path: web::Path<i32>,
    products: web::Data<ProductService>,
) -> Result<HttpResponse, ServiceError> {
    let product = products.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": product })))
}

/// PUT /admin/products/{id} - partial update, absent fields are kept
#[put("/{id}")]
pub async fn update_product(
    RequireAdmin(admin): RequireAdmin,
    path: web::Path<i32>,
    body: web::Json<UpdateProductRequest>,
    products: web::Data<ProductService>,
) -> Result<HttpResponse, ServiceError> {
    let product = products.update(path.into_inner(), body.into_inner()).await?;
    info!(admin_id = %admin.user_id, product_id = product.id, action = "update", "admin catalog change");
    Ok(HttpResponse::Ok().json(json!({
        "message": "product updated",
        "data": product,
    })))
}

/// DELETE /admin/products/{id}
#[delete("/{id}")]
pub async fn delete_product(
    RequireAdmin(admin): RequireAdmin,
    path: web::Path<i32>,
    products: web::Data<ProductService>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    products.delete(id).await?;
    info!(admin_id = %admin.user_id, product_id = id, action = "delete", "admin catalog change");
    Ok(HttpResponse::Ok().json(json!({ "message": "product deleted" })))
}

/// Accepts raw base64 or a `data:<mime>;base64,<payload>` URL.
fn decode_image(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded = match payload.split_once("base64,") {
        Some((_, data)) => data,
        None => payload,
    };
    STANDARD.decode(encoded.trim())
}

pub fn product_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/products")
            .service(create_product)
            .service(list_products)
            .service(get_product)
            .service(update_product)
            .service(delete_product),
    );
}
