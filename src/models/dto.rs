// request / response shapes shared by routes and services
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{product_images, product_variants, products, users};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 32))]
    pub password: String,
    #[validate(length(min = 2, max = 100))]
    pub full_name: String,
    #[validate(custom(function = "validate_e164"))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Public projection of a user, never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: users::Role,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            role: user.role,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64, // seconds
    pub user: UserResponse,
}

/// E.164: a `+` followed by 8 to 15 digits, no leading zero.
fn validate_e164(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').ok_or_else(|| ValidationError::new("e164"))?;
    let valid = (8..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0');
    if valid { Ok(()) } else { Err(ValidationError::new("e164")) }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VariantInput {
    #[validate(custom(function = "validate_non_negative"))]
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[validate(length(min = 1, max = 50))]
    pub size: String,
}

/// JSON body of `POST /admin/products`; images are base64 payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category_id: i32,
    pub brand_id: i32,
    pub variants: Vec<VariantInput>,
    pub images: Vec<String>,
}

/// Command consumed by the product aggregate builder.
#[derive(Debug, Clone, Validate)]
pub struct NewProduct {
    #[validate(length(min = 2, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub category_id: i32,
    pub brand_id: i32,
    #[validate(nested)]
    pub variants: Vec<VariantInput>,
    pub images: Vec<Vec<u8>>,
}

/// Partial update: `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 2, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub brand_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: i32,
    pub brand_id: i32,
    pub total_stock: i32,
    pub rating_avg: f64,
    pub review_count: i32,
    pub variants: Vec<VariantResponse>,
    pub images: Vec<ImageResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantResponse {
    pub id: i32,
    pub price: Decimal,
    pub stock: i32,
    pub size: String,
    pub sku: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageResponse {
    pub id: i32,
    pub image_url: String,
    pub display_order: i32,
}

impl ProductResponse {
    pub fn from_parts(
        product: products::Model,
        variants: Vec<product_variants::Model>,
        images: Vec<product_images::Model>,
    ) -> Self {
        Self {
            id: product.id,
            name: product.name,
            slug: product.slug,
            description: product.description,
            category_id: product.category_id,
            brand_id: product.brand_id,
            total_stock: product.total_stock,
            rating_avg: product.rating_avg,
            review_count: product.review_count,
            variants: variants
                .into_iter()
                .map(|v| VariantResponse {
                    id: v.id,
                    price: v.price,
                    stock: v.stock,
                    size: v.size,
                    sku: v.sku.unwrap_or_default(),
                })
                .collect(),
            images: images
                .into_iter()
                .map(|img| ImageResponse {
                    id: img.id,
                    image_url: img.image_url,
                    display_order: img.display_order,
                })
                .collect(),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("non_negative"));
    }
    Ok(())
}
