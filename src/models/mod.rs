// ============================================================================
// MODELS
// ============================================================================
//
// One SeaORM entity per PostgreSQL table, plus the API shapes in `dto`.
//
//   - users            : accounts (customer / admin), soft-deletable
//   - sessions         : refresh tokens, one row per login
//   - products         : catalog entries, owns variants and images
//   - product_variants : price / stock / size, SKU derived from the row id
//   - product_images   : stored assets, display order 1..=5
//   - categories       : read-only here, names feed SKUs
//   - brands           : read-only here
//   - health           : health check payload
//   - dto              : request / response bodies
//
// ============================================================================

pub mod brands;
pub mod categories;
pub mod dto;
pub mod health;
pub mod product_images;
pub mod product_variants;
pub mod products;
pub mod sessions;
pub mod users;
