// database connection pool and schema bootstrap

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::config::DatabaseConfig;

const MIN_IDLE_CONNECTIONS: u32 = 10;
const MAX_CONNECTION_LIFETIME: Duration = Duration::from_secs(60 * 60);

pub async fn establish_connection(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(MIN_IDLE_CONNECTIONS.min(config.max_connections))
        .max_lifetime(MAX_CONNECTION_LIFETIME)
        .sqlx_logging(false);

    Database::connect(options).await
}

/// Tables in dependency order. Every statement is idempotent.
const SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            full_name TEXT NOT NULL,
            email VARCHAR(255) NOT NULL,
            phone VARCHAR(32),
            password_hash TEXT NOT NULL,
            role VARCHAR(20) NOT NULL DEFAULT 'customer' CHECK (role IN ('customer', 'admin')),
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            avatar_url TEXT,
            avatar_public_id TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            last_login TIMESTAMPTZ,
            deleted_at TIMESTAMPTZ,
            CONSTRAINT users_email_key UNIQUE (email)
        )",
    ),
    (
        "sessions",
        "CREATE TABLE IF NOT EXISTS sessions (
            id UUID PRIMARY KEY,
            user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
            refresh_token TEXT NOT NULL,
            user_agent TEXT,
            client_ip VARCHAR(64),
            is_blocked BOOLEAN NOT NULL DEFAULT FALSE,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT sessions_refresh_token_key UNIQUE (refresh_token)
        )",
    ),
    (
        "sessions_user_id_idx",
        "CREATE INDEX IF NOT EXISTS sessions_user_id_idx ON sessions (user_id)",
    ),
    (
        "categories",
        "CREATE TABLE IF NOT EXISTS categories (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            CONSTRAINT categories_slug_key UNIQUE (slug)
        )",
    ),
    (
        "brands",
        "CREATE TABLE IF NOT EXISTS brands (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            CONSTRAINT brands_slug_key UNIQUE (slug)
        )",
    ),
    (
        "products",
        "CREATE TABLE IF NOT EXISTS products (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            description TEXT,
            category_id INTEGER NOT NULL REFERENCES categories (id),
            brand_id INTEGER NOT NULL REFERENCES brands (id),
            total_stock INTEGER NOT NULL DEFAULT 0 CHECK (total_stock >= 0),
            rating_avg DOUBLE PRECISION NOT NULL DEFAULT 0,
            review_count INTEGER NOT NULL DEFAULT 0 CHECK (review_count >= 0),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT products_slug_key UNIQUE (slug)
        )",
    ),
    (
        "product_variants",
        "CREATE TABLE IF NOT EXISTS product_variants (
            id SERIAL PRIMARY KEY,
            product_id INTEGER NOT NULL REFERENCES products (id) ON DELETE CASCADE,
            price NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
            stock INTEGER NOT NULL CHECK (stock >= 0),
            size VARCHAR(50) NOT NULL,
            sku VARCHAR(100),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT product_variants_sku_key UNIQUE (sku)
        )",
    ),
    (
        "product_images",
        "CREATE TABLE IF NOT EXISTS product_images (
            id SERIAL PRIMARY KEY,
            product_id INTEGER NOT NULL REFERENCES products (id) ON DELETE CASCADE,
            image_url TEXT NOT NULL,
            image_public_id TEXT NOT NULL,
            display_order INTEGER NOT NULL CHECK (display_order BETWEEN 1 AND 5),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    ),
];

/// Creates missing tables, indexes and constraints. Safe to run on every start.
pub async fn bootstrap_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    for (name, ddl) in SCHEMA {
        db.execute_unprepared(ddl).await?;
        info!(table = *name, "schema ensured");
    }
    Ok(())
}
