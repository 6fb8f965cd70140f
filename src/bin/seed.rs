//! Provisions the first admin account. Safe to run more than once.

use std::io;

use tracing::info;
use tracing_subscriber::EnvFilter;

use shop_backend::config::SeedConfig;
use shop_backend::db;
use shop_backend::models::dto::RegisterRequest;
use shop_backend::services::auth_service;
use shop_backend::stores::SeaUserStore;

#[tokio::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = SeedConfig::from_env().map_err(io::Error::other)?;

    let db = db::establish_connection(&config.database)
        .await
        .map_err(io::Error::other)?;
    db::bootstrap_schema(&db).await.map_err(io::Error::other)?;

    let users = SeaUserStore::new(db);
    let request = RegisterRequest {
        email: config.admin_email,
        password: config.admin_password,
        full_name: config.admin_full_name,
        phone: config.admin_phone,
    };

    match auth_service::ensure_admin(&users, request)
        .await
        .map_err(io::Error::other)?
    {
        Some(admin) => info!(user_id = %admin.id, email = %admin.email, "seed completed"),
        None => info!("nothing to seed"),
    }
    Ok(())
}
