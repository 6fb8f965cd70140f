use std::io;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shop_backend::config::AppConfig;
use shop_backend::services::auth_service::AuthService;
use shop_backend::services::object_storage::CloudinaryStorage;
use shop_backend::services::product_service::ProductService;
use shop_backend::stores::{SeaCatalogStore, SeaNameResolver, SeaSessionStore, SeaUserStore};
use shop_backend::utils::jwt::TokenIssuer;
use shop_backend::{db, middleware, routes};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let config = AppConfig::from_env().map_err(io::Error::other)?;

    info!("connecting to database");
    let db = db::establish_connection(&config.database)
        .await
        .map_err(io::Error::other)?;
    info!("database connected");

    db::bootstrap_schema(&db).await.map_err(io::Error::other)?;

    let issuer = TokenIssuer::from_config(&config.jwt);
    let storage = CloudinaryStorage::new(&config.cloudinary).map_err(io::Error::other)?;

    let auth = web::Data::new(AuthService::new(
        Arc::new(SeaUserStore::new(db.clone())),
        Arc::new(SeaSessionStore::new(db.clone())),
        issuer.clone(),
    ));
    let products = web::Data::new(ProductService::new(
        Arc::new(SeaCatalogStore::new(db.clone())),
        Arc::new(SeaNameResolver::new(db.clone())),
        Arc::new(storage),
    ));
    let issuer = web::Data::new(issuer);
    let db = web::Data::new(db);

    let cors = config.cors.clone();
    let (host, port) = (config.server.host.clone(), config.server.port);
    info!(%host, port, "starting server");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::cors(&cors))
            .wrap(Logger::default())
            .app_data(db.clone())
            .app_data(issuer.clone())
            .app_data(auth.clone())
            .app_data(products.clone())
            .configure(routes::configure_routes)
    })
        .bind((host.as_str(), port))?
        .run()
        .await
}
