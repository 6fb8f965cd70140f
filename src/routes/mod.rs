pub mod auth;
pub mod error;
pub mod health;
pub mod products;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::errors::ServiceError;

/// Product payloads carry up to five base64 images.
const JSON_LIMIT_BYTES: usize = 25 * 1024 * 1024;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(json_config())
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(products::product_routes),
    );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
            ServiceError::Validation(format!("invalid JSON body: {}", err)).into()
        })
}

/// Services backed by the in-memory stores, for route tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use actix_web::web;
    use chrono::Duration;
    use uuid::Uuid;

    use crate::models::users::Role;
    use crate::services::auth_service::AuthService;
    use crate::services::object_storage::fake::FakeStorage;
    use crate::services::product_service::ProductService;
    use crate::stores::memory::{MemoryCatalogStore, MemoryNameResolver, MemorySessionStore, MemoryUserStore};
    use crate::utils::jwt::TokenIssuer;

    pub struct AppState {
        issuer: web::Data<TokenIssuer>,
        auth: web::Data<AuthService>,
        products: web::Data<ProductService>,
    }

    impl AppState {
        pub fn new() -> Self {
            let issuer = TokenIssuer::new("route-test-secret", Duration::minutes(15), Duration::days(7));
            let auth = AuthService::new(
                Arc::new(MemoryUserStore::default()),
                Arc::new(MemorySessionStore::default()),
                issuer.clone(),
            );
            let products = ProductService::new(
                Arc::new(MemoryCatalogStore::default()),
                Arc::new(MemoryNameResolver::default().with_category(1, "Áo thun").with_brand(1, "Local Brand")),
                Arc::new(FakeStorage::default()),
            );

            Self {
                issuer: web::Data::new(issuer),
                auth: web::Data::new(auth),
                products: web::Data::new(products),
            }
        }

        pub fn register(&self, cfg: &mut web::ServiceConfig) {
            cfg.app_data(self.issuer.clone())
                .app_data(self.auth.clone())
                .app_data(self.products.clone());
        }

        pub fn bearer(&self, user_id: Uuid, role: Role) -> (&'static str, String) {
            let token = self.issuer.issue_access_token(user_id, role).unwrap();
            ("Authorization", format!("Bearer {}", token))
        }
    }
}
