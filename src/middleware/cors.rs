//! Cross-origin policy for browser clients.

use actix_cors::Cors;
use actix_web::http::{header, Method};

use crate::config::CorsConfig;

/// Allows the configured origins to send credentials and the `Authorization`
/// header. Preflight answers are cached for `max_age_secs`.
pub fn cors(config: &CorsConfig) -> Cors {
    let policy = Cors::default()
        .allowed_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allowed_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .expose_headers([header::CONTENT_LENGTH])
        .supports_credentials()
        .max_age(config.max_age_secs);

    config
        .allowed_origins
        .iter()
        .fold(policy, |policy, origin| policy.allowed_origin(origin))
}
