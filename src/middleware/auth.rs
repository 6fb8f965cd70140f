use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use tracing::debug;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::users::Role;
use crate::utils::jwt::TokenIssuer;

/// Identity carried by a verified access token.
/// Used as an extractor by every route that needs a logged-in caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // 1. Token issuer registered in main
        let Some(issuer) = req.app_data::<web::Data<TokenIssuer>>() else {
            return ready(Err(ServiceError::Internal("token issuer is not configured".to_string())));
        };

        // 2. Header -> claims
        let header_value = req
            .headers()
            .get(header::AUTHORIZATION)
            .map(|value| value.to_str().unwrap_or_default());

        ready(authenticate(header_value, issuer))
    }
}

/// Checks an `Authorization` header value. No store access.
pub fn authenticate(header_value: Option<&str>, issuer: &TokenIssuer) -> Result<AuthUser, ServiceError> {
    let header_value = header_value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("missing Authorization header".to_string()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ServiceError::Unauthorized("invalid Authorization format, expected: Bearer <token>".to_string())
        })?;

    let claims = issuer.verify(token).map_err(|e| {
        debug!(error = %e, "rejected access token");
        ServiceError::Unauthorized("invalid or expired token".to_string())
    })?;

    Ok(AuthUser {
        user_id: claims.sub,
        role: claims.role,
    })
}
