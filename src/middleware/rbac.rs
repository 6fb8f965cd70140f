//! Role checks layered on top of [`AuthUser`].

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use tracing::warn;

use super::auth::AuthUser;
use crate::errors::ServiceError;
use crate::models::users::Role;

/// Lets `user` through when its role is in `allowed`.
pub fn authorize(user: &AuthUser, allowed: &[Role]) -> Result<(), ServiceError> {
    if allowed.contains(&user.role) {
        return Ok(());
    }
    warn!(user_id = %user.user_id, role = user.role.as_str(), "role not allowed");
    Err(ServiceError::Forbidden)
}

/// Requires the `admin` role. 401 without a valid token, 403 for other roles.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub AuthUser);

impl FromRequest for RequireAdmin {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let result = AuthUser::from_request(req, payload)
            .into_inner()
            .and_then(|user| authorize(&user, &[Role::Admin]).map(|_| RequireAdmin(user)));
        ready(result)
    }
}
