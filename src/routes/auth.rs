use actix_web::{get, http::header, post, web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::errors::ServiceError;
use crate::middleware::AuthUser;
use crate::models::dto::{LoginRequest, RefreshTokenRequest, RegisterRequest};
use crate::services::auth_service::{AuthService, ClientInfo};

/// POST /auth/register - create a customer account (public)
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ServiceError> {
    let user = auth.register(body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "registered",
        "data": user,
    })))
}

/// POST /auth/login - exchange credentials for tokens (public)
#[post("/login")]
pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ServiceError> {
    let client = client_info(&req);
    let tokens = auth.login(body.into_inner(), client).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "logged in",
        "data": tokens,
    })))
}

/// POST /auth/refresh-token - new access token for a live session (public)
#[post("/refresh-token")]
pub async fn refresh_token(
    body: web::Json<RefreshTokenRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ServiceError> {
    let tokens = auth.refresh_token(body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "token refreshed",
        "data": tokens,
    })))
}

/// POST /auth/logout - revoke the session of a refresh token (public)
#[post("/logout")]
pub async fn logout(
    body: web::Json<RefreshTokenRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ServiceError> {
    auth.logout(body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "logged out" })))
}

/// GET /me - profile of the caller (authenticated)
#[get("/me")]
pub async fn me(
    auth_user: AuthUser,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ServiceError> {
    let profile = auth.get_profile(auth_user.user_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "data": profile })))
}

fn client_info(req: &HttpRequest) -> ClientInfo {
    ClientInfo {
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        client_ip: req.connection_info().realip_remote_addr().map(str::to_string),
    }
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(refresh_token)
            .service(logout),
    )
        .service(me);
}
