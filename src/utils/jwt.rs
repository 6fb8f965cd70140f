use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::users::Role;

/// Only algorithm accepted for access tokens, whatever the token header says.
const ACCESS_TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Entropy of refresh tokens, in bytes.
const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user id
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Signs an access token for `user_id` valid from `now` until `now + ttl`.
pub fn sign_access_token(
    user_id: Uuid,
    role: Role,
    secret: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Signing("secret is empty".to_string()));
    }

    let expiration = now
        .checked_add_signed(ttl)
        .ok_or_else(|| TokenError::Signing("failed to calculate expiration".to_string()))?;

    let claims = Claims {
        sub: user_id,
        role,
        iat: now.timestamp(),
        exp: expiration.timestamp(),
    };

    encode(
        &Header::new(ACCESS_TOKEN_ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
        .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Verifies signature, algorithm and expiry, then returns the claims.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(ACCESS_TOKEN_ALGORITHM);
    validation.algorithms = vec![ACCESS_TOKEN_ALGORITHM];
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
        .map(|data| data.claims)
        .map_err(|e| TokenError::Invalid(e.to_string()))
}

/// Opaque refresh token: 256 random bits, URL-safe base64.
///
/// Carries no claims; it is only meaningful through its session row.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Mints access and refresh tokens with the configured lifetimes.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(config.secret.clone(), config.access_ttl, config.refresh_ttl)
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access_token(&self, user_id: Uuid, role: Role) -> Result<String, TokenError> {
        sign_access_token(user_id, role, &self.secret, self.access_ttl, Utc::now())
    }

    pub fn issue_refresh_token(&self) -> String {
        generate_refresh_token()
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        verify_access_token(token, &self.secret)
    }
}
