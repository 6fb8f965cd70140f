use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ServiceError, ServiceResult, StoreError};
use crate::models::dto::{LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest, UserResponse};
use crate::models::users::{self, Role};
use crate::stores::{NewSession, NewUser, SessionStore, UserStore};
use crate::utils::jwt::TokenIssuer;
use crate::utils::password;

/// Request metadata stored with a session.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
}

/// Register / login / refresh / logout / profile.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<dyn SessionStore>, tokens: TokenIssuer) -> Self {
        Self { users, sessions, tokens }
    }

    /// Creates an active customer account.
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<UserResponse> {
        let user = create_account(self.users.as_ref(), request, Role::Customer).await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Verifies credentials and opens a new session.
    pub async fn login(&self, request: LoginRequest, client: ClientInfo) -> ServiceResult<LoginResponse> {
        request.validate()?;
        let email = normalize_email(&request.email);

        // 1. Find the account
        let user = self
            .users
            .find_by_email(&email)
            .await
            .map_err(invalid_credentials_if_missing)?;

        if !user.is_active {
            warn!(user_id = %user.id, "login attempt on inactive account");
            return Err(ServiceError::InvalidCredentials);
        }

        // 2. Check the password
        let matches = password::verify_password(&request.password, &user.password_hash).map_err(|e| {
            error!(user_id = %user.id, error = %e, "stored password hash is unreadable");
            ServiceError::Internal(e.to_string())
        })?;
        if !matches {
            return Err(ServiceError::InvalidCredentials);
        }

        // 3. Tokens
        let access_token = self.access_token_for(&user)?;
        let refresh_token = self.tokens.issue_refresh_token();

        // 4. Record the login before the session exists
        let now = Utc::now();
        self.users.touch_last_login(user.id, now).await?;

        let session = self
            .sessions
            .create(NewSession {
                user_id: user.id,
                refresh_token: refresh_token.clone(),
                user_agent: client.user_agent,
                client_ip: client.client_ip,
                expires_at: now + self.tokens.refresh_ttl(),
            })
            .await?;

        info!(user_id = %user.id, session_id = %session.id, "user logged in");
        Ok(self.login_response(access_token, refresh_token, user))
    }

    /// Mints a new access token from a live session. The refresh token is kept.
    pub async fn refresh_token(&self, request: RefreshTokenRequest) -> ServiceResult<LoginResponse> {
        request.validate()?;

        let session = self
            .sessions
            .find_by_refresh_token(&request.refresh_token)
            .await
            .map_err(invalid_credentials_if_missing)?;

        if !session.is_valid_at(Utc::now()) {
            warn!(session_id = %session.id, blocked = session.is_blocked, "refresh with unusable session");
            return Err(ServiceError::InvalidCredentials);
        }

        let user = self
            .users
            .find_by_id(session.user_id)
            .await
            .map_err(invalid_credentials_if_missing)?;
        if !user.is_active {
            return Err(ServiceError::InvalidCredentials);
        }

        let access_token = self.access_token_for(&user)?;
        Ok(self.login_response(access_token, request.refresh_token, user))
    }

    /// Deletes the session owning `refresh_token`.
    pub async fn logout(&self, request: RefreshTokenRequest) -> ServiceResult<()> {
        request.validate()?;

        let session = self
            .sessions
            .find_by_refresh_token(&request.refresh_token)
            .await
            .map_err(invalid_credentials_if_missing)?;

        self.sessions
            .delete(session.id)
            .await
            .map_err(invalid_credentials_if_missing)?;

        info!(user_id = %session.user_id, session_id = %session.id, "user logged out");
        Ok(())
    }

    pub async fn get_profile(&self, user_id: Uuid) -> ServiceResult<UserResponse> {
        match self.users.find_by_id(user_id).await {
            Ok(user) => Ok(user.into()),
            Err(StoreError::NotFound) => Err(ServiceError::NotFound("user".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn access_token_for(&self, user: &users::Model) -> ServiceResult<String> {
        self.tokens.issue_access_token(user.id, user.role).map_err(|e| {
            error!(user_id = %user.id, error = %e, "failed to sign access token");
            ServiceError::Internal(e.to_string())
        })
    }

    fn login_response(&self, access_token: String, refresh_token: String, user: users::Model) -> LoginResponse {
        LoginResponse {
            access_token,
            refresh_token,
            expires_in: self.tokens.access_ttl().num_seconds(),
            user: user.into(),
        }
    }
}

/// Creates the admin account unless the email is already registered.
/// Returns `None` when nothing was created.
pub async fn ensure_admin(users: &dyn UserStore, request: RegisterRequest) -> ServiceResult<Option<UserResponse>> {
    match create_account(users, request, Role::Admin).await {
        Ok(admin) => {
            info!(user_id = %admin.id, "admin account created");
            Ok(Some(admin))
        }
        Err(ServiceError::DuplicateEmail) => {
            info!("admin account already exists");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn create_account(users: &dyn UserStore, request: RegisterRequest, role: Role) -> ServiceResult<UserResponse> {
    request.validate()?;
    let email = normalize_email(&request.email);

    // 1. Reject a taken email before paying for the hash
    match users.find_by_email(&email).await {
        Ok(_) => return Err(ServiceError::DuplicateEmail),
        Err(StoreError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    // 2. Hash the password
    let password_hash = password::hash_password(&request.password).map_err(|e| {
        error!(error = %e, "password hashing failed");
        ServiceError::Internal(e.to_string())
    })?;

    // 3. Insert; the unique index still guards concurrent registrations
    let user = users
        .create(NewUser {
            full_name: request.full_name.trim().to_string(),
            email,
            phone: request.phone,
            password_hash,
            role,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => ServiceError::DuplicateEmail,
            other => other.into(),
        })?;

    Ok(user.into())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Session and credential lookups never say which part was wrong.
fn invalid_credentials_if_missing(err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound => ServiceError::InvalidCredentials,
        other => other.into(),
    }
}
