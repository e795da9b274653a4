//! Registration, login and token issuance

use std::sync::Arc;

use chrono::Utc;

use crate::{
    auth::{authenticator::Authenticator, password, token::TokenCodec, Principal},
    error::{AppError, AppResult},
    models::{NewUser, RegisterRequest, Role, TokenResponse, User},
    repository::{normalize_email, UserStore},
};

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    authenticator: Authenticator<dyn UserStore>,
    tokens: Arc<TokenCodec>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        authenticator: Authenticator<dyn UserStore>,
        tokens: Arc<TokenCodec>,
    ) -> Self {
        Self {
            users,
            authenticator,
            tokens,
        }
    }

    /// Register a new USER principal and return a token for it
    pub async fn register(&self, request: RegisterRequest) -> AppResult<TokenResponse> {
        let email = normalize_email(&request.email);
        if self.users.exists_by_email(&email).await? {
            return Err(AppError::DuplicateIdentity(format!(
                "Email already exists: {}",
                email
            )));
        }

        let user = self
            .users
            .create(NewUser {
                email,
                password_hash: password::hash_password(&request.password)?,
                first_name: request.first_name,
                last_name: request.last_name,
                role: Role::User,
            })
            .await?;

        tracing::info!(user_id = user.id, "Registered new user");
        self.token_for(&Principal::from(&user))
    }

    /// Check credentials and return a fresh token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<TokenResponse> {
        let principal = self
            .authenticator
            .authenticate(&normalize_email(email), password)
            .await?;
        self.token_for(&principal)
    }

    /// Create the configured administrator unless that email is already taken
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AppResult<Option<User>> {
        let email = normalize_email(email);
        if self.users.exists_by_email(&email).await? {
            return Ok(None);
        }

        let admin = self
            .users
            .create(NewUser {
                email,
                password_hash: password::hash_password(password)?,
                first_name: None,
                last_name: None,
                role: Role::Admin,
            })
            .await?;
        Ok(Some(admin))
    }

    fn token_for(&self, principal: &Principal) -> AppResult<TokenResponse> {
        let token = self
            .tokens
            .issue(&principal.email, Utc::now())
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;
        Ok(TokenResponse { token })
    }
}
