//! Stateless bearer-token authentication and route authorization
//!
//! Request pipeline: [`filter::authenticate`] establishes an [`AuthContext`]
//! from the `Authorization` header, then [`policy::authorize`] checks it
//! against the route table before the handler runs. Token issuance goes
//! through [`authenticator::Authenticator`] and [`token::TokenCodec`].

pub mod authenticator;
pub mod filter;
pub mod password;
pub mod policy;
pub mod token;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{
    error::AppError,
    models::{Role, User},
};

/// Authenticated identity. Carries no credential material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Per-request identity, stored in the request extensions.
///
/// Created by the auth filter and dropped with the request.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    principal: Option<Principal>,
    authorities: Vec<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(principal: Principal) -> Self {
        let authorities = vec![principal.role.authority()];
        Self {
            principal: Some(principal),
            authorities,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

/// Extractor for the principal bound by the auth filter
pub struct CurrentUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .and_then(AuthContext::principal)
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
