//! Business logic services

pub mod auth;
pub mod catalog;
pub mod users;

use std::sync::Arc;

use crate::{
    auth::{
        authenticator::Authenticator, filter::RequestAuthFilter, policy::AuthorizationPolicy,
        token::TokenCodec,
    },
    config::AuthConfig,
    error::AppResult,
    repository::{Repository, UserStore},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub auth: auth::AuthService,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub auth_filter: RequestAuthFilter<dyn UserStore>,
    pub policy: Arc<AuthorizationPolicy>,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: &AuthConfig) -> AppResult<Self> {
        let tokens = Arc::new(TokenCodec::from_config(auth_config));
        let authenticator = Authenticator::new(repository.users.clone())?;

        Ok(Self {
            auth: auth::AuthService::new(repository.users.clone(), authenticator, tokens.clone()),
            users: users::UsersService::new(repository.users.clone()),
            catalog: catalog::CatalogService::new(repository.books.clone()),
            auth_filter: RequestAuthFilter::new(tokens, repository.users.clone()),
            policy: Arc::new(AuthorizationPolicy::library()),
            repository,
        })
    }
}
