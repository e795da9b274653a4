//! User profile queries

use std::sync::Arc;

use crate::{
    auth::Principal,
    error::{AppError, AppResult},
    models::User,
    repository::UserStore,
};

#[derive(Clone)]
pub struct UsersService {
    users: Arc<dyn UserStore>,
}

impl UsersService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Profile of the authenticated principal
    pub async fn me(&self, principal: &Principal) -> AppResult<User> {
        self.get_by_id(principal.id).await
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.users.find_all().await
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with id: {}", id)))
    }
}
