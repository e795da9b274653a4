//! Repository layer for principals and books
//!
//! The authentication core only reads through [`CredentialStore`]. Writes
//! go through [`UserStore`], whose implementations publish new principals
//! through the same read interface.

pub mod books;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Book, BookInput, NewUser, User},
};

/// Read-only lookup of stored principals, keyed by case-insensitive email
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn exists_by_email(&self, email: &str) -> AppResult<bool>;
}

/// Full user storage
#[async_trait]
pub trait UserStore: CredentialStore {
    /// Fails with `DuplicateIdentity` when the email is already taken
    async fn create(&self, user: NewUser) -> AppResult<User>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;

    async fn find_all(&self) -> AppResult<Vec<User>>;
}

/// Book catalog storage
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn find_all(&self) -> AppResult<Vec<Book>>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>>;

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>>;

    /// Title or author containing `keyword`, case-insensitive
    async fn search(&self, keyword: &str) -> AppResult<Vec<Book>>;

    async fn find_by_genre(&self, genre: &str) -> AppResult<Vec<Book>>;

    async fn create(&self, book: BookInput) -> AppResult<Book>;

    /// Returns `None` when no book has this id
    async fn update(&self, id: i64, book: BookInput) -> AppResult<Option<Book>>;

    /// Returns `false` when no book has this id
    async fn delete(&self, id: i64) -> AppResult<bool>;
}

/// Main repository struct holding the configured stores
#[derive(Clone)]
pub struct Repository {
    pub pool: Option<Pool<Postgres>>,
    pub users: Arc<dyn UserStore>,
    pub books: Arc<dyn BookStore>,
}

impl Repository {
    /// Create a repository backed by the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository that keeps everything in process memory
    pub fn in_memory() -> Self {
        Self {
            pool: None,
            users: Arc::new(memory::MemoryUsers::default()),
            books: Arc::new(memory::MemoryBooks::default()),
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Canonical form of an email identity key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
