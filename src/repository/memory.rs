//! In-process stores, used for `database.backend = "memory"` and in tests

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookInput, NewUser, User},
};

use super::{normalize_email, BookStore, CredentialStore, UserStore};

#[derive(Default)]
struct UsersTable {
    next_id: i64,
    by_id: BTreeMap<i64, User>,
    /// normalized email -> id
    by_email: BTreeMap<String, i64>,
}

#[derive(Default)]
pub struct MemoryUsers {
    inner: RwLock<UsersTable>,
}

#[async_trait]
impl CredentialStore for MemoryUsers {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let table = self.inner.read().await;
        Ok(table
            .by_email
            .get(&normalize_email(email))
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        Ok(self.inner.read().await.by_email.contains_key(&normalize_email(email)))
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let email = normalize_email(&user.email);
        let mut table = self.inner.write().await;
        if table.by_email.contains_key(&email) {
            return Err(AppError::DuplicateIdentity(format!(
                "Email already exists: {}",
                user.email
            )));
        }

        table.next_id += 1;
        let created = User {
            id: table.next_id,
            email: email.clone(),
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            created_at: Utc::now(),
        };
        table.by_email.insert(email, created.id);
        table.by_id.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        Ok(self.inner.read().await.by_id.values().cloned().collect())
    }
}

#[derive(Default)]
struct BooksTable {
    next_id: i64,
    by_id: BTreeMap<i64, Book>,
}

impl BooksTable {
    fn isbn_taken(&self, isbn: &str, exclude_id: Option<i64>) -> bool {
        self.by_id
            .values()
            .any(|b| b.isbn == isbn && Some(b.id) != exclude_id)
    }
}

#[derive(Default)]
pub struct MemoryBooks {
    inner: RwLock<BooksTable>,
}

#[async_trait]
impl BookStore for MemoryBooks {
    async fn find_all(&self) -> AppResult<Vec<Book>> {
        Ok(self.inner.read().await.by_id.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        Ok(self
            .inner
            .read()
            .await
            .by_id
            .values()
            .find(|b| b.isbn == isbn)
            .cloned())
    }

    async fn search(&self, keyword: &str) -> AppResult<Vec<Book>> {
        let keyword = keyword.to_lowercase();
        Ok(self
            .inner
            .read()
            .await
            .by_id
            .values()
            .filter(|b| {
                b.title.to_lowercase().contains(&keyword)
                    || b.author.to_lowercase().contains(&keyword)
            })
            .cloned()
            .collect())
    }

    async fn find_by_genre(&self, genre: &str) -> AppResult<Vec<Book>> {
        Ok(self
            .inner
            .read()
            .await
            .by_id
            .values()
            .filter(|b| b.genre.eq_ignore_ascii_case(genre))
            .cloned()
            .collect())
    }

    async fn create(&self, book: BookInput) -> AppResult<Book> {
        let mut table = self.inner.write().await;
        if table.isbn_taken(&book.isbn, None) {
            return Err(AppError::BadRequest(format!(
                "Book with ISBN {} already exists",
                book.isbn
            )));
        }
        table.next_id += 1;
        let created = book.into_book(table.next_id);
        table.by_id.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, book: BookInput) -> AppResult<Option<Book>> {
        let mut table = self.inner.write().await;
        if !table.by_id.contains_key(&id) {
            return Ok(None);
        }
        if table.isbn_taken(&book.isbn, Some(id)) {
            return Err(AppError::BadRequest(format!(
                "Book with ISBN {} already exists",
                book.isbn
            )));
        }
        let updated = book.into_book(id);
        table.by_id.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        Ok(self.inner.write().await.by_id.remove(&id).is_some())
    }
}
