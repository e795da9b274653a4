//! Book catalog service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookInput},
    repository::BookStore,
};

#[derive(Clone)]
pub struct CatalogService {
    books: Arc<dyn BookStore>,
}

impl CatalogService {
    pub fn new(books: Arc<dyn BookStore>) -> Self {
        Self { books }
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.books.find_all().await
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.books
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book not found with id: {}", id)))
    }

    pub async fn search_books(&self, keyword: &str) -> AppResult<Vec<Book>> {
        self.books.search(keyword.trim()).await
    }

    pub async fn books_by_genre(&self, genre: &str) -> AppResult<Vec<Book>> {
        self.books.find_by_genre(genre.trim()).await
    }

    /// Create a new book; the ISBN must not be in the catalog yet
    pub async fn create_book(&self, book: BookInput) -> AppResult<Book> {
        let book = normalize(book)?;
        if self.books.find_by_isbn(&book.isbn).await?.is_some() {
            return Err(AppError::BadRequest(format!(
                "Book with ISBN {} already exists",
                book.isbn
            )));
        }

        let created = self.books.create(book).await?;
        tracing::info!(book_id = created.id, "Book created");
        Ok(created)
    }

    /// Replace a book's details. Changing the ISBN to one already used fails.
    pub async fn update_book(&self, id: i64, book: BookInput) -> AppResult<Book> {
        let book = normalize(book)?;
        let existing = self.get_book(id).await?;

        if existing.isbn != book.isbn {
            if let Some(other) = self.books.find_by_isbn(&book.isbn).await? {
                if other.id != id {
                    return Err(AppError::BadRequest(format!(
                        "Book with ISBN {} already exists",
                        book.isbn
                    )));
                }
            }
        }

        self.books
            .update(id, book)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book not found with id: {}", id)))
    }

    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        if !self.books.delete(id).await? {
            return Err(AppError::NotFound(format!("Book not found with id: {}", id)));
        }
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}

/// Trim text fields and check copy counts
fn normalize(mut book: BookInput) -> AppResult<BookInput> {
    book.title = book.title.trim().to_string();
    book.author = book.author.trim().to_string();
    book.isbn = book.isbn.trim().to_string();
    book.genre = book.genre.trim().to_string();

    for (field, value) in [
        ("title", &book.title),
        ("author", &book.author),
        ("isbn", &book.isbn),
        ("genre", &book.genre),
    ] {
        if value.is_empty() {
            return Err(AppError::Validation(format!("{} is required", field)));
        }
    }

    if book.total_copies < 0 {
        return Err(AppError::BadRequest("Total copies cannot be negative".to_string()));
    }
    if book.available_copies < 0 {
        return Err(AppError::BadRequest("Available copies cannot be negative".to_string()));
    }
    if book.available_copies > book.total_copies {
        return Err(AppError::BadRequest(
            "Available copies cannot exceed total copies".to_string(),
        ));
    }

    Ok(book)
}
