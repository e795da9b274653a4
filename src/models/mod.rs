//! Data models for LuminaLib

pub mod book;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookInput, BookSearchQuery};
pub use user::{LoginRequest, NewUser, RegisterRequest, Role, TokenResponse, User};
