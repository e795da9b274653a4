//! Credential verification against the credential store

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    repository::CredentialStore,
};

use super::{password, Principal};

/// Password checked when the email is unknown, so both failure paths do
/// the same hashing work.
const DUMMY_PASSWORD: &str = "luminalib-unknown-principal";

pub struct Authenticator<S: ?Sized> {
    store: Arc<S>,
    dummy_hash: String,
}

impl<S: ?Sized> Clone for Authenticator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            dummy_hash: self.dummy_hash.clone(),
        }
    }
}

impl<S: CredentialStore + ?Sized> Authenticator<S> {
    pub fn new(store: Arc<S>) -> AppResult<Self> {
        Ok(Self {
            store,
            dummy_hash: password::hash_password(DUMMY_PASSWORD)?,
        })
    }

    pub fn verify_password(&self, plaintext: &str, stored_hash: &str) -> bool {
        password::verify_password(plaintext, stored_hash)
    }

    /// Resolve `email` and check `plaintext` against its stored hash.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`.
    pub async fn authenticate(&self, email: &str, plaintext: &str) -> AppResult<Principal> {
        let Some(user) = self.store.find_by_email(email).await? else {
            self.verify_password(plaintext, &self.dummy_hash);
            tracing::debug!("Login rejected: unknown principal");
            return Err(AppError::InvalidCredentials);
        };

        if !self.verify_password(plaintext, &user.password_hash) {
            tracing::debug!(user_id = user.id, "Login rejected: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        Ok(Principal::from(&user))
    }
}
