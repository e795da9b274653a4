//! Per-request bearer token filter
//!
//! Never rejects a request. Any failure to establish identity leaves the
//! request anonymous; rejection is the authorization policy's job.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};

use crate::{repository::CredentialStore, AppState};

use super::{
    token::{TokenCodec, TokenError},
    AuthContext, Principal,
};

pub const BEARER_PREFIX: &str = "Bearer ";

/// Why a request stayed anonymous
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymousReason {
    NoHeader,
    NotBearer,
    Malformed,
    InvalidSignature,
    Expired,
    UnknownSubject,
    StoreUnavailable,
}

/// Terminal state of the filter for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Unauthenticated(AnonymousReason),
    /// Context already carried an identity; left untouched
    Resolved,
    Authenticated(Principal),
}

pub struct RequestAuthFilter<S: ?Sized> {
    codec: Arc<TokenCodec>,
    store: Arc<S>,
}

impl<S: ?Sized> Clone for RequestAuthFilter<S> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CredentialStore + ?Sized> RequestAuthFilter<S> {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<S>) -> Self {
        Self { codec, store }
    }

    /// Try to bind an identity from `headers` into `context`
    pub async fn apply(
        &self,
        headers: &HeaderMap,
        context: &mut AuthContext,
        now: DateTime<Utc>,
    ) -> FilterOutcome {
        let outcome = self.resolve(headers, context, now).await;
        match &outcome {
            FilterOutcome::Authenticated(principal) => {
                tracing::debug!(user_id = principal.id, "Request authenticated");
                *context = AuthContext::authenticated(principal.clone());
            }
            FilterOutcome::Resolved => {}
            FilterOutcome::Unauthenticated(reason) => log_anonymous(*reason),
        }
        outcome
    }

    async fn resolve(
        &self,
        headers: &HeaderMap,
        context: &AuthContext,
        now: DateTime<Utc>,
    ) -> FilterOutcome {
        use AnonymousReason::*;

        let Some(header) = headers.get(AUTHORIZATION) else {
            return FilterOutcome::Unauthenticated(NoHeader);
        };
        let Some(token) = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        else {
            return FilterOutcome::Unauthenticated(NotBearer);
        };

        let decoded = match self.codec.decode(token.trim()) {
            Ok(decoded) => decoded,
            Err(TokenError::Malformed) => return FilterOutcome::Unauthenticated(Malformed),
            Err(TokenError::InvalidSignature) => {
                return FilterOutcome::Unauthenticated(InvalidSignature)
            }
        };
        if decoded.is_expired_at(now) {
            return FilterOutcome::Unauthenticated(Expired);
        }

        if context.is_authenticated() {
            return FilterOutcome::Resolved;
        }

        match self.store.find_by_email(&decoded.subject).await {
            Ok(Some(user)) => FilterOutcome::Authenticated(Principal::from(&user)),
            Ok(None) => FilterOutcome::Unauthenticated(UnknownSubject),
            Err(e) => {
                tracing::error!("Credential lookup failed during token auth: {}", e);
                FilterOutcome::Unauthenticated(StoreUnavailable)
            }
        }
    }
}

fn log_anonymous(reason: AnonymousReason) {
    match reason {
        // Store failures are logged where they happen.
        AnonymousReason::NoHeader | AnonymousReason::NotBearer | AnonymousReason::StoreUnavailable => {}
        AnonymousReason::Expired | AnonymousReason::UnknownSubject => {
            tracing::debug!(?reason, "Bearer token did not establish identity")
        }
        AnonymousReason::Malformed | AnonymousReason::InvalidSignature => {
            tracing::warn!(?reason, "Rejected bearer token")
        }
    }
}

/// Middleware binding the request's [`AuthContext`]
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let mut context = request
        .extensions_mut()
        .remove::<AuthContext>()
        .unwrap_or_default();

    state
        .services
        .auth_filter
        .apply(request.headers(), &mut context, Utc::now())
        .await;

    request.extensions_mut().insert(context);
    next.run(request).await
}
