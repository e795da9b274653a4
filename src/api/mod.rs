//! API handlers for LuminaLib REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod openapi;
pub mod users;

use std::{any::Any, time::Duration};

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequest, Request},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use validator::Validate;

use crate::{
    auth::{filter, policy},
    config::CorsConfig,
    error::{AppError, ErrorResponse},
    AppState,
};

/// JSON body that has passed its `validator` rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Create the application router with all routes
///
/// Every request passes the auth filter, then the authorization policy,
/// before reaching a handler.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    let api = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        // Books
        .route("/api/books", get(books::list_books).post(books::create_book))
        .route("/api/books/search", get(books::search_books))
        .route("/api/books/genre/:genre", get(books::books_by_genre))
        .route(
            "/api/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Users
        .route("/api/users", get(users::list_users))
        .route("/api/users/me", get(users::me))
        .route("/api/users/:id", get(users::get_user))
        .with_state(state.clone());

    Router::new()
        .merge(api)
        .merge(openapi::create_openapi_router())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), policy::authorize))
        .layer(middleware::from_fn_with_state(state, filter::authenticate))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(error_envelope))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

async fn not_found() -> AppError {
    AppError::NotFound("No route for this path".to_string())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    AppError::Internal(format!("Handler panicked: {}", detail)).into_response()
}

/// Fill in the request path on error bodies produced further down the stack
///
/// Bare error responses from the router itself (such as 405) get a body
/// built from their status.
pub async fn error_envelope(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let mut body = match response.extensions().get::<ErrorResponse>() {
        Some(body) => body.clone(),
        None if is_bare_error(&response) => {
            let status = response.status();
            ErrorResponse::new(status, status.canonical_reason().unwrap_or("Error"))
        }
        None => return response,
    };
    body.path = path;

    let (mut parts, _) = response.into_parts();
    parts.extensions.remove::<ErrorResponse>();
    parts.headers.remove(header::CONTENT_LENGTH);

    match serde_json::to_vec(&body) {
        Ok(bytes) => {
            parts.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            tracing::error!("Failed to serialize error body: {}", e);
            Response::from_parts(parts, Body::empty())
        }
    }
}

fn is_bare_error(response: &Response) -> bool {
    let status = response.status();
    (status.is_client_error() || status.is_server_error())
        && !response.headers().contains_key(header::CONTENT_TYPE)
}
