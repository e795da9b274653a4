//! API integration tests
//!
//! Drive the full router in process over the in-memory backend.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use luminalib_server::{
    api::create_router,
    auth::token::TokenCodec,
    config::{AppConfig, StorageBackend},
    repository::Repository,
    AppState,
};

const ADMIN_EMAIL: &str = "admin@luminalib.local";
const ADMIN_PASSWORD: &str = "admin-password";

struct TestApp {
    router: Router,
    config: AppConfig,
}

async fn spawn_app() -> TestApp {
    let mut config = AppConfig::default();
    config.database.backend = StorageBackend::Memory;

    let state = AppState::new(config.clone(), Repository::in_memory()).expect("services");
    state
        .services
        .auth
        .ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("bootstrap admin");

    TestApp {
        router: create_router(state),
        config,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.send_request(request).await
    }

    async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    async fn register(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": password,
                    "firstName": "Ada",
                    "lastName": "Lovelace"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["token"].as_str().expect("token").to_string()
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    async fn admin_token(&self) -> String {
        let (status, body) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().expect("token").to_string()
    }
}

fn gatsby() -> Value {
    json!({
        "title": "The Great Gatsby",
        "author": "F. Scott Fitzgerald",
        "isbn": "978-0743273565",
        "publicationYear": 1925,
        "genre": "Fiction",
        "totalCopies": 5,
        "availableCopies": 5
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = spawn_app().await;

    let token = app.register("a@x.com", "secret1").await;
    let (status, me) = app.send(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "a@x.com");
    assert_eq!(me["role"], "USER");
    assert_eq!(me["firstName"], "Ada");
    assert!(me.get("passwordHash").is_none());

    let (status, body) = app.login("A@X.com", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().expect("token");
    let (status, me) = app.send(Method::GET, "/api/users/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "a@x.com");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = spawn_app().await;
    app.register("a@x.com", "secret1").await;

    let (wrong_status, wrong_password) = app.login("a@x.com", "wrong-one").await;
    let (unknown_status, unknown_email) = app.login("nobody@x.com", "secret1").await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["message"], "Invalid email or password");
    assert_eq!(wrong_password["message"], unknown_email["message"]);
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let app = spawn_app().await;
    app.register("a@x.com", "secret1").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "A@x.COM", "password": "another1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("Email already exists"));
}

#[tokio::test]
async fn test_register_validates_input() {
    let app = spawn_app().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("email"), "{}", message);
    assert!(message.contains("password"), "{}", message);
}

#[tokio::test]
async fn test_missing_token_on_protected_route() {
    let app = spawn_app().await;

    let (status, body) = app.send(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
    assert_eq!(body["path"], "/api/users/me");
}

#[tokio::test]
async fn test_public_routes_ignore_bad_tokens() {
    let app = spawn_app().await;

    let (status, body) = app.send(Method::GET, "/api/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = app
        .send(Method::GET, "/api/books", Some("garbage.token.value"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_garbage_token_is_anonymous() {
    let app = spawn_app().await;

    let (status, _) = app
        .send(Method::GET, "/api/users/me", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/users/me")
        .header(header::AUTHORIZATION, "Basic YTpi")
        .body(Body::empty())
        .expect("request");
    let (status, _) = app.send_request(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_token_is_anonymous() {
    let app = spawn_app().await;
    let token = app.register("a@x.com", "secret1").await;

    let (header_part, rest) = token.split_once('.').expect("jwt");
    let (_, signature) = rest.split_once('.').expect("jwt");
    let forged_payload = Utc::now().timestamp().to_string();
    let forged = format!("{}.{}.{}", header_part, forged_payload, signature);
    let (status, _) = app.send(Method::GET, "/api/users/me", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut chars: Vec<char> = token.chars().collect();
    let middle = token.len() - signature.len() / 2;
    chars[middle] = if chars[middle] == 'A' { 'B' } else { 'A' };
    let flipped: String = chars.into_iter().collect();
    let (status, _) = app.send(Method::GET, "/api/users/me", Some(&flipped), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_anonymous() {
    let app = spawn_app().await;
    app.register("a@x.com", "secret1").await;

    let codec = TokenCodec::from_config(&app.config.auth);
    let expired = codec
        .issue("a@x.com", Utc::now() - Duration::days(2))
        .expect("token");
    let (status, _) = app.send(Method::GET, "/api/users/me", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let fresh = codec.issue("a@x.com", Utc::now()).expect("token");
    let (status, _) = app.send(Method::GET, "/api/users/me", Some(&fresh), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_for_unknown_subject_is_anonymous() {
    let app = spawn_app().await;

    let codec = TokenCodec::from_config(&app.config.auth);
    let token = codec.issue("ghost@x.com", Utc::now()).expect("token");
    let (status, _) = app.send(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_book_writes_require_admin() {
    let app = spawn_app().await;
    let user_token = app.register("reader@x.com", "secret1").await;
    let admin_token = app.admin_token().await;

    let (status, _) = app.send(Method::POST, "/api/books", None, Some(gatsby())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(Method::POST, "/api/books", Some(&user_token), Some(gatsby()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);
    assert_eq!(body["error"], "Forbidden");
    assert_eq!(body["path"], "/api/books");
    assert!(body["timestamp"].is_string());

    let (status, book) = app
        .send(Method::POST, "/api/books", Some(&admin_token), Some(gatsby()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["title"], "The Great Gatsby");
    let id = book["id"].as_i64().expect("id");

    let (status, fetched) = app
        .send(Method::GET, &format!("/api/books/{}", id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, book);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/books/{}", id), Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/books/{}", id), Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = app
        .send(Method::GET, &format!("/api/books/{}", id), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_book_search_update_and_genre() {
    let app = spawn_app().await;
    let admin_token = app.admin_token().await;

    let (_, book) = app
        .send(Method::POST, "/api/books", Some(&admin_token), Some(gatsby()))
        .await;
    let id = book["id"].as_i64().expect("id");

    let (status, found) = app
        .send(Method::GET, "/api/books/search?keyword=gatsby", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().map(Vec::len), Some(1));

    let (status, _) = app.send(Method::GET, "/api/books/search", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut changed = gatsby();
    changed["availableCopies"] = json!(2);
    let (status, updated) = app
        .send(Method::PUT, &format!("/api/books/{}", id), Some(&admin_token), Some(changed))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["availableCopies"], 2);

    let (status, fiction) = app
        .send(Method::GET, "/api/books/genre/fiction", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fiction[0]["id"], id);

    let (status, _) = app
        .send(Method::POST, "/api/books", Some(&admin_token), Some(gatsby()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_path_id_is_bad_request() {
    let app = spawn_app().await;

    let (status, body) = app.send(Method::GET, "/api/books/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["path"], "/api/books/abc");
}

#[tokio::test]
async fn test_user_listing_is_admin_only() {
    let app = spawn_app().await;
    let user_token = app.register("reader@x.com", "secret1").await;
    let admin_token = app.admin_token().await;

    let (status, _) = app.send(Method::GET, "/api/users", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = app.send(Method::GET, "/api/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().map(Vec::len), Some(2));

    let (status, body) = app
        .send(Method::GET, "/api/users/999", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not found: User not found with id: 999");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = spawn_app().await;
    let token = app.register("a@x.com", "secret1").await;

    let (status, _) = app.send(Method::GET, "/api/loans", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send(Method::GET, "/api/loans", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["path"], "/api/loans");
}

#[tokio::test]
async fn test_head_follows_get_access_rules() {
    let app = spawn_app().await;
    let user_token = app.register("reader@x.com", "secret1").await;
    let admin_token = app.admin_token().await;

    let (status, _) = app.send(Method::HEAD, "/api/books", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::HEAD, "/api/users", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for id in [1, 999] {
        let (status, _) = app
            .send(Method::HEAD, &format!("/api/users/{}", id), Some(&user_token), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = app.send(Method::HEAD, "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(Method::HEAD, "/api/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unlisted_methods_do_not_bypass_admin_rules() {
    let app = spawn_app().await;
    let user_token = app.register("reader@x.com", "secret1").await;
    let admin_token = app.admin_token().await;

    let (_, book) = app
        .send(Method::POST, "/api/books", Some(&admin_token), Some(gatsby()))
        .await;
    let uri = format!("/api/books/{}", book["id"].as_i64().expect("id"));

    let (status, _) = app
        .send(Method::PUT, &uri, Some(&user_token), Some(gatsby()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::PATCH, &uri, Some(&user_token), Some(gatsby()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::OPTIONS, "/api/users", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::PATCH, &uri, None, Some(gatsby())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cors_preflight_needs_no_token() {
    let app = spawn_app().await;

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/books")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .expect("request");
    let response = app.router.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn test_method_not_allowed_uses_error_envelope() {
    let app = spawn_app().await;

    let (status, body) = app.send(Method::PUT, "/health", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["status"], 405);
    assert_eq!(body["error"], "Method Not Allowed");
    assert_eq!(body["path"], "/health");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_search_keyword_is_literal() {
    let app = spawn_app().await;
    let admin_token = app.admin_token().await;
    app.send(Method::POST, "/api/books", Some(&admin_token), Some(gatsby()))
        .await;

    let (status, found) = app
        .send(Method::GET, "/api/books/search?keyword=%25", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, json!([]));

    let (_, found) = app
        .send(Method::GET, "/api/books/search?keyword=g_tsby", None, None)
        .await;
    assert_eq!(found, json!([]));
}

#[tokio::test]
async fn test_openapi_document_is_public() {
    let app = spawn_app().await;

    let (status, doc) = app
        .send(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/auth/login"].is_object());
}
