#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use cms_api::auth::jwt::{generate_access_token, JwtConfig};
use cms_api::catalog::refresh::CommandRefresher;
use cms_api::catalog::ModuleCatalog;
use cms_api::config::{GeneratorConfig, ServerConfig};
use cms_api::router::build_app_router;
use cms_api::state::AppState;
use cms_core::roles::{ROLE_ADMIN, ROLE_EDITOR};
use cms_db::models::user::CreateUser;
use cms_db::repositories::UserRepo;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults, writing modules under
/// `modules_dir`.
pub fn test_config(modules_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        generator: GeneratorConfig {
            modules_dir: modules_dir.to_path_buf(),
            refresh_command: None,
            refresh_timeout_secs: 5,
        },
    }
}

/// Build the state the way `main.rs` does.
pub fn test_state(pool: PgPool, modules_dir: &Path) -> AppState {
    let config = test_config(modules_dir);
    AppState {
        pool,
        catalog: Arc::new(ModuleCatalog::new(modules_dir)),
        refresher: Arc::new(CommandRefresher::new(None, Duration::from_secs(5))),
        config: Arc::new(config),
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(pool: PgPool, modules_dir: &Path) -> Router {
    let state = test_state(pool, modules_dir);
    let config = Arc::clone(&state.config);
    build_app_router(state, &config)
}

async fn token_for(pool: &PgPool, email: &str, role: &str) -> String {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            name: role.to_string(),
            role: role.to_string(),
        },
    )
    .await
    .unwrap();
    generate_access_token(
        user.id,
        role,
        &JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
    )
    .unwrap()
}

/// Create an admin user and return a bearer token for it.
pub async fn admin_token(pool: &PgPool) -> String {
    token_for(pool, "admin@example.com", ROLE_ADMIN).await
}

pub async fn editor_token(pool: &PgPool) -> String {
    token_for(pool, "editor@example.com", ROLE_EDITOR).await
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Unauthenticated GET.
pub async fn get_anon(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn post_empty(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Generation request for a `news` module with three fields, SEO and trash.
pub fn news_request() -> serde_json::Value {
    serde_json::json!({
        "code_module": "news",
        "slug": "novosti",
        "status": "active",
        "name": {"ru": "Новости", "en": "News"},
        "description": {"ru": "Лента новостей"},
        "option_seo": true,
        "option_trash": true,
        "properties": [
            {"code": "title", "type": "string", "name": {"ru": "Заголовок"}, "required": true},
            {"code": "body", "type": "text", "name": {"ru": "Текст"}},
            {"code": "price", "type": "decimal", "name": {"ru": "Цена"}}
        ]
    })
}
