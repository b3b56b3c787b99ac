//!
//! quill HTTP server
//! -----------------
//! This module defines the axum-based HTTP API for quill.
//!
//! Responsibilities:
//! - Bearer-token authentication backed by the identity module.
//! - Auth, category, post, comment, and upload routes.
//! - A single-origin CORS layer for the configured client.
//! - Startup inventory logs for the entity tables.

use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::identity::{AuthProvider, LocalAuthProvider, Principal, SessionManager};
use crate::storage::SharedStore;

pub mod auth;
pub mod categories;
pub mod comments;
pub mod posts;
pub mod uploads;

/// Process configuration, read once from the environment at startup and
/// passed down explicitly.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub db_root: String,
    pub upload_root: String,
    pub allowed_origin: String,
    /// When set, only admins may create categories.
    pub admin_categories: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 5000,
            db_root: "dbs".to_string(),
            upload_root: "uploads".to_string(),
            allowed_origin: "*".to_string(),
            admin_categories: false,
        }
    }
}

fn parse_bool_env(name: &str) -> Option<bool> {
    match std::env::var(name) {
        Ok(v) => {
            let s = v.to_lowercase();
            match s.as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            }
        }
        Err(_) => None,
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            http_port: std::env::var("QUILL_HTTP_PORT")
                .ok()
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(defaults.http_port),
            db_root: std::env::var("QUILL_DB_FOLDER").unwrap_or(defaults.db_root),
            upload_root: std::env::var("QUILL_UPLOAD_FOLDER").unwrap_or(defaults.upload_root),
            allowed_origin: std::env::var("QUILL_ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
            admin_categories: parse_bool_env("QUILL_ADMIN_CATEGORIES").unwrap_or(defaults.admin_categories),
        }
    }
}

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub auth: LocalAuthProvider,
    pub config: ServerConfig,
}

/// Pull the bearer credential out of the Authorization header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization").or_else(|| headers.get("Authorization"))?;
    let s = value.to_str().ok()?;
    let rest = s.strip_prefix("Bearer ").or_else(|| s.strip_prefix("bearer "))?;
    let rest = rest.trim();
    if rest.is_empty() { None } else { Some(rest.to_string()) }
}

/// Resolve the caller or fail with `Auth`; handlers call this before any
/// ownership check or mutation.
pub(crate) fn require_principal(state: &AppState, headers: &HeaderMap) -> AppResult<Principal> {
    let Some(token) = bearer_token(headers) else {
        return Err(AppError::auth("missing_token", "not authorized, no token provided"));
    };
    state.auth.verify(&token)
}

fn apply_cors_headers(headers: &mut HeaderMap, origin: &str) {
    if let Ok(v) = HeaderValue::from_str(origin) {
        headers.insert("Access-Control-Allow-Origin", v);
    }
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Authorization, Content-Type"),
    );
}

async fn cors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = state.config.allowed_origin.clone();
    if req.method() == Method::OPTIONS {
        let mut res = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(res.headers_mut(), &origin);
        return res;
    }
    let mut res = next.run(req).await;
    apply_cors_headers(res.headers_mut(), &origin);
    res
}

/// Assemble the full route table over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "quill ok" }))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/categories", get(categories::list).post(categories::create))
        .route("/api/posts", get(posts::list).post(posts::create))
        .route(
            "/api/posts/{id}",
            get(posts::get_one).put(posts::update).delete(posts::delete),
        )
        .route(
            "/api/comments/{id}",
            get(comments::list)
                .post(comments::create)
                .put(comments::update)
                .delete(comments::delete),
        )
        .route("/uploads/{file}", get(uploads::serve))
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .with_state(state)
}

fn log_store_inventory(store: &SharedStore) {
    let guard = store.0.lock();
    let users = guard.load_users().map(|v| v.len()).unwrap_or(0);
    let categories = guard.load_categories().map(|v| v.len()).unwrap_or(0);
    let posts = guard.load_posts().map(|v| v.len()).unwrap_or(0);
    let comments = guard.load_comments().map(|v| v.len()).unwrap_or(0);
    info!(users, categories, posts, comments, "store inventory");
}

/// Start the quill HTTP server with the given configuration.
pub async fn run_with_config(config: ServerConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.db_root)
        .with_context(|| format!("Failed to create or access database root: {}", config.db_root))?;
    std::fs::create_dir_all(&config.upload_root)
        .with_context(|| format!("Failed to create or access upload folder: {}", config.upload_root))?;

    let store = SharedStore::new(&config.db_root)
        .with_context(|| format!("While creating SharedStore with root: {}", config.db_root))?;
    log_store_inventory(&store);

    let sessions = SessionManager::default();
    let auth = LocalAuthProvider::new(store.clone(), sessions);
    let state = AppState { store, auth, config: config.clone() };

    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Convenience entry point using environment configuration.
pub async fn run() -> anyhow::Result<()> {
    run_with_config(ServerConfig::from_env()).await
}
