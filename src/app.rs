// Application state and router assembly
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, OriginalUri, State},
    http::{HeaderValue, Method},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use sqlx::PgPool;

use crate::config::{AppConfig, StorageBackend};
use crate::database::{DatabaseManager, MemoryStore, PgStore, PlanStore, UserStore};
use crate::error::{AppError, ErrorCode};
use crate::handlers::{plans, users};
use crate::mail::{self, Mailer};
use crate::middleware::require_auth;

/// Shared by every handler. Collaborators sit behind traits so tests can swap them.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub plans: Arc<dyn PlanStore>,
    pub mailer: Arc<dyn Mailer>,
    pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        plans: Arc<dyn PlanStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            users,
            plans,
            mailer,
            pool: None,
        }
    }

    /// In-memory store plus the given mailer.
    pub fn in_memory(config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store, mailer)
    }

    /// Wires the collaborators named by the configuration.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = Arc::from(mail::from_config(&config.mail)?);

        match config.database.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Ok(Self::in_memory(config, mailer))
            }
            StorageBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database).await?;
                let store = Arc::new(PgStore::new(pool.clone()));
                store.migrate().await?;
                Ok(Self {
                    pool: Some(pool),
                    ..Self::new(config, store.clone(), store, mailer)
                })
            }
        }
    }

    /// Releases the database pool, if any. Called once the server has drained.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            DatabaseManager::close(pool).await;
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(user_public_routes())
        .merge(protected_routes(state.clone()));

    let prefix = state.config.server.api_prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(prefix, api)
    };

    let body_limit = state.config.server.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    app
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
        .with_state(state)
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn user_public_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/forgot-password", post(users::forgot_password))
        .route("/users/reset-password", post(users::reset_password))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(users::user_list).post(users::user_create))
        .route(
            "/users/:id",
            get(users::user_get).put(users::user_put).delete(users::user_delete),
        )
        .route("/plans", get(plans::plan_list).post(plans::plan_post))
        .route(
            "/plans/:id",
            get(plans::plan_get).put(plans::plan_put).delete(plans::plan_delete),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    if config.is_development() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    let prefix = state.config.server.api_prefix.trim_end_matches('/');

    Json(json!({
        "status": "success",
        "data": {
            "name": "CleverMoney API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "users": format!("{}/users", prefix),
                "plans": format!("{}/plans", prefix),
                "health": "/health",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> (axum::http::StatusCode, Json<Value>) {
    match state.users.health_check().await {
        Ok(()) => (
            axum::http::StatusCode::OK,
            Json(json!({ "status": "success", "data": { "store": "ok" } })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            let err = AppError::new(
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::InternalServerError,
                "Store unavailable",
            );
            (err.status, Json(err.to_json()))
        }
    }
}

/// Unknown paths and unsupported methods on known paths.
async fn route_not_found(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::not_found(
        ErrorCode::RouteNotFound,
        format!("Can't find {} {} on this server", method, uri.path()),
    )
}
