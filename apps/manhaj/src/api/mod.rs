//! # Manhaj HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! | Route | Methods |
//! |---|---|
//! | `/health` | GET |
//! | `/status` | GET |
//! | `/topics` | GET, POST |
//! | `/articles` | POST |
//! | `/nodes` | GET, POST |
//! | `/nodes/{id}` | GET, PATCH, DELETE |
//! | `/nodes/{id}/children` | GET |
//! | `/nodes/{id}/ancestors` | GET |
//! | `/nodes/{id}/status` | PATCH |
//! | `/nodes/{id}/tags` | GET, POST, DELETE |
//! | `/links` | POST |
//! | `/links/{parent}/{child}` | DELETE |
//! | `/tags` | GET |
//! | `/me/nodes` | GET |
//! | `/users` | GET, POST |
//! | `/users/{id}` | DELETE |
//!
//! ## Security Configuration
//!
//! - `cors_origins` / `MANHAJ_CORS_ORIGINS`: comma-separated origins, or `*` (default: localhost only)
//! - `rate_limit` / `MANHAJ_RATE_LIMIT`: requests per second (default: 100, 0 to disable)
//! - `MANHAJ_API_KEY`: if set, requires Bearer token authentication

mod auth;
mod error;
mod handlers;
mod middleware;
mod types;

pub use auth::{ACTOR_HEADER, Authenticated, Lang, get_api_key_from_env};
pub use error::{ApiError, ErrorResponse, Message};
pub use middleware::create_rate_limiter;
pub use types::{
    CreateArticleRequest, CreateNodeRequest, CreateTopicRequest, CreateUserRequest,
    DeletedResponse, EditNodeRequest, HealthResponse, LinkRequest, LinkResponse, MyNodesResponse,
    NodeJson, NodeListQuery, NodeListResponse, NodeResponse, StatusChangeRequest, StatusResponse,
    SummaryJson, TagJson, TagListResponse, TagLookupQuery, TagRequest, TagResponse,
    TagsClearedResponse, UserJson, UserListResponse, UserResponse,
};

use crate::config::Settings;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use manhaj_core::{Catalog, ManhajError};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request body limit (2 MiB), above the 1 MiB content document cap.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// The catalog synchronizes internally, so handlers share it without an
/// application-level lock.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// State with default settings.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self::with_settings(catalog, Settings::default())
    }

    #[must_use]
    pub fn with_settings(catalog: Catalog, settings: Settings) -> Self {
        Self {
            catalog: Arc::new(catalog),
            settings: Arc::new(settings),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

fn cors_headers() -> [HeaderName; 4] {
    [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        header::ACCEPT_LANGUAGE,
        HeaderName::from_static(ACTOR_HEADER),
    ]
}

/// Build the CORS layer from the configured origins.
///
/// - `*`: allows all origins (development only)
/// - unset: localhost only
/// - otherwise: the comma-separated list
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (cors_origins = \"*\"). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers(cors_headers())
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers(cors_headers())
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
/// 5. API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let settings = Arc::clone(&state.settings);
    let cors = build_cors_layer(settings.cors_origins.as_deref());

    let rate_limiter = if settings.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", settings.rate_limit);
        Some(create_rate_limiter(settings.rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED. Set MANHAJ_API_KEY to require a bearer token."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route(
            "/topics",
            get(handlers::list_topics_handler).post(handlers::create_topic_handler),
        )
        .route("/articles", post(handlers::create_article_handler))
        .route(
            "/nodes",
            get(handlers::list_nodes_handler).post(handlers::create_node_handler),
        )
        .route(
            "/nodes/{id}",
            get(handlers::get_node_handler)
                .patch(handlers::edit_node_handler)
                .delete(handlers::delete_node_handler),
        )
        .route("/nodes/{id}/children", get(handlers::children_handler))
        .route("/nodes/{id}/ancestors", get(handlers::ancestors_handler))
        .route("/nodes/{id}/status", patch(handlers::set_status_handler))
        .route(
            "/nodes/{id}/tags",
            get(handlers::node_tags_handler)
                .post(handlers::add_tag_handler)
                .delete(handlers::clear_tags_handler),
        )
        .route("/links", post(handlers::link_handler))
        .route("/links/{parent}/{child}", delete(handlers::unlink_handler))
        .route("/tags", get(handlers::tag_lookup_handler))
        .route("/me/nodes", get(handlers::my_nodes_handler))
        .route(
            "/users",
            get(handlers::list_users_handler).post(handlers::create_user_handler),
        )
        .route("/users/{id}", delete(handlers::delete_user_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn_with_state(
            settings.locale,
            auth::api_key_auth_middleware,
        ));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            middleware::RateLimitState {
                limiter,
                locale: settings.locale,
            },
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve the API on `addr` until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), ManhajError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ManhajError::Storage(format!("bind {addr} failed: {e}")))?;

    tracing::info!("Manhaj HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ManhajError::Storage(format!("server error: {e}")))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
