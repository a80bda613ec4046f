//! # kanban_api
//!
//! HTTP surface for the Kanban session and access-control core.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use kanban_core::auth::ownership::OwnershipResolver;
use kanban_core::auth::session::SessionService;
use kanban_core::models::auth::Role;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, health, permissions, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Token lifecycle and principal loading.
    pub sessions: Arc<SessionService>,
    /// Board ownership and delegated-access checks.
    pub resources: Arc<OwnershipResolver>,
    /// API configuration.
    pub config: ApiConfig,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Admin routes: authenticate, then require at least `admin`.
    let admin = Router::new()
        .route("/users/{id}/role", patch(users::update_role_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            Role::Admin,
            middleware::auth::require_role,
        ));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/logout-all", post(auth::logout_all_handler))
        .route(
            "/permissions/{kind}/{id}",
            get(permissions::access_level_handler),
        )
        .merge(admin)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
