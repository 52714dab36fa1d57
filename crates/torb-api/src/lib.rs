// Torb HTTP server
// Decision: One shared AppState holding the box office; route modules merge into a single router
// Decision: The router is built here so tests can drive it without a listener

pub mod admin;
pub mod auth;
pub mod cache_invalidate;
pub mod common;
pub mod config;
pub mod events;
pub mod openapi;
pub mod peer;
pub mod users;

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use torb_core::BoxOffice;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::SessionService;
use crate::config::SessionConfig;
use crate::openapi::ApiDoc;

/// App state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub office: Arc<BoxOffice>,
    pub sessions: Arc<SessionService>,
    /// `postgres` or `memory`, reported by /health
    pub storage: &'static str,
}

impl AppState {
    pub fn new(office: Arc<BoxOffice>, session: SessionConfig, storage: &'static str) -> Self {
        Self {
            office,
            sessions: Arc::new(SessionService::new(session)),
            storage,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    storage: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.storage,
    })
}

/// Full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health).with_state(state.clone()))
        .merge(events::routes(state.clone()))
        .merge(users::routes(state.clone()))
        .merge(auth::routes(state.clone()))
        .merge(admin::routes(state.clone()))
        .merge(cache_invalidate::routes(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}
