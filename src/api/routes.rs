use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers::{query, schema, AppState};
use crate::config::Settings;
use crate::services::ConnectionPoolManager;

/// Create router with application state
pub fn create_router_with_state(
    settings: Settings,
    pool_manager: Arc<ConnectionPoolManager>,
) -> Router {
    let state = AppState {
        settings,
        pool_manager,
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/query", post(query::execute_query))
        .route("/schema", get(schema::get_schema))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
