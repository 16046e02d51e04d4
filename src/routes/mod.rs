//! API Routes
//!
//! The machine directory served to payment clients:
//! - `/api/machines/{id}` - Machine record lookup
//! - `/api/health` - Health check

pub mod health;
pub mod machines;

use axum::Router;
use crate::middleware::apply_cors;
use crate::models::AppState;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let origins = state.config.server.cors_allowed_origins.clone();
    let router = Router::new()
        .merge(machines::router(state.clone()))
        .merge(health::router(state))
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &origins)
}
