use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::session::SearchSession;

pub mod handlers;
pub mod models;

pub fn create_router(session: Arc<SearchSession>, static_dir: &str) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // API routes
        .route("/api/search", post(handlers::search_handler))
        .route("/api/state", get(handlers::state_handler))
        .route("/api/state/filters", put(handlers::update_filters_handler))
        .route("/api/state/reset", post(handlers::reset_handler))
        .with_state(session)
        // Static files for the front end
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
}
