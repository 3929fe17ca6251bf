use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::http::header::CACHE_CONTROL;
use axum::routing::post;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::AppState;
use super::handlers;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let index = state.public_dir.join("index.html");
    // Non-API paths serve the client app; unknown routes fall back to
    // the entry document for client-side routing.
    let assets = ServeDir::new(&state.public_dir).fallback(ServeFile::new(index));

    Router::new()
        .route("/api/chat", post(handlers::handle_chat))
        .route("/api/upload", post(handlers::handle_upload))
        .fallback_service(assets)
        // Slack on top of the file cap covers multipart framing.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
