//! Route table

use crate::config::AppConfig;
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use super::{auth::create_auth_routes, health::handle_health, upload::upload_file};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

pub fn create_routes(config: &AppConfig) -> Router<AppState> {
    let body_limit = config
        .upload
        .max_file_size_bytes()
        .saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/health", get(handle_health))
        .merge(create_auth_routes())
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
}
