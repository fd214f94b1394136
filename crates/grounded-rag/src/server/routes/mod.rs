//! API route definitions

pub mod corpus;
pub mod query;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Build the /api router
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/query", post(query::query_rag))
        .route("/corpus/reload", post(corpus::reload_corpus))
        .route("/cache/stats", get(query::cache_stats))
        .route("/metrics", get(query::metrics_snapshot))
}
