//! Query and observability endpoints

use axum::{extract::State, Json};

use crate::metrics::MetricsSnapshot;
use crate::server::state::AppState;
use crate::types::{CacheStats, QueryRequest, RagAnswer};

/// POST /api/query - Answer a question over the corpus
///
/// Always responds 200 with an answer aggregate; failures inside the
/// pipeline arrive as error-shaped answers with a correlation id.
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Json<RagAnswer> {
    tracing::info!("Query: \"{:.80}\"", request.question);
    let answer = state.service().query(&request.question).await;
    Json(answer)
}

/// GET /api/cache/stats - Response cache statistics
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.service().cache_stats())
}

/// GET /api/metrics - Point-in-time metrics snapshot
pub async fn metrics_snapshot(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics().snapshot())
}
