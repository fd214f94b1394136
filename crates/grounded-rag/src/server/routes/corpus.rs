//! Corpus management endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::server::state::AppState;

/// Request to (re)index the lexical corpus
#[derive(Debug, Deserialize)]
pub struct ReloadRequest {
    /// Path to the pre-chunked corpus text file
    pub path: PathBuf,
}

/// Reload outcome
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub path: PathBuf,
    pub chunks_indexed: usize,
}

/// POST /api/corpus/reload - Rebuild the lexical index from a text file
pub async fn reload_corpus(
    State(state): State<AppState>,
    Json(request): Json<ReloadRequest>,
) -> Result<Json<ReloadResponse>> {
    let chunks_indexed = state.service().load_corpus(&request.path).await?;

    Ok(Json(ReloadResponse {
        path: request.path,
        chunks_indexed,
    }))
}
