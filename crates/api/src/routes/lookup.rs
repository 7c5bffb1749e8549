use std::cmp::Reverse;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use common::ScoreResult;

use crate::{error::ApiError, AppState};

pub fn lookup_router() -> Router<AppState> {
    Router::new()
        .route("/api/lookup/:code", get(lookup))
        .route("/api/scan", get(scan))
}

// ─── Lookup ───────────────────────────────────────────────────────────────────

async fn lookup(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ScoreResult>, ApiError> {
    let result = state.scanner.lookup(&code).await?;
    Ok(Json(result))
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub buy: Vec<ScoreResult>,
    pub sell: Vec<ScoreResult>,
    pub skipped: usize,
}

impl ScanResponse {
    /// Positive scores go to `buy`, negative to `sell`, each strongest first.
    /// Zero scores are dropped.
    pub fn partition(results: Vec<ScoreResult>, skipped: usize) -> Self {
        let (mut buy, mut sell): (Vec<_>, Vec<_>) = results
            .into_iter()
            .filter(|r| r.score != 0)
            .partition(|r| r.score > 0);
        buy.sort_by_key(|r| Reverse(r.score.unsigned_abs()));
        sell.sort_by_key(|r| Reverse(r.score.unsigned_abs()));
        Self {
            buy,
            sell,
            skipped,
        }
    }
}

/// Evaluate the whole watchlist on demand. Nothing is sent to the sinks.
async fn scan(State(state): State<AppState>) -> Result<Json<ScanResponse>, ApiError> {
    let entries = state.scanner.resolve_watchlist().await?;
    let batch = state.scanner.evaluate_all(&entries).await;
    info!(
        symbols = entries.len(),
        scored = batch.results.len(),
        skipped = batch.skipped.len(),
        "On-demand scan"
    );
    Ok(Json(ScanResponse::partition(batch.results, batch.skipped.len())))
}
