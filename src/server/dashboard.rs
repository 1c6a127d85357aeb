//! Dashboard backend.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::analysis::{Analysis, Analyzer};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    rows: usize,
    model_type: Option<&'static str>,
}

async fn analyze(State(analyzer): State<Arc<Analyzer>>, Json(req): Json<AnalyzeRequest>) -> Json<Analysis> {
    Json(analyzer.analyze(&req.query))
}

async fn health(State(analyzer): State<Arc<Analyzer>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        rows: analyzer.history().len(),
        model_type: analyzer.engine().map(|e| e.model_type()),
    })
}

pub fn router(analyzer: Arc<Analyzer>) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .with_state(analyzer)
}
