//! Serverless style handlers: health, single-row prediction and feedback.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info};

use super::{cors, ApiError};
use crate::config::AppConfig;
use crate::data::MODEL_FEATURES;
use crate::model::{missing_features, PointModel, Regressor};

/// Feedback entries kept in memory; older ones are dropped first
pub const MAX_FEEDBACK_ENTRIES: usize = 1000;

pub struct FunctionsState {
    pub model: Option<PointModel>,
    pub feedback: Mutex<VecDeque<FeedbackEntry>>,
    feedback_capacity: usize,
}

impl FunctionsState {
    pub fn new(model: Option<PointModel>) -> Self {
        Self::with_feedback_capacity(model, MAX_FEEDBACK_ENTRIES)
    }

    pub fn with_feedback_capacity(model: Option<PointModel>, capacity: usize) -> Self {
        Self { model, feedback: Mutex::new(VecDeque::new()), feedback_capacity: capacity.max(1) }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let model = match PointModel::load(&config.model_path) {
            Ok(model) => {
                info!(trees = model.forest.trees.len(), "model and scaler loaded");
                Some(model)
            }
            Err(e) => {
                error!(error = %e, "failed to load model or scaler");
                None
            }
        };
        Self::new(model)
    }

    pub fn record_feedback(&self, entry: FeedbackEntry) {
        let mut entries = self.feedback.lock().unwrap_or_else(|p| p.into_inner());
        if entries.len() >= self.feedback_capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback.lock().map(|f| f.len()).unwrap_or_else(|p| p.into_inner().len())
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub prediction: f64,
    #[serde(default)]
    pub actual: Option<f64>,
    pub rating: i64,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackEntry {
    pub timestamp: String,
    pub prediction: f64,
    pub actual: Option<f64>,
    pub user_rating: i64,
    pub comments: Option<String>,
}

fn now() -> String {
    Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

async fn health(State(state): State<Arc<FunctionsState>>) -> Json<Value> {
    let loaded = state.model.is_some();
    Json(json!({
        "status": if loaded { "healthy" } else { "unhealthy" },
        "service": "Solana Predictor API",
        "model_loaded": loaded,
        "timestamp": now(),
    }))
}

async fn predict(State(state): State<Arc<FunctionsState>>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let Some(model) = &state.model else {
        return Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, json!({"error": "Modelo o Scaler no cargado"})));
    };

    let data: Map<String, Value> = serde_json::from_slice(&body)
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, json!({"error": "JSON inválido en la petición"})))?;

    let missing = missing_features(&data);
    if !missing.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            json!({
                "error": "Faltan datos requeridos para el modelo",
                "missing": missing,
                "required": MODEL_FEATURES,
            }),
        ));
    }

    let prediction = model.predict(&data).map_err(|e| {
        let status = if e.is_client_error() { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR };
        ApiError::new(status, json!({"error": format!("Error en el servidor: {}", e)}))
    })?;

    Ok(Json(json!({
        "success": true,
        "prediction": prediction,
        "model": model.forest.name(),
        "features_used": MODEL_FEATURES,
        "timestamp": now(),
    })))
}

async fn feedback(State(state): State<Arc<FunctionsState>>, Json(req): Json<FeedbackRequest>) -> Json<Value> {
    let entry = FeedbackEntry {
        timestamp: now(),
        prediction: req.prediction,
        actual: req.actual,
        user_rating: req.rating,
        comments: req.comments,
    };
    info!(prediction = entry.prediction, actual = ?entry.actual, rating = entry.user_rating, "feedback received");
    state.record_feedback(entry);
    Json(json!({"status": "feedback recorded"}))
}

pub fn router(state: Arc<FunctionsState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/predict", post(predict))
        .route("/api/feedback", post(feedback))
        .layer(cors())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForestRegressor, RegressionTree, StandardScaler, TreeNode};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn model() -> PointModel {
        let scaler = StandardScaler::new(vec![0.0; 8], vec![1.0; 8]).unwrap();
        let forest = ForestRegressor::new(8, vec![RegressionTree { nodes: vec![TreeNode::Leaf { value: 123.4 }] }]).unwrap();
        PointModel::new(scaler, forest).unwrap()
    }

    async fn call(state: Arc<FunctionsState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri).header("content-type", "application/json").body(Body::from(body.to_string())).unwrap()
    }

    const FULL: &str =
        r#"{"Open":150,"High":155,"Low":148,"Close":152,"Volume":1000000,"SMA20":149,"SMA50":145,"Volatility":0.03}"#;

    #[tokio::test]
    async fn test_predict_success() {
        let (status, body) = call(Arc::new(FunctionsState::new(Some(model()))), post("/api/predict", FULL)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["prediction"], 123.4);
        assert_eq!(body["model"], "Random Forest");
        assert_eq!(body["features_used"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_predict_missing_features() {
        let (status, body) =
            call(Arc::new(FunctionsState::new(Some(model()))), post("/api/predict", r#"{"Open":1,"Close":2}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["missing"], json!(["High", "Low", "Volume", "SMA20", "SMA50", "Volatility"]));
        assert_eq!(body["required"][7], "Volatility");
    }

    #[tokio::test]
    async fn test_predict_invalid_json() {
        let (status, body) = call(Arc::new(FunctionsState::new(Some(model()))), post("/api/predict", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "JSON inválido en la petición");
    }

    #[tokio::test]
    async fn test_predict_without_model() {
        let (status, _) = call(Arc::new(FunctionsState::new(None)), post("/api/predict", FULL)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) =
            call(Arc::new(FunctionsState::new(None)), Request::get("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["model_loaded"], false);
    }

    #[tokio::test]
    async fn test_feedback_is_kept() {
        let state = Arc::new(FunctionsState::new(None));
        let (status, body) =
            call(state.clone(), post("/api/feedback", r#"{"prediction":21.5,"rating":4,"comments":"ok"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "feedback recorded");
        assert_eq!(state.feedback_count(), 1);
    }

    #[tokio::test]
    async fn test_feedback_keeps_latest_entries() {
        let state = Arc::new(FunctionsState::with_feedback_capacity(None, 3));
        for i in 0..5 {
            let body = format!(r#"{{"prediction":{}.0,"rating":3}}"#, i);
            let (status, _) = call(state.clone(), post("/api/feedback", &body)).await;
            assert_eq!(status, StatusCode::OK);
        }
        assert_eq!(state.feedback_count(), 3);
        let entries = state.feedback.lock().unwrap();
        let kept: Vec<f64> = entries.iter().map(|e| e.prediction).collect();
        assert_eq!(kept, vec![2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn test_predict_without_sequence_artifact() {
        let dir = std::env::temp_dir().join(format!("sol_predictor_functions_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("scaler.json"), r#"{"mean":[0,0,0,0,0,0,0,0],"scale":[1,1,1,1,1,1,1,1]}"#).unwrap();
        std::fs::write(dir.join("rf_model.json"), r#"{"n_features":8,"trees":[{"nodes":[{"value":7.5}]}]}"#).unwrap();
        let _ = std::fs::remove_file(dir.join("lstm_model.json"));

        let model = PointModel::load(&dir).unwrap();
        let (status, body) = call(Arc::new(FunctionsState::new(Some(model))), post("/api/predict", FULL)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], 7.5);
    }
}
