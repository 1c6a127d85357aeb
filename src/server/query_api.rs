//! Free-text query API consumed by the chat front end.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use super::{cors, ApiError};
use crate::config::AppConfig;
use crate::data::PriceHistory;
use crate::error::Result;
use crate::model::ForecastEngine;
use crate::nlp::{
    compute_query_indicators, extract_parameters, generate_explanation, preprocess, wants_prediction, QueryFrame,
    QueryIndicator, QueryMetric, TimeRange,
};

/// Rows kept from the data file
pub const MAX_HISTORY_ROWS: usize = 1000;

pub struct QueryState {
    pub history: Option<PriceHistory>,
    pub engine: Option<ForecastEngine>,
    pub max_chart_points: usize,
}

impl QueryState {
    /// Data loading never fails (simulated or fallback rows stand in);
    /// a predictor load error leaves `engine` empty.
    pub fn from_config(config: &AppConfig) -> Self {
        let history = PriceHistory::load_for_api(&config.data_path, config.max_data_bytes, MAX_HISTORY_ROWS);
        info!(rows = history.len(), "historical data loaded");
        let engine = match ForecastEngine::from_config(config) {
            Ok(engine) => {
                info!(model_type = engine.model_type(), "predictor ready");
                Some(engine)
            }
            Err(e) => {
                error!(error = %e, "failed to load predictor");
                None
            }
        };
        Self { history: Some(history), engine, max_chart_points: config.max_chart_points }
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct PredictData {
    pub chart_data: Vec<Value>,
    pub prediction: Option<f64>,
    pub indicators: Vec<QueryIndicator>,
    pub time_range: TimeRange,
    pub metrics: Vec<QueryMetric>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub data: PredictData,
    pub message: String,
}

fn answer(
    history: &PriceHistory,
    engine: &ForecastEngine,
    query: &str,
    today: NaiveDate,
    max_points: usize,
) -> Result<PredictResponse> {
    let params = extract_parameters(query, today);
    let mut frame: QueryFrame = preprocess(history, &params);
    if !params.indicators.is_empty() {
        compute_query_indicators(&mut frame, &params.indicators);
    }

    let prediction = match (wants_prediction(query), frame.rows().last_candle()) {
        (true, Some(last)) => {
            // the predictor sees everything up to the end of the selected range
            let upto = history.between(NaiveDate::MIN, last.open_time.date());
            Some(engine.predict_price(&upto)?)
        }
        (true, None) => Some(engine.predict_price(&PriceHistory::default())?),
        (false, _) => None,
    };

    let message = generate_explanation(query, prediction, &params);
    Ok(PredictResponse {
        status: "success",
        data: PredictData {
            chart_data: frame.to_records(max_points),
            prediction,
            indicators: params.indicators,
            time_range: params.time_range,
            metrics: params.metrics,
        },
        message,
    })
}

async fn predict(
    State(state): State<Arc<QueryState>>,
    Json(req): Json<PredictRequest>,
) -> std::result::Result<Json<PredictResponse>, ApiError> {
    let (Some(history), Some(engine)) = (&state.history, &state.engine) else {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"status": "error", "message": "Modelo o datos no disponibles. Verifica la configuración."}),
        ));
    };

    let today = Local::now().date_naive();
    answer(history, engine, &req.query, today, state.max_chart_points).map(Json).map_err(|e| {
        error!(error = %e, query = %req.query, "query failed");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "status": "error",
                "message": format!("Error processing request: {}", e),
                "details": e.to_string(),
            }),
        )
    })
}

async fn health(State(state): State<Arc<QueryState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model_loaded": state.engine.is_some(),
        "data_loaded": state.history.is_some(),
        "data_shape": state.history.as_ref().map(|h| h.shape()),
        "model_type": state.engine.as_ref().map(|e| e.model_type()),
    }))
}

async fn indicators() -> Json<Value> {
    Json(json!({
        "available_indicators": [
            {
                "name": "RSI",
                "description": "Índice de Fuerza Relativa - mide la magnitud de los cambios recientes de precios para evaluar condiciones de sobrecompra o sobreventa",
                "parameters": {"period": 14}
            },
            {
                "name": "SMA",
                "description": "Media Móvil Simple - promedio de precios en un período determinado",
                "parameters": {"period": 20}
            },
            {
                "name": "Volatilidad",
                "description": "Desviación estándar de los retornos en un período determinado",
                "parameters": {"window": 20}
            }
        ]
    }))
}

pub fn router(state: Arc<QueryState>) -> Router {
    Router::new()
        .route("/api/predict", post(predict))
        .route("/api/health", get(health))
        .route("/api/indicators", get(indicators))
        .layer(cors())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SimulatedModel;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state(max_chart_points: usize) -> Arc<QueryState> {
        Arc::new(QueryState {
            history: Some(PriceHistory::simulated(42)),
            engine: Some(ForecastEngine::Simulated(SimulatedModel::with_seed(9))),
            max_chart_points,
        })
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_query(query: &str) -> Request<Body> {
        Request::post("/api/predict")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "query": query }).to_string()))
            .unwrap()
    }

    #[test]
    fn test_answer_with_prediction() {
        let history = PriceHistory::simulated(42);
        let engine = ForecastEngine::Simulated(SimulatedModel::with_seed(9));
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let response = answer(&history, &engine, "predicción del precio con rsi en 2023", today, 1000).unwrap();

        assert_eq!(response.data.chart_data.len(), 90);
        let first = &response.data.chart_data[0];
        assert_eq!(first["timestamp"], "2023-01-01T00:00:00");
        assert!(first["rsi"].is_null());
        let prediction = response.data.prediction.unwrap();
        let last_close = history.closes()[89];
        assert!((prediction / last_close - 1.0).abs() <= 0.021);
        assert!(response.message.contains("para el año 2023"));
    }

    #[tokio::test]
    async fn test_predict_caps_chart_points() {
        let (status, body) = call(router(state(10)), post_query("volumen 2023")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["chart_data"].as_array().unwrap().len(), 10);
        assert!(body["data"]["prediction"].is_null());
    }

    #[tokio::test]
    async fn test_predict_without_model() {
        let state = Arc::new(QueryState { history: Some(PriceHistory::fallback()), engine: None, max_chart_points: 10 });
        let (status, body) = call(router(state), post_query("precio")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_health_reports_shape() {
        let (_, body) = call(router(state(10)), Request::get("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["data_shape"], json!([90, 7]));
        assert_eq!(body["model_type"], "simulated");
    }

    #[tokio::test]
    async fn test_indicator_catalogue() {
        let (_, body) = call(router(state(10)), Request::get("/api/indicators").body(Body::empty()).unwrap()).await;
        let names: Vec<&str> =
            body["available_indicators"].as_array().unwrap().iter().map(|i| i["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["RSI", "SMA", "Volatilidad"]);
    }

    #[tokio::test]
    async fn test_cors_header() {
        let request = Request::get("/api/health").header("origin", "http://example.com").body(Body::empty()).unwrap();
        let response = router(state(10)).oneshot(request).await.unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
