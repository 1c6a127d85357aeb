//! End-to-end checks over files on disk: CSV loading, model artifacts and
//! the dashboard / query pipelines.
//!
//! Run with: cargo test --test pipeline

use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use sol_predictor::model::{ForecastEngine, ModelBundle};
use sol_predictor::nlp::{compute_query_indicators, extract_parameters, preprocess, QueryIndicator};
use sol_predictor::{prepare_features, Analyzer, Error, PriceHistory};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sol_predictor_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// 120 daily bars from 2024-01-01 in the exchange export layout
fn write_csv(dir: &Path) -> PathBuf {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut csv = String::from("Open time,Open,High,Low,Close,Volume,Number of trades\n");
    for i in 0..120 {
        let day = start + Duration::days(i);
        let close = 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1;
        csv.push_str(&format!(
            "{} 00:00:00,{:.4},{:.4},{:.4},{:.4},{},{}\n",
            day,
            close - 0.5,
            close + 1.0,
            close - 1.0,
            close,
            1_000_000 + i * 1000,
            5000 + i
        ));
    }
    let path = dir.join("sol.csv");
    fs::write(&path, csv).unwrap();
    path
}

fn write_models(dir: &Path) {
    fs::write(dir.join("scaler.json"), r#"{"mean":[0,0,0,0,0,0,0,0],"scale":[1,1,1,1,1,1,1,1]}"#).unwrap();
    fs::write(dir.join("rf_model.json"), r#"{"n_features":8,"trees":[{"nodes":[{"value":100.0}]}]}"#).unwrap();
    fs::write(
        dir.join("lstm_model.json"),
        r#"{"window":20,"weights":[0,0,0,0,0,0,0,0],"intercept":50.0}"#,
    )
    .unwrap();
}

#[test]
fn test_csv_round_trip_through_features() {
    let dir = scratch_dir("csv");
    let history = PriceHistory::from_csv(&write_csv(&dir)).unwrap();

    assert_eq!(history.len(), 120);
    assert_eq!(history.shape(), (120, 7));
    assert_eq!(history.candles()[0].open_time.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(history.candles()[5].number_of_trades, Some(5005.0));

    // SMA50 warm-up drops the first 49 rows
    let features = prepare_features(&history, 20);
    assert_eq!(features.len(), 71);
    let closes = history.closes();
    let expected_sma20: f64 = closes[100..120].iter().sum::<f64>() / 20.0;
    assert_relative_eq!(features.last().unwrap().sma20, expected_sma20, epsilon = 1e-9);
}

#[test]
fn test_missing_column_is_reported() {
    let dir = scratch_dir("bad_csv");
    let path = dir.join("bad.csv");
    fs::write(&path, "Open time,Open,High,Low,Volume\n2024-01-01,1,2,0.5,10\n").unwrap();
    assert!(matches!(PriceHistory::from_csv(&path), Err(Error::MissingColumn(c)) if c == "close"));
}

#[test]
fn test_trained_models_drive_dashboard() {
    let dir = scratch_dir("models");
    write_models(&dir);
    let history = PriceHistory::from_csv(&write_csv(&dir)).unwrap();
    let bundle = ModelBundle::load(&dir).unwrap();

    let analyzer = Analyzer::new(history, Ok(ForecastEngine::Trained(bundle)), 14);
    let analysis = analyzer.analyze("gráfico de precio próximos 7 días");

    assert!(analysis.messages.iter().all(|m| !m.text.starts_with("Error")), "{:?}", analysis.messages);
    let horizon = analysis.cards.iter().find(|c| c.label == "Predicción (Día +14)").unwrap();
    // 0.4 * 100 + 0.6 * 50
    assert_eq!(horizon.value, "$70.00");
    let prediction = &analysis.sections[0].figure.data[1];
    assert_eq!(prediction.y.len(), 7);
    assert_relative_eq!(prediction.y[0], 70.0, epsilon = 1e-9);
}

#[test]
fn test_partial_artifacts_are_not_loaded() {
    let dir = scratch_dir("partial");
    fs::write(dir.join("scaler.json"), r#"{"mean":[0],"scale":[1]}"#).unwrap();
    assert!(matches!(ModelBundle::load(&dir), Err(Error::ModelsNotFound(_))));
}

#[test]
fn test_query_pipeline_on_loaded_data() {
    let dir = scratch_dir("query");
    let history = PriceHistory::from_csv(&write_csv(&dir)).unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();

    let params = extract_parameters("rsi y sma del precio en 2024", today);
    assert!(params.indicators.contains(&QueryIndicator::Rsi));
    let mut frame = preprocess(&history, &params);
    compute_query_indicators(&mut frame, &params.indicators);

    assert_eq!(frame.len(), 120);
    let rsi = frame.column("rsi").unwrap();
    assert!(rsi[..13].iter().all(|v| v.is_nan()));
    assert!(rsi[13..].iter().all(|v| (0.0..=100.0).contains(v)));
    let records = frame.to_records(25);
    assert_eq!(records.len(), 25);
    assert!(records[0]["sma_14"].is_number());
}

#[test]
fn test_api_loader_falls_back_to_simulated_data() {
    let dir = scratch_dir("api_loader");
    let path = write_csv(&dir);

    // file above the size limit
    let history = PriceHistory::load_for_api(&path, 10, 1000);
    assert_eq!(history.len(), 90);
    assert_eq!(history.candles()[0].open_time.date(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());

    let history = PriceHistory::load_for_api(&path, 1_000_000, 50);
    assert_eq!(history.len(), 50);

    let history = PriceHistory::load_for_api(&dir.join("missing.csv"), 1_000_000, 1000);
    assert_eq!(history.len(), 90);
}

#[test]
fn test_api_loader_uses_minimal_series_for_unreadable_file() {
    let dir = scratch_dir("api_loader_bad");
    let path = dir.join("broken.csv");
    // no close column
    fs::write(&path, "timestamp,open,high\n2024-01-01,1,2\n").unwrap();

    let history = PriceHistory::load_for_api(&path, 1_000_000, 1000);
    assert_eq!(history.len(), 30);
    assert_relative_eq!(history.closes()[29], 12.9, epsilon = 1e-9);
    assert_eq!(history.candles()[0].open_time.date(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
}
