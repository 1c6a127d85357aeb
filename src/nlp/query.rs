//! Parameter extraction for free-form API queries, plus the table the query
//! API answers with.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::PriceHistory;
use crate::moving_averages::sma;
use crate::oscillators::rsi_rolling;
use crate::volatility::{rolling_volatility, CALENDAR_DAYS};

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeRange {
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        Self { start: today - Duration::days(days), end: today }
    }

    pub fn year(year: i32) -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMetric {
    Close,
    Open,
    High,
    Low,
    Volume,
    NumberOfTrades,
}

impl QueryMetric {
    pub fn column(&self) -> &'static str {
        match self {
            QueryMetric::Close => "close",
            QueryMetric::Open => "open",
            QueryMetric::High => "high",
            QueryMetric::Low => "low",
            QueryMetric::Volume => "volume",
            QueryMetric::NumberOfTrades => "number_of_trades",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIndicator {
    Rsi,
    Sma,
    Volatility,
}

impl QueryIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIndicator::Rsi => "rsi",
            QueryIndicator::Sma => "sma",
            QueryIndicator::Volatility => "volatility",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Line,
    Dual,
    Bar,
    Candlestick,
}

/// Parameters pulled out of a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub time_range: TimeRange,
    pub metrics: Vec<QueryMetric>,
    pub indicators: Vec<QueryIndicator>,
    pub chart_type: ChartType,
}

const VOLUME_WORDS: &[&str] = &["volumen", "volumenes"];
const PRICE_WORDS: &[&str] = &["precio", "close", "apertura", "open", "máximo", "high", "mínimo", "low"];
const TRADES_WORDS: &[&str] = &["operaciones", "trades"];
const RSI_WORDS: &[&str] = &["rsi", "fuerza relativa"];
const SMA_WORDS: &[&str] = &["media móvil", "sma", "promedio móvil", "moving average"];
const VOLATILITY_WORDS: &[&str] = &["volatilidad", "desviación estándar", "std dev"];
const PREDICTION_TRIGGERS: &[&str] = &["predicción", "predecir", "pronóstico", "forecast"];

const FIRST_YEAR: i32 = 2020;
const DEFAULT_WINDOW_DAYS: i64 = 30;

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Whether the query asks for a price prediction
pub fn wants_prediction(query: &str) -> bool {
    contains_any(&query.to_lowercase(), PREDICTION_TRIGGERS)
}

/// Extract metrics, indicators, chart type and date range from `query`.
/// Relative ranges ("último mes") are computed against `today`.
pub fn extract_parameters(query: &str, today: NaiveDate) -> QueryParams {
    let text = query.to_lowercase();

    let mut metrics = vec![QueryMetric::Close, QueryMetric::Volume];
    let mut chart_type = ChartType::Line;

    if contains_any(&text, VOLUME_WORDS) {
        metrics = vec![QueryMetric::Volume];
        if text.contains("precio") || text.contains("close") {
            metrics = vec![QueryMetric::Close, QueryMetric::Volume];
            chart_type = ChartType::Dual;
        }
    }

    if contains_any(&text, PRICE_WORDS) {
        metrics = vec![if text.contains("open") {
            QueryMetric::Open
        } else if text.contains("high") || text.contains("máximo") {
            QueryMetric::High
        } else if text.contains("low") || text.contains("mínimo") {
            QueryMetric::Low
        } else {
            QueryMetric::Close
        }];
    }

    if contains_any(&text, TRADES_WORDS) {
        metrics = vec![QueryMetric::NumberOfTrades];
    }

    let mut indicators = Vec::new();
    if contains_any(&text, RSI_WORDS) {
        indicators.push(QueryIndicator::Rsi);
    }
    if contains_any(&text, SMA_WORDS) {
        indicators.push(QueryIndicator::Sma);
    }
    if contains_any(&text, VOLATILITY_WORDS) {
        indicators.push(QueryIndicator::Volatility);
    }

    if text.contains("barra") {
        chart_type = ChartType::Bar;
    }
    if text.contains("vela") || text.contains("candle") || text.contains("japones") {
        chart_type = ChartType::Candlestick;
    }

    let mut time_range = if text.contains("último mes") || text.contains("últimos 30 días") {
        Some(TimeRange::last_days(today, 30))
    } else if text.contains("último trimestre") || text.contains("últimos 90 días") {
        Some(TimeRange::last_days(today, 90))
    } else if text.contains("último año") {
        Some(TimeRange {
            start: NaiveDate::from_ymd_opt(today.year() - 1, 1, 1).unwrap_or_default(),
            end: today,
        })
    } else {
        None
    };

    if let Some(year) = (FIRST_YEAR..=today.year()).find(|y| text.contains(&y.to_string())) {
        time_range = Some(TimeRange::year(year));
    }

    QueryParams {
        time_range: time_range.unwrap_or_else(|| TimeRange::last_days(today, DEFAULT_WINDOW_DAYS)),
        metrics,
        indicators,
        chart_type,
    }
}

/// Rows selected for a query, with the requested columns
#[derive(Debug, Clone)]
pub struct QueryFrame {
    rows: PriceHistory,
    columns: Vec<(String, Vec<f64>)>,
}

impl QueryFrame {
    pub fn rows(&self) -> &PriceHistory {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_slice())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    fn push_column(&mut self, name: &str, values: Vec<f64>) {
        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name.to_string(), values)),
        }
    }

    /// The last `limit` rows as JSON objects, NaN rendered as `null`
    pub fn to_records(&self, limit: usize) -> Vec<Value> {
        let timestamps = self.rows.timestamps();
        let start = timestamps.len().saturating_sub(limit);
        (start..timestamps.len())
            .map(|i| {
                let mut record = Map::new();
                record.insert("timestamp".to_string(), Value::String(format_timestamp(&timestamps[i])));
                for (name, values) in &self.columns {
                    record.insert(name.clone(), number_or_null(values[i]));
                }
                Value::Object(record)
            })
            .collect()
    }
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn number_or_null(value: f64) -> Value {
    serde_json::Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// Filter `history` to the query range and keep the requested metrics.
///
/// An empty range falls back to the last 30 days of available data. Metrics
/// the data cannot provide are dropped; with none left, close and volume are
/// returned.
pub fn preprocess(history: &PriceHistory, params: &QueryParams) -> QueryFrame {
    let mut rows = history.between(params.time_range.start, params.time_range.end);

    if rows.is_empty() {
        if let Some(last) = history.last_candle() {
            let end = last.open_time.date();
            tracing::debug!(%end, "no rows in requested range, using the last 30 days of data");
            rows = history.between(end - Duration::days(DEFAULT_WINDOW_DAYS), end);
        }
    }

    let has_trades = rows.candles().iter().any(|c| c.number_of_trades.is_some());
    let mut metrics: Vec<QueryMetric> = params
        .metrics
        .iter()
        .copied()
        .filter(|m| *m != QueryMetric::NumberOfTrades || has_trades)
        .collect();
    if metrics.is_empty() {
        metrics = vec![QueryMetric::Close, QueryMetric::Volume];
    }

    let columns = metrics
        .iter()
        .map(|m| {
            let values = match m {
                QueryMetric::Close => rows.closes(),
                QueryMetric::Open => rows.opens(),
                QueryMetric::High => rows.highs(),
                QueryMetric::Low => rows.lows(),
                QueryMetric::Volume => rows.volumes(),
                QueryMetric::NumberOfTrades => rows.trades(),
            };
            (m.column().to_string(), values)
        })
        .collect();

    QueryFrame { rows, columns }
}

/// Append indicator columns computed from the frame's closes:
/// `rsi` (14), `sma_7`, `sma_14`, `sma_30` and `volatility` (20 day window,
/// annualized over 365 days).
pub fn compute_query_indicators(frame: &mut QueryFrame, indicators: &[QueryIndicator]) {
    let closes = frame.rows.closes();
    for indicator in indicators {
        match indicator {
            QueryIndicator::Rsi => frame.push_column("rsi", rsi_rolling(&closes, 14)),
            QueryIndicator::Sma => {
                frame.push_column("sma_7", sma(&closes, 7));
                frame.push_column("sma_14", sma(&closes, 14));
                frame.push_column("sma_30", sma(&closes, 30));
            }
            QueryIndicator::Volatility => {
                frame.push_column("volatility", rolling_volatility(&closes, 20, CALENDAR_DAYS))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Candle;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn history(days: i64, start: NaiveDate) -> PriceHistory {
        PriceHistory::new(
            (0..days)
                .map(|i| Candle {
                    open_time: (start + Duration::days(i)).and_hms_opt(0, 0, 0).unwrap(),
                    open: 1.0,
                    high: 2.0,
                    low: 0.5,
                    close: 1.0 + i as f64,
                    volume: 10.0,
                    number_of_trades: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let p = extract_parameters("hola", today());
        assert_eq!(p.metrics, vec![QueryMetric::Close, QueryMetric::Volume]);
        assert!(p.indicators.is_empty());
        assert_eq!(p.chart_type, ChartType::Line);
        assert_eq!(p.time_range, TimeRange::last_days(today(), 30));
    }

    #[test]
    fn test_volume_with_price_is_dual() {
        let p = extract_parameters("volumen", today());
        assert_eq!(p.metrics, vec![QueryMetric::Volume]);
        // the price check runs afterwards and narrows metrics to close
        let p = extract_parameters("volumen y precio", today());
        assert_eq!(p.chart_type, ChartType::Dual);
        assert_eq!(p.metrics, vec![QueryMetric::Close]);
    }

    #[test]
    fn test_price_variants() {
        assert_eq!(extract_parameters("precio máximo", today()).metrics, vec![QueryMetric::High]);
        assert_eq!(extract_parameters("low", today()).metrics, vec![QueryMetric::Low]);
        assert_eq!(extract_parameters("open", today()).metrics, vec![QueryMetric::Open]);
        assert_eq!(extract_parameters("número de operaciones", today()).metrics, vec![QueryMetric::NumberOfTrades]);
    }

    #[test]
    fn test_indicators_and_chart() {
        let p = extract_parameters("RSI y media móvil con volatilidad en velas", today());
        assert_eq!(p.indicators, vec![QueryIndicator::Rsi, QueryIndicator::Sma, QueryIndicator::Volatility]);
        assert_eq!(p.chart_type, ChartType::Candlestick);
        assert_eq!(extract_parameters("gráfico de barras", today()).chart_type, ChartType::Bar);
    }

    #[test]
    fn test_time_ranges() {
        let t = today();
        assert_eq!(extract_parameters("último trimestre", t).time_range, TimeRange::last_days(t, 90));
        let year = extract_parameters("último año", t).time_range;
        assert_eq!(year.start, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(year.end, t);
        assert_eq!(extract_parameters("precio en 2022", t).time_range, TimeRange::year(2022));
        // future years are not recognised
        assert_eq!(extract_parameters("precio en 2026", t).time_range, TimeRange::last_days(t, 30));
    }

    #[test]
    fn test_wants_prediction() {
        assert!(wants_prediction("Dame un pronóstico"));
        assert!(wants_prediction("FORECAST please"));
        assert!(!wants_prediction("precio histórico"));
    }

    #[test]
    fn test_preprocess_range_and_fallback() {
        let h = history(60, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        let mut params = extract_parameters("precio en 2023", today());
        let frame = preprocess(&h, &params);
        assert_eq!(frame.len(), 60);
        assert_eq!(frame.column_names(), vec!["close"]);

        params.time_range = TimeRange::year(2021);
        let frame = preprocess(&h, &params);
        // last 30 days inclusive of the last date
        assert_eq!(frame.len(), 31);
    }

    #[test]
    fn test_preprocess_drops_unavailable_trades() {
        let h = history(5, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        let params = extract_parameters("trades", today());
        let frame = preprocess(&h, &params);
        assert_eq!(frame.column_names(), vec!["close", "volume"]);
    }

    #[test]
    fn test_indicators_and_records() {
        let h = history(30, NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
        let params = extract_parameters("precio con sma y rsi", today());
        let mut frame = preprocess(&h, &params);
        compute_query_indicators(&mut frame, &params.indicators);
        assert_eq!(frame.column_names(), vec!["close", "rsi", "sma_7", "sma_14", "sma_30"]);

        let records = frame.to_records(5);
        assert_eq!(records.len(), 5);
        let last = records.last().unwrap();
        assert!(last["timestamp"].as_str().unwrap().starts_with("2024-06-15"));
        assert!(last["sma_7"].is_number());
        // 27 rows fall in the range, short of a 30 day window
        assert_eq!(frame.len(), 27);
        assert!(last["sma_30"].is_null());

        let first_rows = frame.to_records(usize::MAX);
        assert!(first_rows[0]["sma_7"].is_null());
    }
}
