//! Historical OHLCV data: CSV loading, range selection and model features.

use std::path::Path;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::common::{pct_change, rolling, sample_std};
use crate::error::{Error, Result};
use crate::moving_averages::sma;

/// One daily bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub open_time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_trades: Option<f64>,
}

/// Time-ordered candles with unique timestamps
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    candles: Vec<Candle>,
}

// Header aliases, compared lowercase
const TIME_COLUMNS: &[&str] = &["open time", "timestamp", "date"];
const TRADES_COLUMNS: &[&str] = &["number of trades", "number_of_trades"];

impl PriceHistory {
    /// Sort by time and keep the last row for duplicated timestamps
    pub fn new(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.open_time);
        let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match deduped.last_mut() {
                Some(last) if last.open_time == candle.open_time => *last = candle,
                _ => deduped.push(candle),
            }
        }
        Self { candles: deduped }
    }

    /// Read a CSV with either `Open time, Open, High, Low, Close, Volume` or
    /// `timestamp, open, high, low, close, volume` headers.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        let history = Self::from_frame(&df)?;
        tracing::info!(path = %path.display(), rows = history.len(), "historical data loaded");
        Ok(history)
    }

    fn from_frame(df: &DataFrame) -> Result<Self> {
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        let find = |aliases: &[&str]| -> Option<String> {
            names.iter().find(|n| aliases.contains(&n.trim().to_lowercase().as_str())).cloned()
        };
        let require = |aliases: &[&str]| -> Result<String> {
            find(aliases).ok_or_else(|| Error::MissingColumn(aliases[0].to_string()))
        };

        let times = string_column(df, &require(TIME_COLUMNS)?)?;
        let opens = float_column(df, &require(&["open"])?)?;
        let highs = float_column(df, &require(&["high"])?)?;
        let lows = float_column(df, &require(&["low"])?)?;
        let closes = float_column(df, &require(&["close"])?)?;
        let volumes = float_column(df, &require(&["volume"])?)?;
        let trades = match find(TRADES_COLUMNS) {
            Some(name) => Some(float_column(df, &name)?),
            None => None,
        };

        let mut candles = Vec::with_capacity(times.len());
        for (i, raw) in times.iter().enumerate() {
            let Some(raw) = raw else { continue };
            candles.push(Candle {
                open_time: parse_timestamp(raw)?,
                open: opens[i],
                high: highs[i],
                low: lows[i],
                close: closes[i],
                volume: volumes[i],
                number_of_trades: trades.as_ref().map(|t| t[i]),
            });
        }

        if candles.is_empty() {
            return Err(Error::EmptyData("CSV has no rows".to_string()));
        }
        Ok(Self::new(candles))
    }

    /// Loader used by the query API.
    ///
    /// Real data when the file exists and is smaller than `max_bytes`,
    /// simulated data otherwise, and a minimal fixed series when reading
    /// fails. Keeps at most the last `max_rows` rows.
    pub fn load_for_api(path: &Path, max_bytes: u64, max_rows: usize) -> Self {
        let usable = std::fs::metadata(path).map(|m| m.len() < max_bytes).unwrap_or(false);

        let history = if usable {
            match Self::from_csv(path) {
                Ok(history) => history,
                Err(e) => {
                    tracing::error!(error = %e, "failed to load data, using minimal fallback series");
                    Self::fallback()
                }
            }
        } else {
            tracing::warn!(path = %path.display(), "using SIMULATED data for demonstration");
            Self::simulated(42)
        };

        history.last(max_rows)
    }

    /// Seeded random walk for 2023-01-01..=2023-03-31 around a price of 10
    pub fn simulated(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
        let end = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap_or_default();

        let mut price = 10.0;
        let mut candles = Vec::new();
        let mut day = start;
        while day <= end {
            price += standard_normal(&mut rng) * 0.5;
            candles.push(Candle {
                open_time: day.and_hms_opt(0, 0, 0).unwrap_or_default(),
                open: price * 0.99,
                high: price * 1.01,
                low: price * 0.98,
                close: price,
                volume: rng.gen_range(1_000_000..3_000_000) as f64,
                number_of_trades: Some(rng.gen_range(4_000..7_000) as f64),
            });
            day += Duration::days(1);
        }
        Self::new(candles)
    }

    /// Thirty flat-ish days starting 2023-01-01
    pub fn fallback() -> Self {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
        let candles = (0..30)
            .map(|i| {
                let close = 10.0 + i as f64 * 0.1;
                Candle {
                    open_time: (start + Duration::days(i)).and_hms_opt(0, 0, 0).unwrap_or_default(),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1_000_000.0 + i as f64 * 50_000.0,
                    number_of_trades: None,
                }
            })
            .collect();
        Self::new(candles)
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// (rows, columns) as they would appear in the source table
    pub fn shape(&self) -> (usize, usize) {
        let has_trades = self.candles.iter().any(|c| c.number_of_trades.is_some());
        (self.len(), if has_trades { 7 } else { 6 })
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.candles.iter().map(|c| c.open_time).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    pub fn trades(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.number_of_trades.unwrap_or(f64::NAN)).collect()
    }

    pub fn last_candle(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// The last `n` rows
    pub fn last(&self, n: usize) -> Self {
        let start = self.candles.len().saturating_sub(n);
        Self { candles: self.candles[start..].to_vec() }
    }

    /// Rows whose timestamp falls in calendar year `year`
    pub fn year(&self, year: i32) -> Self {
        Self {
            candles: self.candles.iter().filter(|c| c.open_time.year() == year).cloned().collect(),
        }
    }

    /// Rows with `start <= date <= end` (dates compared at day granularity)
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            candles: self
                .candles
                .iter()
                .filter(|c| {
                    let d = c.open_time.date();
                    d >= start && d <= end
                })
                .cloned()
                .collect(),
        }
    }
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df.column(name)?.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series().cast(&DataType::String)?;
    Ok(series.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Parse `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[.f]`, RFC 3339 or an epoch
/// (milliseconds when larger than 1e11, seconds otherwise).
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();

    if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) && s.len() > 8 {
        let value: i64 = s.parse().map_err(|_| Error::InvalidTimestamp(raw.to_string()))?;
        let dt = if value > 100_000_000_000 {
            DateTime::from_timestamp_millis(value)
        } else {
            DateTime::from_timestamp(value, 0)
        };
        return dt.map(|d| d.naive_utc()).ok_or_else(|| Error::InvalidTimestamp(raw.to_string()));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::InvalidTimestamp(raw.to_string()))
}

// Box-Muller transform over two uniforms in (0, 1]
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Model inputs, in the order the artifacts were trained with
pub const MODEL_FEATURES: [&str; 8] = ["Open", "High", "Low", "Close", "Volume", "SMA20", "SMA50", "Volatility"];

/// Engineered features for one bar
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRow {
    pub open_time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub returns: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub volatility: f64,
    pub hl_range: f64,
    pub volume_ma: f64,
    pub volume_norm: f64,
}

impl FeatureRow {
    /// Values matching [`MODEL_FEATURES`]
    pub fn model_inputs(&self) -> [f64; 8] {
        [self.open, self.high, self.low, self.close, self.volume, self.sma20, self.sma50, self.volatility]
    }

    fn is_complete(&self) -> bool {
        [self.returns, self.sma20, self.sma50, self.volatility, self.hl_range, self.volume_ma, self.volume_norm]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Returns, moving averages, volatility and volume ratios per bar.
/// Rows where any feature is still warming up are dropped.
pub fn prepare_features(history: &PriceHistory, window: usize) -> Vec<FeatureRow> {
    let closes = history.closes();
    let volumes = history.volumes();

    let returns = pct_change(&closes);
    let sma20 = sma(&closes, 20);
    let sma50 = sma(&closes, 50);
    let volatility = rolling(&returns, window, sample_std);
    let volume_ma = sma(&volumes, 20);

    history
        .candles()
        .iter()
        .enumerate()
        .map(|(i, c)| FeatureRow {
            open_time: c.open_time,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            returns: returns[i],
            sma20: sma20[i],
            sma50: sma50[i],
            volatility: volatility[i],
            hl_range: (c.high - c.low) / c.close,
            volume_ma: volume_ma[i],
            volume_norm: c.volume / volume_ma[i],
        })
        .filter(FeatureRow::is_complete)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(date: &str, close: f64) -> Candle {
        Candle {
            open_time: parse_timestamp(date).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
            number_of_trades: None,
        }
    }

    #[test]
    fn test_new_sorts_and_keeps_last_duplicate() {
        let history = PriceHistory::new(vec![
            candle("2024-01-02", 2.0),
            candle("2024-01-01", 1.0),
            candle("2024-01-02", 3.0),
        ]);
        assert_eq!(history.closes(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2021-03-04").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-04 00:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-04T00:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("1614816000000").unwrap(), expected);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_selection() {
        let history = PriceHistory::new(vec![
            candle("2022-12-31", 1.0),
            candle("2023-01-01", 2.0),
            candle("2023-06-01", 3.0),
        ]);
        assert_eq!(history.year(2023).closes(), vec![2.0, 3.0]);
        assert_eq!(history.last(2).closes(), vec![2.0, 3.0]);
        assert_eq!(history.last(10).len(), 3);
        let start = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert_eq!(history.between(start, end).closes(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_simulated_is_deterministic() {
        let a = PriceHistory::simulated(42);
        let b = PriceHistory::simulated(42);
        assert_eq!(a.len(), 90);
        assert_eq!(a.closes(), b.closes());
        assert_eq!(a.shape(), (90, 7));
        let first = &a.candles()[0];
        assert!((first.high - first.close * 1.01).abs() < 1e-12);
    }

    #[test]
    fn test_fallback_series() {
        let history = PriceHistory::fallback();
        assert_eq!(history.len(), 30);
        assert!((history.closes()[29] - 12.9).abs() < 1e-9);
        assert_eq!(history.volumes()[1], 1_050_000.0);
    }

    #[test]
    fn test_prepare_features_drops_warmup() {
        let candles: Vec<Candle> = (0..80)
            .map(|i| {
                let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i);
                let mut c = candle(&day.to_string(), 100.0 + (i as f64 * 0.7).sin() * 3.0);
                c.volume = 1000.0 + i as f64;
                c
            })
            .collect();
        let features = prepare_features(&PriceHistory::new(candles), 20);
        // SMA50 needs 50 closes: first complete row is index 49
        assert_eq!(features.len(), 31);
        let row = &features[0];
        assert_eq!(row.model_inputs()[3], row.close);
        assert!(row.volume_norm > 0.0);
    }
}
