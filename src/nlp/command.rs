//! Keyword parser for dashboard commands such as
//! "gráfico de precio próximos 14 días" or "RSI histórico en 2023".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Quantity the user asks about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Price,
    Volume,
    Rsi,
    Sma,
    Macd,
    Volatility,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Price => "price",
            Metric::Volume => "volume",
            Metric::Rsi => "rsi",
            Metric::Sma => "sma",
            Metric::Macd => "macd",
            Metric::Volatility => "volatility",
        }
    }
}

/// What kind of answer the command expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Prediction,
    Indicator,
    Historical,
}

/// Trailing window in days, or a calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Period {
    Days(u32),
    Year { year: i32 },
}

impl Period {
    pub fn label(&self) -> String {
        match self {
            Period::Days(days) => format!("{} días", days),
            Period::Year { year } => format!("Año {}", year),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visualization {
    Line,
    Bar,
    Candlestick,
}

/// Result of [`parse_command`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCommand {
    pub metric: Metric,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub period: Period,
    /// Horizon named in the text; `None` leaves it to the caller's default
    pub forecast_days: Option<u32>,
    pub visualization: Visualization,
    pub confidence: f64,
}

/// Commands scored below this are rejected as not understood
pub const MIN_CONFIDENCE: f64 = 0.2;

const BASE_CONFIDENCE: f64 = 0.3;
const METRIC_BONUS: f64 = 0.2;

const PREDICTION_WORDS: &[&str] = &["próximo", "futuro", "predice", "va a", "será", "predicción"];
const HISTORICAL_WORDS: &[&str] = &["histórico", "pasado", "era", "fue"];
const INDICATOR_WORDS: &[&str] = &["rsi", "sma", "macd", "bollinger", "volatilidad", "atr"];

// Checked in order, first match wins
const METRIC_WORDS: &[(Metric, &[&str])] = &[
    (Metric::Price, &["precio", "cierre", "close", "costo"]),
    (Metric::Volume, &["volumen", "volume"]),
    (Metric::Rsi, &["rsi", "fortaleza"]),
    (Metric::Sma, &["sma", "media móvil", "promedio"]),
    (Metric::Macd, &["macd", "convergencia"]),
    (Metric::Volatility, &["volatilidad", "volatility"]),
];

// "últimos ..." shortcuts, checked in order
const TRAILING_SHORTCUTS: &[(&[&str], u32)] = &[
    (&["7", "semana"], 7),
    (&["14"], 14),
    (&["30", "mes"], 30),
    (&["90", "trimestre"], 90),
    (&["365", "año"], 365),
];

const FIRST_YEAR: i32 = 2020;
const LAST_YEAR: i32 = 2025;

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+)\s*(días?|d\b|semanas?|meses?|años?)").expect("valid period regex")
});

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Map a Spanish command onto metric, request kind, period and chart type.
///
/// Matching is substring based on the lowercased input; the confidence grows
/// with each recognised element and is capped at 1.
pub fn parse_command(input: &str) -> ParsedCommand {
    let text = input.trim().to_lowercase();

    let mut parsed = ParsedCommand {
        metric: Metric::Price,
        kind: RequestKind::Historical,
        period: Period::Days(30),
        forecast_days: None,
        visualization: Visualization::Line,
        confidence: BASE_CONFIDENCE,
    };

    if contains_any(&text, PREDICTION_WORDS) {
        parsed.kind = RequestKind::Prediction;
        parsed.confidence = 0.7;
    } else if contains_any(&text, HISTORICAL_WORDS) {
        parsed.kind = RequestKind::Historical;
        parsed.confidence = 0.7;
    } else if contains_any(&text, INDICATOR_WORDS) {
        parsed.kind = RequestKind::Indicator;
        parsed.confidence = 0.8;
    }

    if let Some((metric, _)) = METRIC_WORDS.iter().find(|(_, words)| contains_any(&text, words)) {
        parsed.metric = *metric;
        parsed.confidence += METRIC_BONUS;
    }

    if let Some(caps) = PERIOD_RE.captures(&text) {
        if let Ok(num) = caps[1].parse::<u32>() {
            let unit = &caps[2];
            let days = if unit.starts_with('d') {
                Some(num)
            } else if unit.starts_with("semana") {
                Some(num.saturating_mul(7))
            } else if unit.starts_with("mes") {
                Some(num.saturating_mul(30))
            } else {
                // a year too large for i32 is ignored
                if let Ok(n) = i32::try_from(num) {
                    let year = if n < 100 { 2000 + n } else { n };
                    parsed.period = Period::Year { year };
                }
                None
            };
            if let Some(days) = days {
                parsed.period = Period::Days(days);
                parsed.forecast_days = Some(days);
            }
        }
    }

    if text.contains("últimos") || text.contains("últimas") {
        if let Some((_, days)) = TRAILING_SHORTCUTS.iter().find(|(words, _)| contains_any(&text, words)) {
            parsed.period = Period::Days(*days);
            parsed.forecast_days = Some(*days);
        }
    }

    if let Some(year) = (FIRST_YEAR..=LAST_YEAR).find(|y| text.contains(&y.to_string())) {
        parsed.period = Period::Year { year };
    }

    if text.contains("barras") || text.contains("bar") {
        parsed.visualization = Visualization::Bar;
    } else if text.contains("velas") || text.contains("candlestick") {
        parsed.visualization = Visualization::Candlestick;
    }

    parsed.confidence = parsed.confidence.min(1.0);
    parsed
}
