//! Plotly figure JSON for the dashboard.
//!
//! Figures are plain serde structs; the browser renders them with
//! `Plotly.newPlot(el, fig.data, fig.layout)`.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::data::PriceHistory;
use crate::model::Forecast;
use crate::nlp::{Metric, Visualization};

const HISTORY_COLOR: &str = "#667eea";
const PREDICTION_COLOR: &str = "#ff6b6b";
const BAND_FILL: &str = "rgba(255, 107, 107, 0.2)";
const INDICATOR_COLORS: [&str; 3] = ["#ff6b6b", "#4ecdc4", "#95e77d"];
const FIGURE_HEIGHT: u32 = 600;
const TEMPLATE: &str = "plotly_dark";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
}

impl Line {
    fn solid(color: &str) -> Self {
        Self { color: color.to_string(), width: None, dash: None }
    }

    fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    fn dashed(mut self) -> Self {
        self.dash = Some("dash".to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub color: String,
}

/// One Plotly trace. Only the fields its `type` uses are set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub x: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub y: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fillcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoverinfo: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub open: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub high: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub low: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub close: Vec<f64>,
}

impl Trace {
    fn new(kind: &str, name: &str, x: Vec<Value>, y: Vec<f64>) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            x,
            y,
            mode: None,
            line: None,
            marker: None,
            opacity: None,
            fill: None,
            fillcolor: None,
            hoverinfo: None,
            open: Vec::new(),
            high: Vec::new(),
            low: Vec::new(),
            close: Vec::new(),
        }
    }

    fn scatter(name: &str, x: Vec<Value>, y: Vec<f64>, line: Line) -> Self {
        Self { mode: Some("lines".to_string()), line: Some(line), ..Self::new("scatter", name, x, y) }
    }

    fn bar(name: &str, x: Vec<Value>, y: Vec<f64>, color: &str) -> Self {
        Self { marker: Some(Marker { color: color.to_string() }), ..Self::new("bar", name, x, y) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: String,
    pub xaxis: Axis,
    pub yaxis: Axis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovermode: Option<String>,
    pub height: u32,
    pub template: String,
}

impl Layout {
    fn new(title: &str, x_title: &str, y_title: &str) -> Self {
        Self {
            title: title.to_string(),
            xaxis: Axis { title: x_title.to_string() },
            yaxis: Axis { title: y_title.to_string() },
            hovermode: None,
            height: FIGURE_HEIGHT,
            template: TEMPLATE.to_string(),
        }
    }

    fn unified_hover(mut self) -> Self {
        self.hovermode = Some("x unified".to_string());
        self
    }
}

fn date_axis(times: &[NaiveDateTime]) -> Vec<Value> {
    times.iter().map(|t| Value::String(t.format("%Y-%m-%d").to_string())).collect()
}

/// The `n` days following the last bar
fn future_dates(history: &PriceHistory, n: usize) -> Vec<NaiveDateTime> {
    match history.last_candle() {
        Some(last) => (1..=n as i64).map(|d| last.open_time + Duration::days(d)).collect(),
        None => Vec::new(),
    }
}

/// History, dashed ensemble prediction and the confidence band
pub fn price_forecast(history: &PriceHistory, forecast: &Forecast) -> Figure {
    let x_hist = date_axis(&history.timestamps());
    let future = date_axis(&future_dates(history, forecast.len()));

    let mut band_x = future.clone();
    band_x.extend(future.iter().rev().cloned());
    let mut band_y = forecast.confidence_upper.clone();
    band_y.extend(forecast.confidence_lower.iter().rev());

    let band = Trace {
        fill: Some("toself".to_string()),
        fillcolor: Some(BAND_FILL.to_string()),
        hoverinfo: Some("skip".to_string()),
        ..Trace::scatter("Intervalo Confianza", band_x, band_y, Line::solid("rgba(255, 255, 255, 0)"))
    };

    Figure {
        data: vec![
            Trace::scatter("Histórico", x_hist, history.closes(), Line::solid(HISTORY_COLOR).width(2)),
            Trace::scatter("Predicción", future, forecast.ensemble.clone(), Line::solid(PREDICTION_COLOR).width(2).dashed()),
            band,
        ],
        layout: Layout::new("Predicción de Precio Solana", "Fecha", "Precio (USD)").unified_hover(),
    }
}

/// Historical volume bars followed by predicted bars
pub fn volume_forecast(history: &PriceHistory, predicted: &[f64]) -> Figure {
    let hist = Trace { opacity: Some(0.7), ..Trace::bar("Volumen Histórico", date_axis(&history.timestamps()), history.volumes(), HISTORY_COLOR) };
    let future = date_axis(&future_dates(history, predicted.len()));
    Figure {
        data: vec![hist, Trace::bar("Volumen Predicho", future, predicted.to_vec(), PREDICTION_COLOR)],
        layout: Layout::new("Predicción de Volumen", "Fecha", "Volumen").unified_hover(),
    }
}

/// Close price plus one line per indicator
pub fn technical_indicators(history: &PriceHistory, indicators: &[(&str, Vec<f64>)]) -> Figure {
    let x = date_axis(&history.timestamps());
    let mut data = vec![Trace::scatter("Precio", x.clone(), history.closes(), Line::solid(HISTORY_COLOR))];
    for (i, (name, values)) in indicators.iter().enumerate() {
        let color = INDICATOR_COLORS[i % INDICATOR_COLORS.len()];
        data.push(Trace::scatter(name, x.clone(), values.clone(), Line::solid(color)));
    }
    Figure { data, layout: Layout::new("Indicadores Técnicos", "Fecha", "Valor") }
}

/// Each model's prediction by forecast day
pub fn model_comparison(forecast: &Forecast) -> Figure {
    let days: Vec<Value> = (1..=forecast.len()).map(Value::from).collect();
    Figure {
        data: vec![
            Trace::scatter("Random Forest", days.clone(), forecast.rf.clone(), Line::solid(HISTORY_COLOR)),
            Trace::scatter("LSTM", days.clone(), forecast.lstm.clone(), Line::solid(PREDICTION_COLOR)),
            Trace::scatter("Ensemble", days, forecast.ensemble.clone(), Line::solid("#4ecdc4").width(3).dashed()),
        ],
        layout: Layout::new("Comparación de Modelos", "Día", "Precio (USD)"),
    }
}

/// Plain historical view of one metric
pub fn history_chart(history: &PriceHistory, metric: Metric, visualization: Visualization) -> Figure {
    let x = date_axis(&history.timestamps());
    if metric == Metric::Volume {
        return Figure {
            data: vec![Trace::bar("Volumen", x, history.volumes(), HISTORY_COLOR)],
            layout: Layout::new("Volumen Histórico", "Fecha", "Volumen").unified_hover(),
        };
    }

    let trace = match visualization {
        Visualization::Candlestick => Trace {
            open: history.opens(),
            high: history.highs(),
            low: history.lows(),
            close: history.closes(),
            ..Trace::new("candlestick", "Precio", x, Vec::new())
        },
        Visualization::Bar => Trace::bar("Precio", x, history.closes(), HISTORY_COLOR),
        Visualization::Line => Trace::scatter("Precio", x, history.closes(), Line::solid(HISTORY_COLOR).width(2)),
    };
    Figure { data: vec![trace], layout: Layout::new("Precio Histórico Solana", "Fecha", "Precio (USD)").unified_hover() }
}
