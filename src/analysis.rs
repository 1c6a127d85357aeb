//! Dashboard pipeline: command → data range → indicators or forecast → cards and figures.

use serde::Serialize;
use tracing::{debug, warn};

use crate::chart::{self, Figure};
use crate::common::{last_valid, max, mean, min};
use crate::data::PriceHistory;
use crate::error::{Error, Result};
use crate::model::ForecastEngine;
use crate::momentum::macd_default;
use crate::moving_averages::sma;
use crate::nlp::{parse_command, Metric, ParsedCommand, Period, RequestKind, MIN_CONFIDENCE};
use crate::oscillators::{rsi, RsiZone};
use crate::volatility::{annualized_volatility, RiskLevel};

/// Rows used as the base of a forecast when the command names no year
pub const PREDICTION_BASE_ROWS: usize = 100;

/// Longest horizon a dashboard forecast will produce
pub const MAX_FORECAST_DAYS: usize = 365;

const RSI_PERIOD: usize = 14;
const VOLATILITY_PERIOD: usize = 20;
const VOLUME_FORECAST_WINDOW: usize = 20;

const SUGGESTIONS: [&str; 3] = ["- 'Precio próximos 14 días'", "- 'Volumen en 2024'", "- 'RSI histórico'"];

/// Headline number, optionally with a change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
}

impl Card {
    fn new(label: &str, value: String) -> Self {
        Self { label: label.to_string(), value, delta: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub figure: Figure,
}

/// Everything the dashboard renders for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub query: String,
    pub understood: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<ParsedCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_label: Option<String>,
    pub cards: Vec<Card>,
    pub sections: Vec<Section>,
    pub messages: Vec<Message>,
}

impl Analysis {
    fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            understood: false,
            command: None,
            heading: None,
            period_label: None,
            cards: Vec::new(),
            sections: Vec::new(),
            messages: Vec::new(),
        }
    }

    fn message(&mut self, level: Level, text: impl Into<String>) {
        self.messages.push(Message { level, text: text.into() });
    }

    fn section(&mut self, title: &str, figure: Figure) {
        self.sections.push(Section { title: title.to_string(), figure });
    }
}

/// Answers dashboard queries against one loaded price history
pub struct Analyzer {
    history: PriceHistory,
    engine: std::result::Result<ForecastEngine, String>,
    default_forecast_days: usize,
}

impl Analyzer {
    /// `engine` carries the load error when no predictor is available;
    /// prediction queries then report it while other queries still work.
    pub fn new(history: PriceHistory, engine: Result<ForecastEngine>, default_forecast_days: usize) -> Self {
        let engine = engine.map_err(|e| {
            warn!(error = %e, "prediction engine unavailable");
            e.to_string()
        });
        Self { history, engine, default_forecast_days }
    }

    pub fn history(&self) -> &PriceHistory {
        &self.history
    }

    pub fn engine(&self) -> Option<&ForecastEngine> {
        self.engine.as_ref().ok()
    }

    /// Never fails: processing errors become an error message in the result
    pub fn analyze(&self, input: &str) -> Analysis {
        let mut analysis = Analysis::new(input);
        let parsed = parse_command(input);

        if parsed.confidence < MIN_CONFIDENCE {
            analysis.message(Level::Error, "No entendí tu pregunta. Intenta con:");
            for s in SUGGESTIONS {
                analysis.message(Level::Info, s);
            }
            return analysis;
        }

        analysis.understood = true;
        analysis.message(
            Level::Info,
            format!("Buscando: {} | Período: {}", parsed.metric.as_str().to_uppercase(), parsed.period.label()),
        );
        debug!(?parsed, "command parsed");

        if let Err(e) = self.run(&parsed, &mut analysis) {
            warn!(error = %e, query = input, "analysis failed");
            analysis.message(Level::Error, format!("Error: {}", e));
            analysis.message(Level::Info, "Por favor, intenta de nuevo con una pregunta clara.");
        }
        analysis.command = Some(parsed);
        analysis
    }

    fn run(&self, parsed: &ParsedCommand, analysis: &mut Analysis) -> Result<()> {
        let (range, label) = self.select_range(parsed);
        analysis.period_label = Some(label);
        if range.is_empty() {
            return Err(Error::EmptyData(format!("sin datos para {}", parsed.period.label())));
        }

        match parsed.kind {
            RequestKind::Prediction => self.prediction(parsed, &range, analysis),
            RequestKind::Indicator => {
                indicator(parsed.metric, &range, analysis);
                Ok(())
            }
            RequestKind::Historical => {
                historical(parsed, &range, analysis);
                Ok(())
            }
        }
    }

    fn select_range(&self, parsed: &ParsedCommand) -> (PriceHistory, String) {
        match parsed.period {
            Period::Year { year } => (self.history.year(year), format!("Año {}", year)),
            Period::Days(days) if parsed.kind == RequestKind::Prediction => {
                let base = self.history.last(PREDICTION_BASE_ROWS);
                let label = format!("Próximos {} días (desde base de {} días)", days, base.len());
                (base, label)
            }
            Period::Days(days) => (self.history.last(days as usize), format!("Últimos {} días", days)),
        }
    }

    fn prediction(&self, parsed: &ParsedCommand, range: &PriceHistory, analysis: &mut Analysis) -> Result<()> {
        analysis.heading = Some("Predicción".to_string());
        let engine = self.engine.as_ref().map_err(|e| Error::EngineUnavailable(e.clone()))?;

        let requested = parsed.forecast_days.map_or(self.default_forecast_days, |d| d as usize);
        let days = requested.clamp(1, MAX_FORECAST_DAYS);
        if days < requested {
            analysis.message(
                Level::Warning,
                format!("Horizonte limitado a {} días (pedidos: {}).", MAX_FORECAST_DAYS, requested),
            );
        }
        let forecast = engine.forecast(range, days)?;
        let Some(&first) = forecast.ensemble.first() else {
            return Err(Error::EmptyData("la predicción no devolvió valores".to_string()));
        };
        let current = range.last_candle().map(|c| c.close).unwrap_or(f64::NAN);
        let horizon = forecast.ensemble[14usize.min(forecast.len() - 1)];

        analysis.cards.push(Card {
            delta: Some(format!("{:+.2}", first - current)),
            ..Card::new("Precio Actual", format!("${:.2}", current))
        });
        analysis.cards.push(Card::new("Predicción (Día +14)", format!("${:.2}", horizon)));
        analysis.cards.push(Card::new("Confianza del Modelo", format!("{:.0}%", parsed.confidence * 100.0)));

        match parsed.metric {
            Metric::Price => {
                analysis.section("Predicción de Precio", chart::price_forecast(range, &forecast));
                analysis.section("Comparación de Modelos", chart::model_comparison(&forecast));
            }
            Metric::Volume => {
                let volumes = volume_outlook(range, forecast.len());
                analysis.section("Predicción de Volumen", chart::volume_forecast(range, &volumes));
            }
            other => analysis.message(
                Level::Info,
                format!("La predicción de {} no tiene gráfica; prueba con precio o volumen.", other.as_str()),
            ),
        }
        Ok(())
    }
}

/// Flat volume outlook: the mean of the recent volumes
fn volume_outlook(range: &PriceHistory, days: usize) -> Vec<f64> {
    let recent = range.last(VOLUME_FORECAST_WINDOW).volumes();
    vec![mean(&recent); days]
}

fn indicator(metric: Metric, range: &PriceHistory, analysis: &mut Analysis) {
    analysis.heading = Some("Análisis Técnico".to_string());
    let closes = range.closes();

    match metric {
        Metric::Rsi => {
            let values = rsi(&closes, RSI_PERIOD);
            let current = values.last().copied().unwrap_or(f64::NAN);
            analysis.section("RSI", chart::technical_indicators(range, &[("RSI", values)]));
            if current.is_nan() {
                analysis.message(
                    Level::Info,
                    format!("Datos insuficientes para el RSI: se necesitan más de {} registros.", RSI_PERIOD),
                );
            } else {
                let zone = RsiZone::classify(current);
                let (level, icon) = match zone {
                    RsiZone::Overbought => (Level::Warning, "🔴"),
                    RsiZone::Oversold => (Level::Success, "🟢"),
                    RsiZone::Neutral => (Level::Info, "⚪"),
                };
                analysis.message(level, format!("{} RSI en {:.1}: {}", icon, current, zone.label()));
            }
        }
        Metric::Sma => {
            let series = [("SMA20", sma(&closes, 20)), ("SMA50", sma(&closes, 50)), ("SMA200", sma(&closes, 200))];
            analysis.section("Medias Móviles", chart::technical_indicators(range, &series));
        }
        Metric::Macd => {
            let m = macd_default(&closes);
            let series = [("MACD", m.macd), ("Signal", m.signal)];
            analysis.section("MACD", chart::technical_indicators(range, &series));
        }
        Metric::Volatility => {
            let vol = annualized_volatility(&closes, VOLATILITY_PERIOD);
            if vol.is_nan() {
                analysis.message(Level::Info, "Datos insuficientes para calcular la volatilidad.");
            } else {
                analysis.cards.push(Card::new("Volatilidad Histórica Anualizada", format!("{:.2}%", vol * 100.0)));
                analysis.message(Level::Info, format!("Riesgo: {}", RiskLevel::classify(vol).label()));
            }
        }
        Metric::Price | Metric::Volume => {
            analysis.message(Level::Info, "Indicadores disponibles: RSI, SMA, MACD y volatilidad.");
        }
    }
}

fn historical(parsed: &ParsedCommand, range: &PriceHistory, analysis: &mut Analysis) {
    analysis.heading = Some("Análisis Histórico".to_string());
    let closes = range.closes();
    let first = closes.first().copied().unwrap_or(f64::NAN);
    let last = last_valid(&closes).unwrap_or(f64::NAN);
    let change = (last - first) / first * 100.0;

    analysis.cards.push(Card::new("Precio Mínimo", format!("${:.2}", min(&closes))));
    analysis.cards.push(Card::new("Precio Máximo", format!("${:.2}", max(&closes))));
    analysis.cards.push(Card::new("Precio Promedio", format!("${:.2}", mean(&closes))));
    analysis.cards.push(Card::new("Cambio %", format!("{:.2}%", change)));

    match parsed.metric {
        Metric::Price => analysis.section(
            "Precio Histórico",
            chart::history_chart(range, Metric::Price, parsed.visualization),
        ),
        Metric::Volume => analysis.section(
            "Volumen Histórico",
            chart::history_chart(range, Metric::Volume, parsed.visualization),
        ),
        _ => {}
    }
}
