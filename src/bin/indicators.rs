//! CLI tool for computing indicators and running dashboard queries offline
//!
//! Usage:
//!   indicators rsi --period 14 < closes.json > rsi.json
//!   indicators ask "precio próximos 14 días" --data data/sol_1d_data_2025.csv

use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use sol_predictor::volatility::{CALENDAR_DAYS, TRADING_DAYS};
use sol_predictor::{
    annualized_volatility, bollinger_bands, ema, init_tracing, macd, rolling_volatility, rsi, rsi_rolling, sma,
    Analyzer, AppConfig, ForecastEngine, PriceHistory,
};

#[derive(Parser)]
#[command(name = "indicators")]
#[command(about = "Technical indicators over a JSON array read from stdin", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SeriesArgs {
    /// Lookback period
    #[arg(short, long, default_value_t = 14)]
    period: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Simple moving average
    Sma(SeriesArgs),
    /// Exponential moving average
    Ema(SeriesArgs),
    /// Wilder RSI
    Rsi(SeriesArgs),
    /// RSI from simple rolling means of gains and losses
    RsiRolling(SeriesArgs),
    /// MACD line, signal and histogram
    Macd {
        #[arg(long, default_value_t = 12)]
        fast: usize,
        #[arg(long, default_value_t = 26)]
        slow: usize,
        #[arg(long, default_value_t = 9)]
        signal: usize,
    },
    /// Annualized volatility of the last `period` returns (single number)
    Volatility(SeriesArgs),
    /// Rolling annualized volatility, 365 periods per year
    RollingVolatility(SeriesArgs),
    /// Bollinger bands
    Bollinger {
        #[arg(short, long, default_value_t = 20)]
        period: usize,
        #[arg(long, default_value_t = 2.0)]
        std_mult: f64,
    },
    /// Run a dashboard query against a CSV file and print the analysis
    Ask {
        /// Spanish command, e.g. "RSI histórico en 2024"
        query: String,
        /// OHLCV CSV (defaults to DATA_PATH)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

fn read_values() -> anyhow::Result<Vec<f64>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input).context("failed to read stdin")?;
    serde_json::from_str(&input).context("stdin must be a JSON array of numbers")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let output = serde_json::to_string(value)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

fn ask(query: &str, data: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(path) = data {
        config.data_path = path;
    }
    let history = PriceHistory::from_csv(&config.data_path)
        .with_context(|| format!("failed to load {}", config.data_path.display()))?;
    let analyzer = Analyzer::new(history, ForecastEngine::from_config(&config), config.default_forecast_days);
    let analysis = analyzer.analyze(query);

    let output = serde_json::to_string_pretty(&analysis)?;
    io::stdout().lock().write_all(output.as_bytes())?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // logs go to stderr so stdout stays valid JSON
    init_tracing("sol_predictor=warn");
    let cli = Cli::parse();

    match cli.command {
        Commands::Sma(args) => print_json(&sma(&read_values()?, args.period)),
        Commands::Ema(args) => print_json(&ema(&read_values()?, args.period)),
        Commands::Rsi(args) => print_json(&rsi(&read_values()?, args.period)),
        Commands::RsiRolling(args) => print_json(&rsi_rolling(&read_values()?, args.period)),
        Commands::Macd { fast, slow, signal } => print_json(&macd(&read_values()?, fast, slow, signal)),
        Commands::Volatility(args) => {
            let vol = annualized_volatility(&read_values()?, args.period);
            print_json(&serde_json::json!({ "volatility": vol, "periods_per_year": TRADING_DAYS }))
        }
        Commands::RollingVolatility(args) => {
            print_json(&rolling_volatility(&read_values()?, args.period, CALENDAR_DAYS))
        }
        Commands::Bollinger { period, std_mult } => print_json(&bollinger_bands(&read_values()?, period, std_mult)),
        Commands::Ask { query, data } => ask(&query, data),
    }
}
