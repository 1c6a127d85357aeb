//! Keyword based understanding of user text.
//!
//! - [`command`]: dashboard commands (metric, request kind, period)
//! - [`query`]: API queries (metrics, indicators, date range)
//! - [`explain`]: narrative for API answers

pub mod command;
pub mod explain;
pub mod query;

pub use command::{parse_command, Metric, ParsedCommand, Period, RequestKind, Visualization, MIN_CONFIDENCE};
pub use explain::generate_explanation;
pub use query::{
    compute_query_indicators, extract_parameters, preprocess, wants_prediction, ChartType, QueryFrame,
    QueryIndicator, QueryMetric, QueryParams, TimeRange,
};
