//! HTTP front ends.
//!
//! - [`dashboard`]: the analysis pipeline behind `POST /analyze`
//! - [`query_api`]: free-text queries returning chart records (`/api/predict`)
//! - [`functions`]: stateless handlers for single-row predictions and feedback

pub mod dashboard;
pub mod error;
pub mod functions;
pub mod query_api;

use std::net::SocketAddr;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;

/// Any origin, method and header
pub fn cors() -> CorsLayer {
    CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
}

/// Bind `addr` and serve `app` with request tracing until the process stops
pub async fn serve(app: Router, addr: SocketAddr, name: &str) -> std::io::Result<()> {
    let app = app.layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("{} listening on http://{}", name, addr);
    axum::serve(listener, app).await
}
