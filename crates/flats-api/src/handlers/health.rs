//! Liveness probe.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Name reported by the health endpoint.
pub const APPLICATION_NAME: &str = "Flats Management System";

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `UP` while the process serves requests.
    pub status: &'static str,
    /// Time of the probe.
    pub timestamp: DateTime<Utc>,
    /// Application name.
    pub application: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP",
        timestamp: Utc::now(),
        application: APPLICATION_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}
