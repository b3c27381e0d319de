//! API request and response types.

use serde::Serialize;

pub use crate::page::RunForm as RunRequest;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Whether API keys are configured server-side (page key fields optional)
    pub credentials_configured: bool,

    /// Whether a run is currently in flight
    pub running: bool,
}

/// Error body for non-streaming failures.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
