//! FILENAME: core/report-engine/src/error.rs

use thiserror::Error;

/// Errors raised while loading or validating report configuration.
/// The calculation pipeline itself never returns an error.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid report definition: {0}")]
    InvalidDefinition(String),
}
