//! Error types for enrichment, delivery and the alert pipeline.

use thiserror::Error;

/// A failed enrichment lookup. Always recoverable: the alert is sent with
/// placeholder values.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no data for {0}")]
    Missing(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer from the messaging API.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("alert delivery failed: {0}")]
    Notify(#[from] NotifyError),
}
