// Error types and error handling module
// This file defines the errors raised by the Opsgenie adapter and the
// per-family failures reported by the snapshot collector

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("opsgenie responded with http {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    Url(String),
    #[error("request limiter closed")]
    LimiterClosed,
}

impl ExporterError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ExporterError::Transport(_) => true,
            ExporterError::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A unit of collection that ended early. Observations emitted before the
/// failure stay in the sink.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{family}: alert count query {query:?} failed: {source}")]
    Query {
        family: &'static str,
        query: String,
        source: ExporterError,
    },
    #[error("{family}: listing {resource} failed: {source}")]
    Enumeration {
        family: &'static str,
        resource: &'static str,
        source: ExporterError,
    },
}

impl CollectError {
    pub fn family(&self) -> &'static str {
        match self {
            CollectError::Query { family, .. } | CollectError::Enumeration { family, .. } => family,
        }
    }
}
