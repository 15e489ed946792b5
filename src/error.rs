//! Error types for the guardian engine.

use crate::retry::FailureKind;

/// Top-level error type for the safety-analysis pipeline.
#[derive(Debug, thiserror::Error)]
pub enum GuardianError {
    /// Remote reasoning call exceeded its hard deadline.
    #[error("analysis timed out: {0}")]
    Timeout(String),

    /// Quota exhausted at the reasoning service (429). Never retried.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Transient 503-class outage at the reasoning service.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Model output failed schema or range validation.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Camera, microphone or geolocation denied or absent. Absorbed at the
    /// point of collection; never aborts an analysis.
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// Transport-level request failure.
    #[error("request error: {0}")]
    Request(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuardianError {
    /// Classify this failure for the gateway retry policy.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Timeout(_) => FailureKind::Timeout,
            Self::RateLimited(_) => FailureKind::RateLimited,
            Self::ServiceUnavailable(_) => FailureKind::Unavailable,
            _ => FailureKind::Other,
        }
    }

    /// Returns true if the gateway may retry after this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) => false,
            Self::Timeout(_) | Self::ServiceUnavailable(_) | Self::Request(_) => true,
            // Validation, sensor, config and I/O failures need a fix, not a retry.
            Self::MalformedResponse(_)
            | Self::SensorUnavailable(_)
            | Self::Config(_)
            | Self::Io(_) => false,
        }
    }

    /// Human-readable message shown in the transcript and spoken aloud when
    /// an analysis attempt fails.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => "Rate limit reached. Please wait a moment and try again.",
            Self::Timeout(_) => "The analysis request timed out. Please try again.",
            Self::MalformedResponse(_) => "AI response formatting error. Please retry.",
            _ => "AI analysis temporarily unavailable. Please try again.",
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, GuardianError>;
