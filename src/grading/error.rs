//! Grading error types

use thiserror::Error;

/// Grading error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GradingError {
    pub kind: GradingErrorKind,
    pub message: String,
    /// HTTP status, when the oracle answered at all
    pub status: Option<u16>,
}

impl GradingError {
    pub fn new(kind: GradingErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GradingErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GradingErrorKind::Timeout, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(GradingErrorKind::ServerError, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GradingErrorKind::Rejected, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GradingErrorKind::InvalidResponse, message)
    }

    /// Classify a non-2xx answer
    pub fn from_status(status: u16, body: &str) -> Self {
        let err = match status {
            408 | 504 => Self::timeout(format!("Oracle timed out: {body}")),
            500..=599 => Self::server_error(format!("Server error: {body}")),
            _ => Self::rejected(format!("HTTP {status}: {body}")),
        };
        err.with_status(status)
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingErrorKind {
    /// Oracle unreachable - retryable
    Network,
    /// No answer in time - retryable
    Timeout,
    /// Oracle failed (5xx) - retryable
    ServerError,
    /// Oracle refused the submission (4xx) - not retryable
    Rejected,
    /// 2xx with a body we cannot use - not retryable
    InvalidResponse,
}

impl GradingErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::ServerError)
    }
}
