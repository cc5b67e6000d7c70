//! Grading oracle abstraction
//!
//! The oracle scores a submitted section and returns structured feedback.
//! It is a black box to the writing controller, reached only through
//! [`GradingOracle`].

mod client;
mod error;
mod types;

pub use client::HttpGradingOracle;
pub use error::{GradingError, GradingErrorKind};
pub use types::{
    Criterion, CriterionAnalysis, CriterionFeedback, FeedbackPayload, GradeScale,
    StructuredFeedback, SubmissionRequest,
};

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for grading backends
#[async_trait]
pub trait GradingOracle: Send + Sync {
    /// Score one section. Returned grades are on the 0-100 scale.
    async fn grade(&self, request: &SubmissionRequest) -> Result<FeedbackPayload, GradingError>;

    /// Identifies the backend in logs
    fn name(&self) -> &str;
}

/// Logging wrapper for grading oracles
pub struct LoggingOracle {
    inner: Arc<dyn GradingOracle>,
    name: String,
}

impl LoggingOracle {
    pub fn new(inner: Arc<dyn GradingOracle>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }
}

#[async_trait]
impl GradingOracle for LoggingOracle {
    async fn grade(&self, request: &SubmissionRequest) -> Result<FeedbackPayload, GradingError> {
        let start = std::time::Instant::now();
        let result = self.inner.grade(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(payload) => {
                tracing::info!(
                    oracle = %self.name,
                    section = %request.section,
                    duration_ms = %duration.as_millis(),
                    grade = ?payload.grade,
                    "Grading request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    oracle = %self.name,
                    section = %request.section,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Grading request failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}
