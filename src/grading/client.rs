//! HTTP grading oracle client

use super::{FeedbackPayload, GradeScale, GradingError, GradingOracle, SubmissionRequest};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Posts submissions to `{base_url}/api/submit-writing`
pub struct HttpGradingOracle {
    client: Client,
    endpoint: String,
    scale: GradeScale,
}

impl HttpGradingOracle {
    pub fn new(base_url: &str, timeout: Duration, scale: GradeScale) -> Result<Self, GradingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GradingError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/submit-writing", base_url.trim_end_matches('/')),
            scale,
        })
    }

    #[cfg(test)]
    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GradingOracle for HttpGradingOracle {
    async fn grade(&self, request: &SubmissionRequest) -> Result<FeedbackPayload, GradingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GradingError::timeout(format!("Request timeout: {e}"))
                } else {
                    GradingError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GradingError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(GradingError::from_status(status.as_u16(), &body));
        }

        let payload: FeedbackPayload = serde_json::from_str(&body).map_err(|e| {
            GradingError::invalid_response(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Ok(payload.normalized(self.scale))
    }

    fn name(&self) -> &str {
        "http"
    }
}
