//! Intent recognition
//!
//! The recognizer is an injected capability: constructed once at startup and
//! shared by reference. When LUIS is not configured the unconfigured
//! recognizer is used and choice prompts fall back to plain text matching.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Classifier output for one utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizerResult {
    pub text: String,
    pub top_intent: Option<String>,
    pub score: f64,
    #[serde(default)]
    pub entities: Value,
}

impl RecognizerResult {
    /// The top intent, if it clears `threshold`
    pub fn intent_above(&self, threshold: f64) -> Option<&str> {
        self.top_intent
            .as_deref()
            .filter(|_| self.score >= threshold)
    }
}

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("Recognizer request failed: {0}")]
    Request(String),
    #[error("Recognizer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse recognizer response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait IntentRecognizer: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn recognize(&self, text: &str) -> Result<RecognizerResult, RecognizerError>;
}

/// Used when no LUIS application is configured
pub struct UnconfiguredRecognizer;

#[async_trait]
impl IntentRecognizer for UnconfiguredRecognizer {
    fn is_configured(&self) -> bool {
        false
    }

    async fn recognize(&self, text: &str) -> Result<RecognizerResult, RecognizerError> {
        Ok(RecognizerResult {
            text: text.to_string(),
            top_intent: None,
            score: 0.0,
            entities: Value::Null,
        })
    }
}

/// LUIS application settings; all three are required
#[derive(Debug, Clone)]
pub struct LuisSettings {
    pub app_id: String,
    pub api_key: String,
    pub host_name: String,
}

impl LuisSettings {
    pub fn from_parts(
        app_id: Option<String>,
        api_key: Option<String>,
        host_name: Option<String>,
    ) -> Option<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Some(Self {
            app_id: non_empty(app_id)?,
            api_key: non_empty(api_key)?,
            host_name: non_empty(host_name)?,
        })
    }

    fn endpoint(&self) -> String {
        let host = self
            .host_name
            .trim_start_matches("https://")
            .trim_end_matches('/');
        format!(
            "https://{host}/luis/prediction/v3.0/apps/{}/slots/production/predict",
            self.app_id
        )
    }
}

/// LUIS v3 prediction endpoint client
pub struct LuisRecognizer {
    client: Client,
    settings: LuisSettings,
}

impl LuisRecognizer {
    pub fn new(settings: LuisSettings) -> Result<Self, RecognizerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RecognizerError::Request(e.to_string()))?;
        Ok(Self { client, settings })
    }
}

#[derive(Debug, Deserialize)]
struct LuisResponse {
    #[serde(default)]
    query: String,
    prediction: LuisPrediction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LuisPrediction {
    top_intent: Option<String>,
    #[serde(default)]
    intents: HashMap<String, LuisIntent>,
    #[serde(default)]
    entities: Value,
}

#[derive(Debug, Deserialize)]
struct LuisIntent {
    #[serde(default)]
    score: f64,
}

impl LuisResponse {
    fn into_result(self, text: &str) -> RecognizerResult {
        let prediction = self.prediction;
        let score = prediction
            .top_intent
            .as_ref()
            .and_then(|name| prediction.intents.get(name))
            .map_or(0.0, |i| i.score);
        RecognizerResult {
            text: if self.query.is_empty() {
                text.to_string()
            } else {
                self.query
            },
            top_intent: prediction.top_intent.filter(|name| name != "None"),
            score,
            entities: prediction.entities,
        }
    }
}

#[async_trait]
impl IntentRecognizer for LuisRecognizer {
    fn is_configured(&self) -> bool {
        true
    }

    async fn recognize(&self, text: &str) -> Result<RecognizerResult, RecognizerError> {
        let response = self
            .client
            .get(self.settings.endpoint())
            .query(&[
                ("subscription-key", self.settings.api_key.as_str()),
                ("query", text),
            ])
            .send()
            .await
            .map_err(|e| RecognizerError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecognizerError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(RecognizerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: LuisResponse =
            serde_json::from_str(&body).map_err(|e| RecognizerError::Parse(e.to_string()))?;
        Ok(parsed.into_result(text))
    }
}

/// Build the recognizer for the process: LUIS when fully configured
pub fn from_settings(settings: Option<LuisSettings>) -> Arc<dyn IntentRecognizer> {
    match settings {
        Some(settings) => match LuisRecognizer::new(settings) {
            Ok(luis) => {
                tracing::info!("LUIS recognizer configured");
                Arc::new(luis)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build LUIS client, recognition disabled");
                Arc::new(UnconfiguredRecognizer)
            }
        },
        None => {
            tracing::info!("LUIS not configured, recognition disabled");
            Arc::new(UnconfiguredRecognizer)
        }
    }
}
