//! API request and response types

use crate::writing::{Navigation, WritingSection};
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Response with a list of conversations
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<serde_json::Value>,
}

/// Response with a single conversation
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: serde_json::Value,
}

/// Response with conversation and transcript
#[derive(Debug, Serialize)]
pub struct ConversationWithActivitiesResponse {
    pub conversation: serde_json::Value,
    pub activities: Vec<serde_json::Value>,
}

/// Request to start a writing session; both fields default to Task 1, question 1
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub question_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SelectSectionRequest {
    pub section: WritingSection,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub direction: Navigation,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub section: WritingSection,
    pub text: String,
}

/// Submit `text`, or the saved draft when absent
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub section: WritingSection,
    #[serde(default)]
    pub text: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
