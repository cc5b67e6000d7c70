//! Events that can occur in a conversation

use crate::recognizer::RecognizerResult;
use serde_json::Value;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// Push a dialog and run it until it suspends
    Begin { dialog: String, options: Value },
    /// A user message, answering the pending prompt of the innermost frame
    UserMessage {
        activity_id: String,
        text: String,
        /// Recognizer output for `text`, when a recognizer is configured
        intent: Option<RecognizerResult>,
    },
}

impl TurnEvent {
    pub fn begin(dialog: impl Into<String>, options: Value) -> Self {
        TurnEvent::Begin {
            dialog: dialog.into(),
            options,
        }
    }

    #[cfg(test)]
    pub fn user_message(activity_id: impl Into<String>, text: impl Into<String>) -> Self {
        TurnEvent::UserMessage {
            activity_id: activity_id.into(),
            text: text.into(),
            intent: None,
        }
    }
}
