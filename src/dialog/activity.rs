//! Outbound bot activities

use crate::writing::WritingSection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured control signal carried in an activity's channel data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChannelSignal {
    /// The client should leave the chat surface and open the writing editor
    EnterWritingMode {
        section: WritingSection,
        prompt: String,
    },
}

/// A message sent from the bot to the user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Opaque card payload (Adaptive Card JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<ChannelSignal>,
}

impl Activity {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn card(card: Value) -> Self {
        Self {
            attachment: Some(card),
            ..Self::default()
        }
    }

    pub fn with_signal(mut self, signal: ChannelSignal) -> Self {
        self.channel_data = Some(signal);
        self
    }

    /// Nothing user-visible and no signal: never delivered
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().is_none_or(str::is_empty)
            && self.attachment.is_none()
            && self.channel_data.is_none()
    }
}

impl From<&str> for Activity {
    fn from(text: &str) -> Self {
        Activity::text(text)
    }
}

impl From<String> for Activity {
    fn from(text: String) -> Self {
        Activity::text(text)
    }
}
