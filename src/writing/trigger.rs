//! Detecting when the chat surface should hand over to the writing editor

use super::WritingSection;
use crate::dialog::{Activity, ChannelSignal};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Phrase the bot's section prompt always contains
pub const TRIGGER_PHRASE: &str = "please write your";

static BOT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*bot said:\s*").expect("prefix pattern is valid"));

/// How the client should switch into writing mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WritingTrigger {
    /// Section to open, when the bot named one
    pub section: Option<WritingSection>,
    pub prompt: String,
    /// Whether the trigger came from the structured signal rather than the phrase
    pub structured: bool,
}

/// Phrase detection on a transcript line such as `"Bot said: Please write your introduction:"`
pub fn detect_trigger(text: &str) -> Option<WritingTrigger> {
    let message = BOT_PREFIX.replace(text, "").trim().to_lowercase();
    let start = message.find(TRIGGER_PHRASE)?;
    let rest = message.get(start + TRIGGER_PHRASE.len()..).unwrap_or_default();
    let section = rest
        .split(|c: char| !c.is_alphabetic())
        .find(|word| !word.is_empty())
        .and_then(|word| word.parse().ok());

    Some(WritingTrigger {
        section,
        prompt: text.trim().to_string(),
        structured: false,
    })
}

/// Structured `enterWritingMode` signal first, phrase fallback second
pub fn route(activity: &Activity) -> Option<WritingTrigger> {
    if let Some(ChannelSignal::EnterWritingMode { section, prompt }) = &activity.channel_data {
        return Some(WritingTrigger {
            section: Some(*section),
            prompt: prompt.clone(),
            structured: true,
        });
    }
    activity.text.as_deref().and_then(detect_trigger)
}

/// The last trigger among the activities of one turn
pub fn route_turn<'a>(activities: impl IntoIterator<Item = &'a Activity>) -> Option<WritingTrigger> {
    activities.into_iter().filter_map(route).last()
}
