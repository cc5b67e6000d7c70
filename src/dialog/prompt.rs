//! Prompt specifications and recognition of raw replies

use super::Activity;
use crate::recognizer::RecognizerResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::LazyLock;

/// Minimum recognizer confidence for an intent to stand in for a choice
const MIN_INTENT_SCORE: f64 = 0.5;

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").expect("integer pattern is valid"));

/// One selectable option of a choice prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    /// Recognizer intent that also selects this option
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            intent: None,
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }
}

/// Expected shape of the reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptKind {
    Text,
    Choice { options: Vec<ChoiceOption> },
    Confirm,
    Number,
}

/// A question the bot is waiting on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
    pub kind: PromptKind,
    pub activity: Activity,
    /// Sent instead of the prompt itself when a reply is not recognized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<String>,
}

/// A reply that satisfied the pending prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Text(String),
    Choice { index: usize, value: String },
    Confirm(bool),
    Number(i64),
}

impl Answer {
    pub fn to_value(&self) -> Value {
        match self {
            Answer::Text(text) => Value::String(text.clone()),
            Answer::Choice { index, value } => json!({ "index": index, "value": value }),
            Answer::Confirm(b) => Value::Bool(*b),
            Answer::Number(n) => Value::from(*n),
        }
    }
}

impl PromptSpec {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            kind: PromptKind::Text,
            activity: Activity::text(prompt),
            retry: None,
        }
    }

    pub fn choice<S: AsRef<str>>(prompt: impl Into<String>, options: &[S]) -> Self {
        Self::choice_with(
            prompt,
            options.iter().map(|o| ChoiceOption::new(o.as_ref())).collect(),
        )
    }

    pub fn choice_with(prompt: impl Into<String>, options: Vec<ChoiceOption>) -> Self {
        Self {
            kind: PromptKind::Choice { options },
            activity: Activity::text(prompt),
            retry: None,
        }
    }

    pub fn confirm(prompt: impl Into<String>) -> Self {
        Self {
            kind: PromptKind::Confirm,
            activity: Activity::text(prompt),
            retry: Some("Please answer yes or no.".to_string()),
        }
    }

    pub fn number(prompt: impl Into<String>) -> Self {
        Self {
            kind: PromptKind::Number,
            activity: Activity::text(prompt),
            retry: Some("Please enter a number.".to_string()),
        }
    }

    pub fn with_retry(mut self, retry: impl Into<String>) -> Self {
        self.retry = Some(retry.into());
        self
    }

    /// Replace the outbound activity (e.g. a card, or text plus a channel signal)
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activity = activity;
        self
    }

    /// What to send when a reply is not recognized
    pub fn retry_activity(&self) -> Activity {
        match &self.retry {
            Some(text) => Activity::text(text.clone()),
            None => self.activity.clone(),
        }
    }

    /// Recognize a raw reply against the expected shape
    pub fn recognize(&self, text: &str, intent: Option<&RecognizerResult>) -> Option<Answer> {
        let trimmed = text.trim();
        match &self.kind {
            PromptKind::Text => (!trimmed.is_empty()).then(|| Answer::Text(trimmed.to_string())),
            PromptKind::Number => parse_number(trimmed).map(Answer::Number),
            PromptKind::Confirm => parse_confirm(trimmed).map(Answer::Confirm),
            PromptKind::Choice { options } => match_choice(options, trimmed)
                .or_else(|| intent.and_then(|i| match_intent(options, i)))
                .map(|index| Answer::Choice {
                    index,
                    value: options[index].value.clone(),
                }),
        }
    }
}

fn parse_number(text: &str) -> Option<i64> {
    INTEGER.find(text).and_then(|m| m.as_str().parse().ok())
}

fn parse_confirm(text: &str) -> Option<bool> {
    let word = text
        .trim_end_matches(['.', '!', '?'])
        .trim()
        .to_lowercase();
    match word.as_str() {
        "yes" | "y" | "yeah" | "yep" | "sure" | "ok" | "okay" | "true" => Some(true),
        "no" | "n" | "nope" | "nah" | "false" => Some(false),
        _ => None,
    }
}

/// Exact value, then 1-based index, then the one option mentioned in the text
fn match_choice(options: &[ChoiceOption], text: &str) -> Option<usize> {
    if text.is_empty() {
        return None;
    }
    if let Some(index) = options
        .iter()
        .position(|o| o.value.eq_ignore_ascii_case(text))
    {
        return Some(index);
    }
    if let Ok(n) = text.parse::<usize>() {
        return (1..=options.len()).contains(&n).then(|| n - 1);
    }
    let lowered = text.to_lowercase();
    let mut mentioned = options
        .iter()
        .enumerate()
        .filter(|(_, o)| lowered.contains(&o.value.to_lowercase()));
    match (mentioned.next(), mentioned.next()) {
        (Some((index, _)), None) => Some(index),
        _ => None,
    }
}

fn match_intent(options: &[ChoiceOption], result: &RecognizerResult) -> Option<usize> {
    let intent = result.intent_above(MIN_INTENT_SCORE)?;
    options.iter().position(|o| {
        o.intent
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(intent))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> PromptSpec {
        PromptSpec::choice_with(
            "Pick one",
            vec![
                ChoiceOption::new("Grammar Correction").with_intent("GrammarCorrection"),
                ChoiceOption::new("Writing Tips").with_intent("WritingTips"),
                ChoiceOption::new("Writing Exercise").with_intent("WritingExercise"),
            ],
        )
    }

    fn intent(name: &str, score: f64) -> RecognizerResult {
        RecognizerResult {
            text: String::new(),
            top_intent: Some(name.to_string()),
            score,
            entities: Value::Null,
        }
    }

    #[test]
    fn test_choice_by_value_index_and_mention() {
        let prompt = menu();
        assert_eq!(
            prompt.recognize("writing tips", None),
            Some(Answer::Choice {
                index: 1,
                value: "Writing Tips".to_string()
            })
        );
        assert_eq!(
            prompt.recognize("3", None),
            Some(Answer::Choice {
                index: 2,
                value: "Writing Exercise".to_string()
            })
        );
        assert_eq!(
            prompt.recognize("I'd like grammar correction please", None),
            Some(Answer::Choice {
                index: 0,
                value: "Grammar Correction".to_string()
            })
        );
    }

    #[test]
    fn test_choice_rejects_unknown_and_out_of_range() {
        let prompt = menu();
        assert_eq!(prompt.recognize("dance", None), None);
        assert_eq!(prompt.recognize("0", None), None);
        assert_eq!(prompt.recognize("4", None), None);
        assert_eq!(prompt.recognize("   ", None), None);
    }

    #[test]
    fn test_choice_falls_back_to_confident_intent() {
        let prompt = menu();
        let confident = intent("WritingExercise", 0.92);
        let unsure = intent("WritingExercise", 0.2);

        assert!(matches!(
            prompt.recognize("let me practise an essay", Some(&confident)),
            Some(Answer::Choice { index: 2, .. })
        ));
        assert_eq!(prompt.recognize("let me practise an essay", Some(&unsure)), None);
    }

    #[test]
    fn test_confirm() {
        let prompt = PromptSpec::confirm("Again?");
        assert_eq!(prompt.recognize("Yes!", None), Some(Answer::Confirm(true)));
        assert_eq!(prompt.recognize(" nope ", None), Some(Answer::Confirm(false)));
        assert_eq!(prompt.recognize("maybe", None), None);
    }

    #[test]
    fn test_number() {
        let prompt = PromptSpec::number("Age?");
        assert_eq!(prompt.recognize("I am 27", None), Some(Answer::Number(27)));
        assert_eq!(prompt.recognize("-3", None), Some(Answer::Number(-3)));
        assert_eq!(prompt.recognize("twenty", None), None);
    }

    #[test]
    fn test_text_requires_content() {
        let prompt = PromptSpec::text("Say something!");
        assert_eq!(
            prompt.recognize("  hello ", None),
            Some(Answer::Text("hello".to_string()))
        );
        assert_eq!(prompt.recognize("", None), None);
    }

    #[test]
    fn test_retry_activity_falls_back_to_prompt() {
        let text = PromptSpec::text("Your name?");
        assert_eq!(text.retry_activity(), Activity::text("Your name?"));

        let number = PromptSpec::number("Age?").with_retry("Digits, please.");
        assert_eq!(number.retry_activity(), Activity::text("Digits, please."));
    }
}
