//! Step contract for waterfall dialogs

use super::{Activity, Answer, PromptSpec, Values};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// The single signal a step is invoked with
#[derive(Debug, Clone, PartialEq)]
pub enum StepInput {
    /// First entry into a freshly pushed frame
    Start,
    /// The user's reply to the prompt the previous step issued
    Reply(Answer),
    /// A value handed forward by `Next`, or a finished child dialog's result
    Resumed(Value),
}

impl StepInput {
    pub fn text(&self) -> Option<&str> {
        match self {
            StepInput::Reply(Answer::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn choice(&self) -> Option<&str> {
        match self {
            StepInput::Reply(Answer::Choice { value, .. }) => Some(value),
            _ => None,
        }
    }

    pub fn confirmed(&self) -> Option<bool> {
        match self {
            StepInput::Reply(Answer::Confirm(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn number(&self) -> Option<i64> {
        match self {
            StepInput::Reply(Answer::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Deserialize a resumed value into the type the step expects
    pub fn resumed_as<T: DeserializeOwned>(&self) -> Option<T> {
        match self {
            StepInput::Resumed(value) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    /// The value this input carries when a sequence finishes on it
    pub fn into_result(self) -> Value {
        match self {
            StepInput::Start => Value::Null,
            StepInput::Reply(answer) => answer.to_value(),
            StepInput::Resumed(value) => value,
        }
    }
}

/// What a step decided
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    /// Ask the user; the reply goes to the next step
    Prompt(PromptSpec),
    /// Ask again; the reply comes back to this same step
    Retry(PromptSpec),
    /// Begin a child dialog; its result goes to the next step
    Recurse { dialog: String, options: Value },
    /// Continue with the next step in this turn
    Next(Value),
    /// Finish this dialog and hand the value to the caller
    End(Value),
    /// Finish this dialog and start a fresh frame in its place
    Replace { dialog: String, options: Value },
}

impl StepResult {
    pub fn recurse(dialog: impl Into<String>, options: impl Serialize) -> Self {
        StepResult::Recurse {
            dialog: dialog.into(),
            options: to_json(options),
        }
    }

    pub fn replace(dialog: impl Into<String>, options: impl Serialize) -> Self {
        StepResult::Replace {
            dialog: dialog.into(),
            options: to_json(options),
        }
    }

    pub fn next(value: impl Serialize) -> Self {
        StepResult::Next(to_json(value))
    }

    pub fn end(value: impl Serialize) -> Self {
        StepResult::End(to_json(value))
    }
}

fn to_json(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Everything a step may read or touch while it runs
pub struct StepContext<'a> {
    dialog: &'a str,
    step: &'a str,
    pub values: &'a mut Values,
    options: &'a Value,
    outbox: Vec<Activity>,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        dialog: &'a str,
        step: &'a str,
        values: &'a mut Values,
        options: &'a Value,
    ) -> Self {
        Self {
            dialog,
            step,
            values,
            options,
            outbox: Vec::new(),
        }
    }

    pub fn dialog(&self) -> &str {
        self.dialog
    }

    pub fn step(&self) -> &str {
        self.step
    }

    /// Caller-supplied payload of the current frame
    pub fn options(&self) -> &Value {
        self.options
    }

    pub fn options_as<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.options.clone()).ok()
    }

    /// Fire-and-forget message to the user
    pub fn send(&mut self, activity: impl Into<Activity>) {
        self.outbox.push(activity.into());
    }

    pub(crate) fn into_outbox(self) -> Vec<Activity> {
        self.outbox
    }
}
