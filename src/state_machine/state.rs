//! Conversation state types

use crate::dialog::{DialogDefinition, PromptSpec, Values};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One active dialog in a conversation's stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogStackFrame {
    pub dialog: String,
    /// Index of the step that receives the next input. Equal to the step
    /// count once the sequence has finished and is about to return.
    pub step_index: usize,
    #[serde(default)]
    pub values: Values,
    /// Caller-supplied init payload
    #[serde(default)]
    pub options: Value,
    /// The prompt this frame is suspended on, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_prompt: Option<PromptSpec>,
}

impl DialogStackFrame {
    pub fn new(definition: &DialogDefinition, options: Value) -> Self {
        Self {
            dialog: definition.name().to_string(),
            step_index: definition.initial_step(),
            values: Values::new(),
            options,
            pending_prompt: None,
        }
    }
}

/// Everything persisted between turns for one conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Innermost (active) frame last
    pub stack: Vec<DialogStackFrame>,
    #[serde(default)]
    pub last_activity_id: Option<String>,
}

impl ConversationState {
    /// Names of the active dialogs, outermost first
    pub fn dialog_path(&self) -> Vec<&str> {
        self.stack.iter().map(|f| f.dialog.as_str()).collect()
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl ConversationState {
    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    /// Whether the conversation is suspended on a prompt
    pub fn is_waiting(&self) -> bool {
        self.stack.last().is_some_and(|f| f.pending_prompt.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::StepResult;

    #[test]
    fn test_state_json_roundtrip_keeps_pending_prompt() {
        let def = DialogDefinition::new("profile").step("ask", |_, _| StepResult::end(()));
        let mut frame = DialogStackFrame::new(&def, serde_json::json!({"from": "welcome"}));
        frame.pending_prompt = Some(PromptSpec::number("How old are you?"));
        let state = ConversationState {
            stack: vec![frame],
            last_activity_id: Some("act-1".to_string()),
        };

        let json = serde_json::to_string(&state).unwrap();
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert!(back.is_waiting());
        assert_eq!(back.dialog_path(), vec!["profile"]);
    }

    #[test]
    fn test_legacy_state_without_optional_fields() {
        let back: ConversationState =
            serde_json::from_str(r#"{"stack":[{"dialog":"main","step_index":1}]}"#).unwrap();
        assert_eq!(back.stack[0].options, Value::Null);
        assert!(back.stack[0].values.is_empty());
        assert!(!back.is_waiting());
        assert!(back.last_activity_id.is_none());
    }
}
