//! Minimal echo dialog, handy for checking a deployment end to end

use super::HELLO_CHAIN;
use crate::dialog::{DialogDefinition, PromptSpec, StepResult};
use serde_json::Value;

pub(super) fn hello_chain_dialog() -> DialogDefinition {
    DialogDefinition::new(HELLO_CHAIN)
        .step("ask", |_, _| StepResult::Prompt(PromptSpec::text("Say something!")))
        .step("echo", |ctx, input| {
            let text = input.text().unwrap_or_default().to_string();
            let lowered = text.to_lowercase();
            if lowered.contains("hi") || lowered.contains("hello") {
                ctx.send("You said Hi!");
            } else {
                ctx.send(format!("You said something else: '{text}'"));
            }
            StepResult::End(Value::Null)
        })
}
