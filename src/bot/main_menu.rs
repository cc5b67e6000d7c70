//! Operation menu: the root `main` dialog and the `options` child

use super::{cards, EXERCISE, GRAMMAR, MAIN, OPTIONS, WRITING_TIPS};
use crate::dialog::{
    Activity, ChoiceOption, DialogDefinition, PromptSpec, StepContext, StepInput, StepResult,
};
use serde_json::Value;

const GRAMMAR_CORRECTION: &str = "Grammar Correction";
const WRITING_TIPS_OPTION: &str = "Writing Tips";
const WRITING_EXERCISE: &str = "Writing Exercise";

const MAIN_INTRO: &str = "What operation you would like to perform?";
const OPTIONS_INTRO: &str = "What task you would like to me to perform?";
pub(super) const RESTART_INTRO: &str = "What else can I do for you?";
pub(super) const INVALID_OPERATION: &str = "Invalid operation selected.";

/// The three operations as a card prompt. Recognizer intents select them too.
fn operation_prompt() -> PromptSpec {
    let options = vec![
        ChoiceOption::new(GRAMMAR_CORRECTION).with_intent("GrammarCorrection"),
        ChoiceOption::new(WRITING_TIPS_OPTION).with_intent("WritingTips"),
        ChoiceOption::new(WRITING_EXERCISE).with_intent("WritingExercise"),
    ];
    let card = cards::choice_card(&[GRAMMAR_CORRECTION, WRITING_TIPS_OPTION, WRITING_EXERCISE]);
    PromptSpec::choice_with("", options).with_activity(Activity::card(card))
}

/// Begin the child dialog for the chosen operation
fn dispatch_operation(ctx: &mut StepContext<'_>, input: &StepInput) -> StepResult {
    let dialog = match input.choice() {
        Some(GRAMMAR_CORRECTION) => GRAMMAR,
        Some(WRITING_TIPS_OPTION) => WRITING_TIPS,
        Some(WRITING_EXERCISE) => EXERCISE,
        other => {
            tracing::warn!(dialog = ctx.dialog(), step = ctx.step(), choice = ?other, "No operation selected");
            ctx.send(INVALID_OPERATION);
            return StepResult::End(Value::Null);
        }
    };
    tracing::debug!(dialog = ctx.dialog(), child = dialog, "Operation selected");
    StepResult::recurse(dialog, Value::Null)
}

/// Root dialog: menu, run the operation, then restart with a follow-up question
pub(super) fn main_dialog() -> DialogDefinition {
    DialogDefinition::new(MAIN)
        .step("intro", |ctx, _| {
            let intro = ctx
                .options()
                .as_str()
                .filter(|s| !s.is_empty())
                .unwrap_or(MAIN_INTRO)
                .to_string();
            ctx.send(intro);
            StepResult::Prompt(operation_prompt())
        })
        .step("act", |ctx, input| dispatch_operation(ctx, &input))
        .step("final", |_, _| StepResult::replace(MAIN, RESTART_INTRO))
}

/// Menu offered at the end of the profile flow
pub(super) fn options_dialog() -> DialogDefinition {
    DialogDefinition::new(OPTIONS)
        .step("options", |ctx, _| {
            ctx.send(OPTIONS_INTRO);
            StepResult::Prompt(operation_prompt())
        })
        .step("handle", |ctx, input| dispatch_operation(ctx, &input))
}
