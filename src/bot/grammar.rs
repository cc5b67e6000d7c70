//! Grammar check collection

use super::{GRAMMAR, MORE_GRAMMAR};
use crate::dialog::{DialogDefinition, PromptSpec, StepContext, StepInput, StepResult, ValueKey};
use serde::{Deserialize, Serialize};

/// Texts the user asked to have checked, carried between the grammar dialogs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarUser {
    #[serde(default)]
    pub grammar_corrections: Vec<String>,
}

const USER: ValueKey<GrammarUser> = ValueKey::new("user");

const ASK: &str = "Give me something to check the grammar?";
const MORE: &str = "Anything else to grammar check?";

fn ask(_: &mut StepContext<'_>, _: StepInput) -> StepResult {
    StepResult::Prompt(PromptSpec::text(ASK))
}

/// Add the reply to the user's list and ask whether there is more
fn record(ctx: &mut StepContext<'_>, input: StepInput) -> StepResult {
    let mut user: GrammarUser = ctx.options_as().unwrap_or_default();
    if let Some(text) = input.text() {
        user.grammar_corrections.push(text.to_string());
    }
    ctx.values.set(USER, &user);
    StepResult::Prompt(PromptSpec::confirm(MORE))
}

fn user(ctx: &StepContext<'_>) -> GrammarUser {
    ctx.values.get(USER).unwrap_or_default()
}

pub(super) fn grammar_dialog() -> DialogDefinition {
    DialogDefinition::new(GRAMMAR)
        .step("ask", ask)
        .step("record", record)
        .step("more", |ctx, input| {
            let user = user(ctx);
            if input.confirmed() == Some(true) {
                StepResult::recurse(MORE_GRAMMAR, &user)
            } else {
                StepResult::next(&user)
            }
        })
        .step("summary", |ctx, input| {
            let user: GrammarUser = input.resumed_as().unwrap_or_else(|| user(ctx));
            ctx.send("Returning the grammar & grammar corrections");
            for text in &user.grammar_corrections {
                ctx.send(text.as_str());
            }
            StepResult::end(&user)
        })
}

/// Loops on itself while the user has more to check
pub(super) fn more_grammar_dialog() -> DialogDefinition {
    DialogDefinition::new(MORE_GRAMMAR)
        .step("ask", ask)
        .step("record", record)
        .step("more", |ctx, input| {
            let user = user(ctx);
            if input.confirmed() == Some(true) {
                StepResult::replace(MORE_GRAMMAR, &user)
            } else {
                ctx.send("Ok.");
                StepResult::end(&user)
            }
        })
}
