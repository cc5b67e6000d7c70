//! IELTS Task 1 writing exercise
//!
//! Shows the task, lets the user pick a section and hands over to the writing
//! editor with an `enterWritingMode` signal on the section prompt.

use super::{cards, EXERCISE};
use crate::dialog::{
    Activity, ChannelSignal, DialogDefinition, PromptSpec, StepResult, ValueKey,
};
use crate::writing::{count_words, WritingSection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Carried across restarts of the exercise
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseOptions {
    /// The task card was already shown
    #[serde(default)]
    pub skip_task: bool,
    /// Sections drafted so far, in the order they were first written
    #[serde(default)]
    pub written: Vec<WritingSection>,
}

const SECTION: ValueKey<WritingSection> = ValueKey::new("current_section");
const WRITTEN: ValueKey<Vec<WritingSection>> = ValueKey::new("written");

const CHOOSE: &str = "Which section would you like to write?";
const ANOTHER: &str = "Would you like to write another section?";

fn section_prompt() -> PromptSpec {
    let labels: Vec<&str> = WritingSection::ALL.iter().map(|s| s.label()).collect();
    PromptSpec::choice(CHOOSE, &labels)
}

/// Text prompt that also tells the client to open the editor
fn writing_prompt(section: WritingSection) -> PromptSpec {
    let prompt = section.writing_prompt();
    let activity = Activity::text(prompt.clone())
        .with_signal(ChannelSignal::EnterWritingMode { section, prompt });
    PromptSpec::text("").with_activity(activity)
}

fn labels(sections: &[WritingSection]) -> String {
    sections
        .iter()
        .map(|s| s.label())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(super) fn exercise_dialog() -> DialogDefinition {
    DialogDefinition::new(EXERCISE)
        .step("task", |ctx, _| {
            let options: ExerciseOptions = ctx.options_as().unwrap_or_default();
            if !options.skip_task {
                ctx.send(Activity::card(cards::task_card()));
            }
            StepResult::Next(Value::Null)
        })
        .step("choose_section", |_, _| StepResult::Prompt(section_prompt()))
        .step("write", |ctx, input| {
            let Some(section) = input.choice().and_then(|c| c.parse::<WritingSection>().ok())
            else {
                tracing::warn!(dialog = ctx.dialog(), step = ctx.step(), "No section chosen, asking again");
                return StepResult::Retry(section_prompt());
            };
            ctx.values.set(SECTION, &section);
            ctx.send(section.guidance());
            StepResult::Prompt(writing_prompt(section))
        })
        .step("acknowledge", |ctx, input| {
            let section = ctx
                .values
                .get(SECTION)
                .unwrap_or(WritingSection::Introduction);
            let words = input.text().map_or(0, count_words);
            tracing::info!(dialog = ctx.dialog(), step = ctx.step(), section = %section, words, "Section drafted");
            ctx.send(format!(
                "Thanks! Your {} has been saved ({words} words). Submit it from the writing editor to get feedback.",
                section.label()
            ));

            let mut written = ctx
                .options_as::<ExerciseOptions>()
                .unwrap_or_default()
                .written;
            if !written.contains(&section) {
                written.push(section);
            }
            ctx.values.set(WRITTEN, &written);
            StepResult::Prompt(PromptSpec::confirm(ANOTHER))
        })
        .step("another", |ctx, input| {
            let written = ctx.values.get(WRITTEN).unwrap_or_default();
            if input.confirmed() == Some(true) {
                return StepResult::replace(
                    EXERCISE,
                    ExerciseOptions {
                        skip_task: true,
                        written,
                    },
                );
            }
            ctx.send(format!("Sections written: {}.", labels(&written)));
            StepResult::end(&written)
        })
}
