//! Greeting and profile onboarding

use super::{OPTIONS, PROFILE, WELCOME};
use crate::dialog::{DialogDefinition, PromptSpec, StepResult, ValueKey};
use serde_json::{json, Value};

const NAME: ValueKey<String> = ValueKey::new("name");
const AGE: ValueKey<i64> = ValueKey::new("age");

pub(super) const GREETING: &str = "Welcome to the English Ready! How can I help you today?";
const AGE_RETRY: &str = "Sorry, I didn't get that. Please enter your age as a number.";

/// Greets, waits for any reply, then collects the profile
pub(super) fn welcome_dialog() -> DialogDefinition {
    DialogDefinition::new(WELCOME)
        .step("greet", |ctx, _| {
            ctx.send(GREETING);
            StepResult::Next(Value::Null)
        })
        // Silent prompt: the greeting already asked
        .step("listen", |_, _| StepResult::Prompt(PromptSpec::text("")))
        .step("profile", |_, _| StepResult::recurse(PROFILE, Value::Null))
}

pub(super) fn profile_dialog() -> DialogDefinition {
    DialogDefinition::new(PROFILE)
        .step("ask_name", |_, _| {
            StepResult::Prompt(
                PromptSpec::text("What is your name?")
                    .with_retry("Sorry, I didn't get that. Please enter your name."),
            )
        })
        .step("ask_age", |ctx, input| {
            let name = input.text().unwrap_or_default().to_string();
            ctx.values.set(NAME, &name);
            StepResult::Prompt(
                PromptSpec::number(format!("Nice to meet you, {name}! How old are you?"))
                    .with_retry(AGE_RETRY),
            )
        })
        .step("store_age", |ctx, input| {
            if let Some(age) = input.number() {
                ctx.values.set(AGE, &age);
                return StepResult::Next(Value::Null);
            }
            tracing::warn!(dialog = ctx.dialog(), step = ctx.step(), "Age missing, asking again");
            ctx.send("Sorry, I didn't understand that. Could you please enter your age as a number?");
            StepResult::Retry(
                PromptSpec::number("Please enter your age as a number.").with_retry(AGE_RETRY),
            )
        })
        .step("thank_you", |ctx, input| {
            if let Some(age) = input.number() {
                ctx.values.set(AGE, &age);
            }
            let (Some(name), Some(age)) = (ctx.values.get(NAME), ctx.values.get(AGE)) else {
                tracing::warn!(dialog = ctx.dialog(), step = ctx.step(), "Age missing at thank-you, asking again");
                ctx.send("It seems like I missed your age. Let's try again.");
                return StepResult::Retry(
                    PromptSpec::number("Could you please enter your age again?")
                        .with_retry(AGE_RETRY),
                );
            };
            ctx.send(format!(
                "Thank you, {name}! You are {age} years old. It's nice to meet you. \n\nHere are some options for you can chose from."
            ));
            StepResult::recurse(OPTIONS, json!({ "name": name, "age": age }))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::registry;
    use crate::runtime::testing::TestFlow;

    #[test]
    fn test_welcome_through_profile_to_options() {
        let mut flow = TestFlow::new(registry().unwrap(), WELCOME);
        flow.send("start")
            .assert_reply(GREETING)
            .assert_no_reply()
            .send("hello there")
            .assert_reply("What is your name?")
            .send("Ada")
            .assert_reply("Nice to meet you, Ada! How old are you?")
            .send("I'm thirty")
            .assert_reply(AGE_RETRY)
            .send("36")
            .assert_reply_contains("Thank you, Ada! You are 36 years old.")
            .assert_reply("What task you would like to me to perform?")
            .assert_card();
        assert_eq!(flow.state().dialog_path(), vec![WELCOME, PROFILE, OPTIONS]);
    }

    #[test]
    fn test_profile_restored_without_prompt_reasks_age() {
        // Frame restored on store_age without its pending prompt
        let registry = registry().unwrap();
        let mut flow = TestFlow::new(registry, PROFILE);
        flow.send("start").skip(1).send("Ada").skip(1);
        flow.clear_pending_prompt();

        flow.send("not a number")
            .assert_reply("Sorry, I didn't understand that. Could you please enter your age as a number?")
            .assert_reply("Please enter your age as a number.")
            .send("41")
            .assert_reply_contains("You are 41 years old.");
    }
}
