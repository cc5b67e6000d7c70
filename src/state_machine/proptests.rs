//! Property-based tests for the state machine
//!
//! These tests verify the waterfall and stack invariants hold across
//! arbitrary step layouts and reply sequences.

use super::*;
use crate::dialog::{DialogDefinition, DialogRegistry, PromptSpec, StepResult};
use proptest::prelude::*;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Next,
    Prompt,
    End,
    Recurse,
}

fn arb_kind() -> impl Strategy<Value = Kind> {
    prop_oneof![
        3 => Just(Kind::Next),
        3 => Just(Kind::Prompt),
        1 => Just(Kind::End),
        1 => Just(Kind::Recurse),
    ]
}

/// A root dialog built from `kinds`; every step announces itself before acting.
/// Recurse steps call a child that ends immediately.
fn build(kinds: &[Kind]) -> DialogRegistry {
    let mut root = DialogDefinition::new("root");
    for (i, kind) in kinds.iter().copied().enumerate() {
        root = root.step(format!("s{i}"), move |ctx, _| {
            ctx.send(format!("step {i}"));
            match kind {
                Kind::Next => StepResult::next(i),
                Kind::Prompt => StepResult::Prompt(PromptSpec::text(format!("prompt {i}"))),
                Kind::End => StepResult::end(i),
                Kind::Recurse => StepResult::recurse("child", json!(i)),
            }
        });
    }
    let child = DialogDefinition::new("child").step("done", |ctx, _| {
        StepResult::End(ctx.options().clone())
    });
    DialogRegistry::new()
        .with(root)
        .and_then(|r| r.with(child))
        .unwrap()
}

fn texts(result: &TransitionResult) -> Vec<String> {
    result.activities().filter_map(|a| a.text.clone()).collect()
}

fn root_index(state: &ConversationState) -> Option<usize> {
    state
        .stack
        .first()
        .filter(|f| f.dialog == "root")
        .map(|f| f.step_index)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_step_index_monotonic_and_bounded(
        kinds in proptest::collection::vec(arb_kind(), 1..10),
        replies in proptest::collection::vec("[a-z]{1,6}", 0..12),
    ) {
        let registry = build(&kinds);
        let mut state = transition(&ConversationState::new(), &registry, TurnEvent::begin("root", Value::Null))
            .unwrap()
            .new_state;
        let mut last = root_index(&state);

        for (n, reply) in replies.iter().enumerate() {
            if state.is_idle() {
                break;
            }
            state = transition(&state, &registry, TurnEvent::user_message(format!("a{n}"), reply.clone()))
                .unwrap()
                .new_state;

            for frame in &state.stack {
                let len = registry.get(&frame.dialog).unwrap().step_count();
                prop_assert!(frame.step_index <= len);
            }
            let now = root_index(&state);
            if let (Some(before), Some(after)) = (last, now) {
                prop_assert!(after >= before, "root moved back from {} to {}", before, after);
            }
            last = now;
        }
    }

    #[test]
    fn prop_at_most_one_prompt_per_turn(
        kinds in proptest::collection::vec(arb_kind(), 1..10),
    ) {
        let registry = build(&kinds);
        let result = transition(&ConversationState::new(), &registry, TurnEvent::begin("root", Value::Null)).unwrap();
        let sent = texts(&result);

        let prompts = sent.iter().filter(|t| t.starts_with("prompt")).count();
        prop_assert!(prompts <= 1);

        // Nothing is evaluated after the first prompting step
        if let Some(p) = kinds.iter().position(|k| *k == Kind::Prompt) {
            let stopped_early = kinds[..p].contains(&Kind::End);
            if !stopped_early {
                prop_assert_eq!(sent.last().cloned(), Some(format!("prompt {p}")));
                prop_assert_eq!(result.turn.status, TurnStatus::Waiting);
                let ran = sent.iter().filter(|t| t.starts_with("step")).count();
                prop_assert_eq!(ran, p + 1);
            }
        }
    }

    #[test]
    fn prop_ended_child_resumes_parent_next_step(
        before in 0usize..4,
        after in 0usize..3,
    ) {
        // Next^before, Recurse, Prompt, Next^after
        let mut kinds = vec![Kind::Next; before];
        kinds.push(Kind::Recurse);
        kinds.push(Kind::Prompt);
        kinds.extend(std::iter::repeat_n(Kind::Next, after));
        let registry = build(&kinds);

        let result = transition(&ConversationState::new(), &registry, TurnEvent::begin("root", Value::Null)).unwrap();
        let frame = &result.new_state.stack[0];
        prop_assert_eq!(result.new_state.stack.len(), 1);
        prop_assert_eq!(frame.step_index, before + 2);
        prop_assert_eq!(texts(&result).last().cloned(), Some(format!("prompt {}", before + 1)));

        let done = transition(&result.new_state, &registry, TurnEvent::user_message("a1", "ok")).unwrap();
        prop_assert_eq!(done.turn.status, TurnStatus::Completed);
        prop_assert!(done.new_state.is_idle());
    }
}

#[test]
fn test_next_next_prompt_next_end_stops_at_prompt() {
    let registry = build(&[Kind::Next, Kind::Next, Kind::Prompt, Kind::Next, Kind::End]);
    let result = transition(
        &ConversationState::new(),
        &registry,
        TurnEvent::begin("root", Value::Null),
    )
    .unwrap();

    assert_eq!(
        texts(&result),
        vec!["step 0", "step 1", "step 2", "prompt 2"]
    );
    assert_eq!(result.new_state.stack[0].step_index, 3);

    let resumed = transition(&result.new_state, &registry, TurnEvent::user_message("a1", "go"))
        .unwrap();
    assert_eq!(texts(&resumed), vec!["step 3", "step 4"]);
    assert_eq!(resumed.turn, TurnResult::completed(json!(4)));
}
