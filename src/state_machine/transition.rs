//! Pure state transition function
//!
//! Drives the dialog stack for one turn: dispatches the resolved input to the
//! innermost frame's current step and keeps applying step results until a
//! step prompts or the stack empties.

use super::{ConversationState, DialogStackFrame, Effect, TurnEvent};
use crate::dialog::{DialogRegistry, PromptSpec, StepContext, StepInput, StepResult};
use serde_json::Value;
use thiserror::Error;

/// Upper bound on synchronous step evaluations within one turn
pub const MAX_STEPS_PER_TURN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// No active frame; the caller must begin a dialog
    Empty,
    /// Suspended on a prompt until the next user message
    Waiting,
    /// The root dialog ended
    Completed,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TurnResult {
    pub status: TurnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl TurnResult {
    pub fn empty() -> Self {
        Self {
            status: TurnStatus::Empty,
            result: None,
        }
    }

    pub fn waiting() -> Self {
        Self {
            status: TurnStatus::Waiting,
            result: None,
        }
    }

    pub fn completed(result: Value) -> Self {
        Self {
            status: TurnStatus::Completed,
            result: Some(result),
        }
    }
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
    pub turn: TurnResult,
}

#[cfg(test)]
impl TransitionResult {
    /// Activities emitted this turn, in order
    pub fn activities(&self) -> impl Iterator<Item = &crate::dialog::Activity> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::SendActivity(activity) => Some(activity),
            Effect::PersistState => None,
        })
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Unknown dialog: {0}")]
    UnknownDialog(String),
    #[error("Dialog {dialog} exceeded {limit} steps in one turn")]
    Runaway { dialog: String, limit: usize },
    #[error("Frame for {dialog} points at step {step_index} of {len}")]
    CorruptFrame {
        dialog: String,
        step_index: usize,
        len: usize,
    },
}

/// Pure transition function
///
/// Given the same state, registry and event it always produces the same
/// outputs, with no I/O side effects.
pub fn transition(
    state: &ConversationState,
    registry: &DialogRegistry,
    event: TurnEvent,
) -> Result<TransitionResult, TransitionError> {
    let mut new_state = state.clone();
    let mut effects = Vec::new();

    let turn = match event {
        TurnEvent::Begin { dialog, options } => {
            let definition = registry
                .get(&dialog)
                .ok_or_else(|| TransitionError::UnknownDialog(dialog.clone()))?;
            new_state
                .stack
                .push(DialogStackFrame::new(definition, options));
            run_until_suspended(&mut new_state.stack, registry, StepInput::Start, &mut effects)?
        }

        TurnEvent::UserMessage {
            activity_id,
            text,
            intent,
        } => {
            new_state.last_activity_id = Some(activity_id);
            match new_state.stack.last_mut() {
                None => TurnResult::empty(),
                Some(frame) => match frame.pending_prompt.take() {
                    Some(prompt) => match prompt.recognize(&text, intent.as_ref()) {
                        Some(answer) => run_until_suspended(
                            &mut new_state.stack,
                            registry,
                            StepInput::Reply(answer),
                            &mut effects,
                        )?,
                        None => {
                            // Unrecognized reply: re-ask, stack untouched
                            push_activity(&mut effects, prompt.retry_activity());
                            frame.pending_prompt = Some(prompt);
                            TurnResult::waiting()
                        }
                    },
                    // Restored frame without a prompt: deliver the raw text
                    None => run_until_suspended(
                        &mut new_state.stack,
                        registry,
                        StepInput::Reply(crate::dialog::Answer::Text(text.trim().to_string())),
                        &mut effects,
                    )?,
                },
            }
        }
    };

    effects.push(Effect::PersistState);
    Ok(TransitionResult {
        new_state,
        effects,
        turn,
    })
}

/// Apply step results until a prompt suspends the turn or the stack empties
fn run_until_suspended(
    stack: &mut Vec<DialogStackFrame>,
    registry: &DialogRegistry,
    mut input: StepInput,
    effects: &mut Vec<Effect>,
) -> Result<TurnResult, TransitionError> {
    for _ in 0..MAX_STEPS_PER_TURN {
        let Some(frame) = stack.last_mut() else {
            return Ok(TurnResult::completed(input.into_result()));
        };
        let definition = registry
            .get(&frame.dialog)
            .ok_or_else(|| TransitionError::UnknownDialog(frame.dialog.clone()))?;

        let index = frame.step_index;
        if index > definition.step_count() {
            return Err(TransitionError::CorruptFrame {
                dialog: frame.dialog.clone(),
                step_index: index,
                len: definition.step_count(),
            });
        }
        if index == definition.step_count() {
            // Sequence ran off its end: the last input is its result
            let result = input.into_result();
            stack.pop();
            if stack.is_empty() {
                return Ok(TurnResult::completed(result));
            }
            input = StepInput::Resumed(result);
            continue;
        }

        let step = &definition.steps()[index];
        let mut ctx = StepContext::new(&frame.dialog, step.name(), &mut frame.values, &frame.options);
        let outcome = step.run(&mut ctx, input);
        for activity in ctx.into_outbox() {
            push_activity(effects, activity);
        }

        match outcome {
            StepResult::Prompt(prompt) => {
                frame.step_index = index + 1;
                suspend(frame, prompt, effects);
                return Ok(TurnResult::waiting());
            }
            StepResult::Retry(prompt) => {
                suspend(frame, prompt, effects);
                return Ok(TurnResult::waiting());
            }
            StepResult::Next(value) => {
                frame.step_index = index + 1;
                input = StepInput::Resumed(value);
            }
            StepResult::Recurse { dialog, options } => {
                frame.step_index = index + 1;
                let child = registry
                    .get(&dialog)
                    .ok_or_else(|| TransitionError::UnknownDialog(dialog.clone()))?;
                stack.push(DialogStackFrame::new(child, options));
                input = StepInput::Start;
            }
            StepResult::End(value) => {
                stack.pop();
                if stack.is_empty() {
                    return Ok(TurnResult::completed(value));
                }
                input = StepInput::Resumed(value);
            }
            StepResult::Replace { dialog, options } => {
                let replacement = registry
                    .get(&dialog)
                    .ok_or_else(|| TransitionError::UnknownDialog(dialog.clone()))?;
                stack.pop();
                stack.push(DialogStackFrame::new(replacement, options));
                input = StepInput::Start;
            }
        }
    }

    Err(TransitionError::Runaway {
        dialog: stack
            .last()
            .map(|f| f.dialog.clone())
            .unwrap_or_default(),
        limit: MAX_STEPS_PER_TURN,
    })
}

fn suspend(frame: &mut DialogStackFrame, prompt: PromptSpec, effects: &mut Vec<Effect>) {
    push_activity(effects, prompt.activity.clone());
    frame.pending_prompt = Some(prompt);
}

fn push_activity(effects: &mut Vec<Effect>, activity: crate::dialog::Activity) {
    if !activity.is_empty() {
        effects.push(Effect::SendActivity(activity));
    }
}
