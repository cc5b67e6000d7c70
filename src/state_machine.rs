//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the dialog stack is advanced by `transition`, and everything observable
//! leaves as an `Effect` for the runtime to execute.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::TurnEvent;
pub use state::{ConversationState, DialogStackFrame};
pub use transition::{transition, TransitionError, TransitionResult, TurnResult, TurnStatus};
