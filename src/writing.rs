//! Writing mode
//!
//! Per-section drafting, attempt-limited submission to the grading oracle,
//! the weighted overall score and detection of the chat-to-editor handover.

mod controller;
mod score;
mod section;
mod service;
mod trigger;

#[cfg(test)]
mod proptests;

pub use controller::{count_words, AttemptPolicy, SubmissionOutcome, SubmitRejection};
pub use section::WritingSection;
pub use service::{
    ExitResponse, Navigation, SessionView, SubmitResponse, WritingService, WritingTask,
};
#[cfg(test)]
pub use trigger::route;
pub use trigger::{route_turn, WritingTrigger};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WritingError {
    #[error("Writing session not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Rejected(SubmitRejection),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Grading task failed: {0}")]
    Grading(String),
}
