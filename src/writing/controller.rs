//! Section writing controller
//!
//! Tracks the active section, each section's draft, attempt budget and
//! feedback, and the exit confirmation flow. Submissions are two-phase:
//! [`SectionWritingController::begin_submission`] hands out a ticket before
//! the oracle is called and [`SectionWritingController::complete_submission`]
//! applies the oracle's answer to the section the ticket names, whichever
//! section is active by then.

use super::score::{compute_overall, OverallScore};
use super::WritingSection;
use crate::grading::{FeedbackPayload, GradingError, GradingErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Submissions allowed per section
pub const MAX_ATTEMPTS: u8 = 3;

/// Remaining submissions for one section, always within `0..=MAX_ATTEMPTS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attempts(u8);

impl Attempts {
    pub const fn full() -> Self {
        Attempts(MAX_ATTEMPTS)
    }

    /// Restore a persisted count, clamped into range
    pub fn restored(remaining: i64) -> Self {
        Attempts(u8::try_from(remaining.clamp(0, i64::from(MAX_ATTEMPTS))).unwrap_or(0))
    }

    pub fn remaining(self) -> u8 {
        self.0
    }

    fn consume(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }
}

impl Default for Attempts {
    fn default() -> Self {
        Self::full()
    }
}

/// When a submission's attempt is charged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPolicy {
    /// Charge when the submission is accepted, before the oracle answers.
    /// A failed grading still costs the attempt.
    #[default]
    ConsumeBeforeGrading,
    /// Charge only when the oracle returns feedback
    ConsumeOnSuccess,
}

impl FromStr for AttemptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "consume_before_grading" | "before" => Ok(AttemptPolicy::ConsumeBeforeGrading),
            "consume_on_success" | "success" => Ok(AttemptPolicy::ConsumeOnSuccess),
            other => Err(format!("unknown attempt policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    NotStarted,
    Drafting,
    /// Waiting on the oracle
    Submitted,
    Graded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPhase {
    Writing,
    ConfirmingExit,
    Closed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionRecord {
    pub attempts: Attempts,
    pub essay_text: String,
    pub feedback: Option<FeedbackPayload>,
    /// Message of the last failed grading, cleared on success
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitRejection {
    #[error("Write something before submitting")]
    EmptyText,
    #[error("No attempts left for this section")]
    NoAttemptsLeft,
    #[error("A submission is already being graded")]
    SubmissionInFlight,
    #[error("The writing session is closed")]
    SessionClosed,
    #[error("Finish or cancel the exit first")]
    ExitPending,
    #[error("Exit has not been requested")]
    ExitNotRequested,
}

/// Proof that a submission was accepted; redeemed by `complete_submission`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTicket {
    id: u64,
    pub section: WritingSection,
    pub text: String,
    /// Whether the attempt was charged up front
    pub charged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Graded {
        section: WritingSection,
        grade: Option<f64>,
        attempts_remaining: u8,
    },
    Failed {
        section: WritingSection,
        message: String,
        kind: GradingErrorKind,
        retryable: bool,
        attempts_remaining: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    ticket: u64,
    section: WritingSection,
}

#[derive(Debug, Clone)]
pub struct SectionWritingController {
    records: BTreeMap<WritingSection, SectionRecord>,
    active: WritingSection,
    policy: AttemptPolicy,
    phase: ExitPhase,
    in_flight: Option<InFlight>,
    next_ticket: u64,
}

impl Default for SectionWritingController {
    fn default() -> Self {
        Self::new(AttemptPolicy::default())
    }
}

impl SectionWritingController {
    pub fn new(policy: AttemptPolicy) -> Self {
        Self {
            records: WritingSection::ALL
                .into_iter()
                .map(|s| (s, SectionRecord::default()))
                .collect(),
            active: WritingSection::Introduction,
            policy,
            phase: ExitPhase::Writing,
            in_flight: None,
            next_ticket: 0,
        }
    }

    /// Resume with persisted attempt counts; sections not present keep a full budget
    pub fn with_attempts(mut self, attempts: &BTreeMap<WritingSection, Attempts>) -> Self {
        for (section, remaining) in attempts {
            self.record_mut(*section).attempts = *remaining;
        }
        self
    }

    /// Mark a session that was already closed
    pub fn closed(mut self) -> Self {
        self.phase = ExitPhase::Closed;
        self
    }

    fn record_mut(&mut self, section: WritingSection) -> &mut SectionRecord {
        self.records.entry(section).or_default()
    }

    pub fn record(&self, section: WritingSection) -> Option<&SectionRecord> {
        self.records.get(&section)
    }

    pub fn active(&self) -> WritingSection {
        self.active
    }

    pub fn policy(&self) -> AttemptPolicy {
        self.policy
    }

    pub fn phase(&self) -> ExitPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Switch sections; drafts, attempts and feedback are untouched
    pub fn select_section(&mut self, section: WritingSection) {
        self.active = section;
    }

    /// Move forward one section; stays on the last one
    pub fn next_section(&mut self) -> WritingSection {
        if let Some(next) = self.active.next() {
            self.active = next;
        }
        self.active
    }

    /// Move back one section; stays on the first one
    pub fn previous_section(&mut self) -> WritingSection {
        if let Some(previous) = self.active.previous() {
            self.active = previous;
        }
        self.active
    }

    pub fn save_draft(&mut self, section: WritingSection, text: &str) -> Result<(), SubmitRejection> {
        if self.phase == ExitPhase::Closed {
            return Err(SubmitRejection::SessionClosed);
        }
        text.clone_into(&mut self.record_mut(section).essay_text);
        Ok(())
    }

    pub fn attempts_remaining(&self, section: WritingSection) -> u8 {
        self.record(section)
            .map_or(MAX_ATTEMPTS, |r| r.attempts.remaining())
    }

    #[cfg(test)]
    pub fn attempts(&self) -> BTreeMap<WritingSection, Attempts> {
        self.records.iter().map(|(s, r)| (*s, r.attempts)).collect()
    }

    pub fn status(&self, section: WritingSection) -> SectionStatus {
        if self.in_flight.is_some_and(|f| f.section == section) {
            return SectionStatus::Submitted;
        }
        match self.record(section) {
            Some(r) if r.feedback.is_some() => SectionStatus::Graded,
            Some(r) if !r.essay_text.trim().is_empty() => SectionStatus::Drafting,
            _ => SectionStatus::NotStarted,
        }
    }

    pub fn word_count(&self, section: WritingSection) -> usize {
        self.record(section)
            .map_or(0, |r| count_words(&r.essay_text))
    }

    pub fn total_word_count(&self) -> usize {
        WritingSection::ALL
            .into_iter()
            .map(|s| self.word_count(s))
            .sum()
    }

    /// Accept a submission for grading.
    ///
    /// Rejections leave every record unchanged. On acceptance the text becomes
    /// the section's draft and, under `ConsumeBeforeGrading`, one attempt is
    /// charged before the oracle is asked.
    pub fn begin_submission(
        &mut self,
        section: WritingSection,
        text: &str,
    ) -> Result<SubmissionTicket, SubmitRejection> {
        match self.phase {
            ExitPhase::Closed => return Err(SubmitRejection::SessionClosed),
            ExitPhase::ConfirmingExit => return Err(SubmitRejection::ExitPending),
            ExitPhase::Writing => {}
        }
        if text.trim().is_empty() {
            return Err(SubmitRejection::EmptyText);
        }
        if self.attempts_remaining(section) == 0 {
            return Err(SubmitRejection::NoAttemptsLeft);
        }
        if self.in_flight.is_some() {
            return Err(SubmitRejection::SubmissionInFlight);
        }

        let charged = self.policy == AttemptPolicy::ConsumeBeforeGrading;
        let record = self.record_mut(section);
        text.clone_into(&mut record.essay_text);
        if charged {
            record.attempts.consume();
        }

        self.next_ticket += 1;
        let id = self.next_ticket;
        self.in_flight = Some(InFlight {
            ticket: id,
            section,
        });
        Ok(SubmissionTicket {
            id,
            section,
            text: text.to_string(),
            charged,
        })
    }

    /// Apply the oracle's answer to the ticket's section
    pub fn complete_submission(
        &mut self,
        ticket: &SubmissionTicket,
        result: Result<FeedbackPayload, GradingError>,
    ) -> SubmissionOutcome {
        if self.in_flight.is_some_and(|f| f.ticket == ticket.id) {
            self.in_flight = None;
        }

        let charge_now = !ticket.charged;
        let record = self.record_mut(ticket.section);
        match result {
            Ok(payload) => {
                if charge_now {
                    record.attempts.consume();
                }
                let grade = payload.grade;
                record.feedback = Some(payload);
                record.last_error = None;
                SubmissionOutcome::Graded {
                    section: ticket.section,
                    grade,
                    attempts_remaining: record.attempts.remaining(),
                }
            }
            Err(error) => {
                record.last_error = Some(error.message.clone());
                SubmissionOutcome::Failed {
                    section: ticket.section,
                    message: error.message,
                    kind: error.kind,
                    retryable: error.kind.is_retryable(),
                    attempts_remaining: record.attempts.remaining(),
                }
            }
        }
    }

    /// Score over every graded section
    pub fn summary(&self) -> OverallScore {
        compute_overall(
            self.records
                .iter()
                .filter_map(|(s, r)| r.feedback.as_ref().map(|f| (*s, f))),
        )
    }

    /// Open the exit confirmation with a preview of the final score
    pub fn request_exit(&mut self) -> Result<OverallScore, SubmitRejection> {
        if self.phase == ExitPhase::Closed {
            return Err(SubmitRejection::SessionClosed);
        }
        self.phase = ExitPhase::ConfirmingExit;
        Ok(self.summary())
    }

    pub fn cancel_exit(&mut self) -> Result<(), SubmitRejection> {
        match self.phase {
            ExitPhase::Closed => Err(SubmitRejection::SessionClosed),
            ExitPhase::Writing => Err(SubmitRejection::ExitNotRequested),
            ExitPhase::ConfirmingExit => {
                self.phase = ExitPhase::Writing;
                Ok(())
            }
        }
    }

    /// Close the session and return the final score
    pub fn confirm_exit(&mut self) -> Result<OverallScore, SubmitRejection> {
        match self.phase {
            ExitPhase::Closed => return Err(SubmitRejection::SessionClosed),
            ExitPhase::Writing => return Err(SubmitRejection::ExitNotRequested),
            ExitPhase::ConfirmingExit => {}
        }
        if self.in_flight.is_some() {
            return Err(SubmitRejection::SubmissionInFlight);
        }
        self.phase = ExitPhase::Closed;
        Ok(self.summary())
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
