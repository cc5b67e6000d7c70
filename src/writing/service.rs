//! Writing sessions: controllers keyed by session id, with durable attempts
//!
//! Each session's controller sits behind its own lock. The lock is released
//! while the oracle grades a submission, so drafts and navigation keep
//! working and the answer lands on the section it was requested for.

use super::controller::{
    Attempts, AttemptPolicy, ExitPhase, SectionStatus, SectionWritingController,
    SubmissionOutcome, SubmitRejection,
};
use super::score::OverallScore;
use super::{WritingError, WritingSection};
use crate::grading::{FeedbackPayload, GradingOracle, SubmissionRequest};
use crate::runtime::AttemptStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Which exercise a session answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritingTask {
    pub task_type: String,
    pub question_number: u32,
}

impl Default for WritingTask {
    fn default() -> Self {
        Self {
            task_type: "Task 1".to_string(),
            question_number: 1,
        }
    }
}

struct WritingSession {
    id: String,
    task: WritingTask,
    controller: SectionWritingController,
}

type SessionHandle = Arc<Mutex<WritingSession>>;

/// Minimum essay length the editor counts towards
pub const TARGET_WORDS: usize = 150;

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub section: WritingSection,
    pub label: &'static str,
    pub status: SectionStatus,
    pub attempts_remaining: u8,
    pub word_count: usize,
    pub essay_text: String,
    pub guidelines: &'static [&'static str],
    pub placeholder: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Snapshot of a session for the client
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    #[serde(flatten)]
    pub task: WritingTask,
    pub active_section: WritingSection,
    pub phase: ExitPhase,
    pub policy: AttemptPolicy,
    pub is_submitting: bool,
    pub total_words: usize,
    pub target_words: usize,
    pub sections: Vec<SectionView>,
}

impl WritingSession {
    fn view(&self) -> SessionView {
        let c = &self.controller;
        let sections = WritingSection::ALL
            .into_iter()
            .map(|section| {
                let record = c.record(section);
                SectionView {
                    section,
                    label: section.label(),
                    status: c.status(section),
                    attempts_remaining: c.attempts_remaining(section),
                    word_count: c.word_count(section),
                    essay_text: record.map(|r| r.essay_text.clone()).unwrap_or_default(),
                    guidelines: section.guidelines(),
                    placeholder: section.placeholder(),
                    feedback: record.and_then(|r| r.feedback.clone()),
                    last_error: record.and_then(|r| r.last_error.clone()),
                }
            })
            .collect();

        SessionView {
            id: self.id.clone(),
            task: self.task.clone(),
            active_section: c.active(),
            phase: c.phase(),
            policy: c.policy(),
            is_submitting: c.is_submitting(),
            total_words: c.total_word_count(),
            target_words: TARGET_WORDS,
            sections,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub outcome: SubmissionOutcome,
    pub session: SessionView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExitResponse {
    pub summary: OverallScore,
    pub session: SessionView,
}

/// Direction for section navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    Next,
    Previous,
}

pub struct WritingService {
    store: Arc<dyn AttemptStore>,
    oracle: Arc<dyn GradingOracle>,
    policy: AttemptPolicy,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl WritingService {
    pub fn new(
        store: Arc<dyn AttemptStore>,
        oracle: Arc<dyn GradingOracle>,
        policy: AttemptPolicy,
    ) -> Self {
        Self {
            store,
            oracle,
            policy,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a fresh session with a full attempt budget
    pub async fn create_session(&self, task: WritingTask) -> Result<SessionView, WritingError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.store
            .create_session(&id, &task.task_type, task.question_number)
            .await
            .map_err(WritingError::Storage)?;

        let session = WritingSession {
            id: id.clone(),
            task,
            controller: SectionWritingController::new(self.policy),
        };
        let view = session.view();
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(session)));

        tracing::info!(session_id = %id, policy = ?self.policy, "Writing session created");
        Ok(view)
    }

    /// Find a live session, or restore it (attempts and closed state) from storage
    async fn handle(&self, id: &str) -> Result<SessionHandle, WritingError> {
        if let Some(handle) = self.sessions.read().await.get(id) {
            return Ok(Arc::clone(handle));
        }

        let record = self
            .store
            .get_session(id)
            .await
            .map_err(WritingError::Storage)?
            .ok_or_else(|| WritingError::NotFound(id.to_string()))?;
        let attempts: BTreeMap<WritingSection, Attempts> = self
            .store
            .load_attempts(id)
            .await
            .map_err(WritingError::Storage)?
            .into_iter()
            .map(|(section, remaining)| (section, Attempts::restored(remaining)))
            .collect();

        let mut controller = SectionWritingController::new(self.policy).with_attempts(&attempts);
        if record.is_closed() {
            controller = controller.closed();
        }
        let session = WritingSession {
            id: record.id,
            task: WritingTask {
                task_type: record.task_type,
                question_number: record.question_number,
            },
            controller,
        };
        tracing::debug!(session_id = %id, "Writing session restored from storage");

        let mut sessions = self.sessions.write().await;
        let handle = sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(session)));
        Ok(Arc::clone(handle))
    }

    pub async fn get(&self, id: &str) -> Result<SessionView, WritingError> {
        let handle = self.handle(id).await?;
        let session = handle.lock().await;
        Ok(session.view())
    }

    pub async fn select_section(
        &self,
        id: &str,
        section: WritingSection,
    ) -> Result<SessionView, WritingError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        session.controller.select_section(section);
        Ok(session.view())
    }

    pub async fn navigate(&self, id: &str, direction: Navigation) -> Result<SessionView, WritingError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        match direction {
            Navigation::Next => session.controller.next_section(),
            Navigation::Previous => session.controller.previous_section(),
        };
        Ok(session.view())
    }

    pub async fn save_draft(
        &self,
        id: &str,
        section: WritingSection,
        text: &str,
    ) -> Result<SessionView, WritingError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        session.controller.save_draft(section, text)?;
        Ok(session.view())
    }

    /// Grade one section.
    ///
    /// Rejections return an error and change nothing. Oracle failures are a
    /// normal outcome: the draft is kept and the response says whether a retry
    /// makes sense. Grading runs on its own task, so a caller that goes away
    /// mid-grade still leaves the ticket completed and the gate released.
    pub async fn submit(
        &self,
        id: &str,
        section: WritingSection,
        text: Option<&str>,
    ) -> Result<SubmitResponse, WritingError> {
        let handle = self.handle(id).await?;

        let (ticket, request) = {
            let mut session = handle.lock().await;
            let text = match text {
                Some(text) => text.to_string(),
                None => session
                    .controller
                    .record(section)
                    .map(|r| r.essay_text.clone())
                    .unwrap_or_default(),
            };
            let ticket = session
                .controller
                .begin_submission(section, &text)
                .inspect_err(|rejection| {
                    tracing::info!(session_id = %id, section = %section, reason = %rejection, "Submission rejected");
                })?;
            if ticket.charged {
                persist_attempts(
                    self.store.as_ref(),
                    id,
                    section,
                    session.controller.attempts_remaining(section),
                )
                .await;
            }
            let request = SubmissionRequest {
                text: ticket.text.clone(),
                task_type: session.task.task_type.clone(),
                question_number: session.task.question_number,
                section,
                question_desc: None,
                question_requirements: None,
            };
            (ticket, request)
        };

        let store = Arc::clone(&self.store);
        let oracle = Arc::clone(&self.oracle);
        let session_id = id.to_string();
        let grading = tokio::spawn(async move {
            let result = oracle.grade(&request).await;

            let mut session = handle.lock().await;
            let before = session.controller.attempts_remaining(section);
            let outcome = session.controller.complete_submission(&ticket, result);
            let after = session.controller.attempts_remaining(section);
            if after != before {
                persist_attempts(store.as_ref(), &session_id, section, after).await;
            }

            tracing::info!(
                session_id = %session_id,
                section = %section,
                outcome = ?outcome,
                "Submission finished"
            );
            SubmitResponse {
                outcome,
                session: session.view(),
            }
        });

        grading.await.map_err(|e| {
            tracing::error!(session_id = %id, section = %section, error = %e, "Grading task failed");
            WritingError::Grading(e.to_string())
        })
    }

    pub async fn request_exit(&self, id: &str) -> Result<ExitResponse, WritingError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        let summary = session.controller.request_exit()?;
        Ok(ExitResponse {
            summary,
            session: session.view(),
        })
    }

    pub async fn cancel_exit(&self, id: &str) -> Result<SessionView, WritingError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        session.controller.cancel_exit()?;
        Ok(session.view())
    }

    /// Close the session for good and return the final score
    pub async fn confirm_exit(&self, id: &str) -> Result<ExitResponse, WritingError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        let summary = session.controller.confirm_exit()?;
        self.store
            .close_session(id)
            .await
            .map_err(WritingError::Storage)?;

        let view = session.view();
        drop(session);
        // Closed sessions are served from storage from now on
        self.sessions.write().await.remove(id);

        tracing::info!(session_id = %id, score = summary.score, "Writing session closed");
        Ok(ExitResponse {
            summary,
            session: view,
        })
    }
}

/// Attempts are written through; a storage failure must not undo grading
async fn persist_attempts(store: &dyn AttemptStore, id: &str, section: WritingSection, remaining: u8) {
    if let Err(e) = store.save_attempts(id, section, remaining).await {
        tracing::error!(session_id = %id, section = %section, error = %e, "Failed to persist attempts");
    }
}

impl From<SubmitRejection> for WritingError {
    fn from(rejection: SubmitRejection) -> Self {
        WritingError::Rejected(rejection)
    }
}
