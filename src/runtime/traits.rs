//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor and the writing service with
//! mock implementations.

use crate::db::{ActivityRole, Database, StoredActivity, WritingSessionRecord};
use crate::dialog::Activity;
use crate::state_machine::ConversationState;
use crate::writing::WritingSection;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Storage for conversation state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the state persisted after the previous turn
    async fn load_state(&self, conv_id: &str) -> Result<ConversationState, String>;

    /// Persist the state after a turn
    async fn save_state(&self, conv_id: &str, state: &ConversationState) -> Result<(), String>;
}

/// Storage for conversation transcripts
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append_activity(
        &self,
        conv_id: &str,
        activity_id: &str,
        role: ActivityRole,
        activity: &Activity,
    ) -> Result<StoredActivity, String>;
}

/// Storage for writing sessions and their attempt budgets
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn create_session(
        &self,
        id: &str,
        task_type: &str,
        question_number: u32,
    ) -> Result<WritingSessionRecord, String>;

    /// `Ok(None)` when the session does not exist
    async fn get_session(&self, id: &str) -> Result<Option<WritingSessionRecord>, String>;

    async fn close_session(&self, id: &str) -> Result<(), String>;

    async fn load_attempts(&self, session_id: &str) -> Result<BTreeMap<WritingSection, i64>, String>;

    async fn save_attempts(
        &self,
        session_id: &str,
        section: WritingSection,
        remaining: u8,
    ) -> Result<(), String>;
}

/// Combined storage trait for convenience
pub trait Storage: StateStore + TranscriptStore {}
impl<T: StateStore + TranscriptStore> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    async fn load_state(&self, conv_id: &str) -> Result<ConversationState, String> {
        (**self).load_state(conv_id).await
    }

    async fn save_state(&self, conv_id: &str, state: &ConversationState) -> Result<(), String> {
        (**self).save_state(conv_id, state).await
    }
}

#[async_trait]
impl<T: TranscriptStore + ?Sized> TranscriptStore for Arc<T> {
    async fn append_activity(
        &self,
        conv_id: &str,
        activity_id: &str,
        role: ActivityRole,
        activity: &Activity,
    ) -> Result<StoredActivity, String> {
        (**self)
            .append_activity(conv_id, activity_id, role, activity)
            .await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StateStore for DatabaseStorage {
    async fn load_state(&self, conv_id: &str) -> Result<ConversationState, String> {
        let conv = self.db.get_conversation(conv_id).map_err(|e| e.to_string())?;
        Ok(conv.state)
    }

    async fn save_state(&self, conv_id: &str, state: &ConversationState) -> Result<(), String> {
        self.db
            .update_conversation_state(conv_id, state)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl TranscriptStore for DatabaseStorage {
    async fn append_activity(
        &self,
        conv_id: &str,
        activity_id: &str,
        role: ActivityRole,
        activity: &Activity,
    ) -> Result<StoredActivity, String> {
        self.db
            .add_activity(activity_id, conv_id, role, activity)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl AttemptStore for DatabaseStorage {
    async fn create_session(
        &self,
        id: &str,
        task_type: &str,
        question_number: u32,
    ) -> Result<WritingSessionRecord, String> {
        self.db
            .create_writing_session(id, task_type, question_number)
            .map_err(|e| e.to_string())
    }

    async fn get_session(&self, id: &str) -> Result<Option<WritingSessionRecord>, String> {
        match self.db.get_writing_session(id) {
            Ok(session) => Ok(Some(session)),
            Err(crate::db::DbError::SessionNotFound(_)) => Ok(None),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn close_session(&self, id: &str) -> Result<(), String> {
        self.db.close_writing_session(id).map_err(|e| e.to_string())
    }

    async fn load_attempts(&self, session_id: &str) -> Result<BTreeMap<WritingSection, i64>, String> {
        self.db.load_attempts(session_id).map_err(|e| e.to_string())
    }

    async fn save_attempts(
        &self,
        session_id: &str,
        section: WritingSection,
        remaining: u8,
    ) -> Result<(), String> {
        self.db
            .save_attempts(session_id, section, remaining)
            .map_err(|e| e.to_string())
    }
}
