//! Runtime for executing conversations
//!
//! One actor task per conversation serializes its turns; different
//! conversations run concurrently. Each turn loads the persisted dialog
//! stack, runs the pure transition and saves the result before the next
//! message is taken.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{ConversationRuntime, TurnOutcome, TurnRequest};
pub use traits::*;

use crate::db::{Conversation, Database, DbError};
use crate::dialog::DialogRegistry;
use crate::recognizer::IntentRecognizer;
use crate::state_machine::{TransitionError, TurnStatus};
use crate::writing::WritingTrigger;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Conversation not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Conversation runtime stopped: {0}")]
    Stopped(String),
}

impl From<DbError> for RuntimeError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::ConversationNotFound(id) => RuntimeError::NotFound(id),
            other => RuntimeError::Storage(other.to_string()),
        }
    }
}

/// Handle to interact with a running conversation
#[derive(Clone)]
pub struct ConversationHandle {
    pub turn_tx: mpsc::Sender<TurnRequest>,
    pub broadcast_tx: broadcast::Sender<SseEvent>,
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init {
        conversation: serde_json::Value,
        activities: Vec<serde_json::Value>,
        last_sequence_id: i64,
    },
    Activity {
        activity: serde_json::Value,
    },
    TurnComplete {
        status: TurnStatus,
        writing_trigger: Option<WritingTrigger>,
    },
    Error {
        message: String,
    },
}

/// Manager for all conversation runtimes
pub struct RuntimeManager {
    db: Database,
    registry: Arc<DialogRegistry>,
    recognizer: Arc<dyn IntentRecognizer>,
    root_dialog: String,
    runtimes: RwLock<HashMap<String, ConversationHandle>>,
}

impl RuntimeManager {
    pub fn new(
        db: Database,
        registry: Arc<DialogRegistry>,
        recognizer: Arc<dyn IntentRecognizer>,
        root_dialog: impl Into<String>,
    ) -> Self {
        Self {
            db,
            registry,
            recognizer,
            root_dialog: root_dialog.into(),
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn create_conversation(&self) -> Result<Conversation, RuntimeError> {
        let id = uuid::Uuid::new_v4().to_string();
        let conversation = self.db.create_conversation(&id)?;
        tracing::info!(conv_id = %id, root = %self.root_dialog, "Conversation created");
        Ok(conversation)
    }

    /// Get or create a runtime for a conversation
    pub async fn get_or_create(&self, conversation_id: &str) -> Result<ConversationHandle, RuntimeError> {
        if let Some(handle) = self.runtimes.read().await.get(conversation_id) {
            return Ok(handle.clone());
        }

        // Fails with NotFound for unknown ids
        self.db.get_conversation(conversation_id)?;

        let mut runtimes = self.runtimes.write().await;
        // Another request may have started it meanwhile
        if let Some(handle) = runtimes.get(conversation_id) {
            return Ok(handle.clone());
        }

        let (turn_tx, turn_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);

        let runtime = ConversationRuntime::new(
            conversation_id,
            self.root_dialog.clone(),
            DatabaseStorage::new(self.db.clone()),
            Arc::clone(&self.registry),
            Arc::clone(&self.recognizer),
            turn_rx,
            broadcast_tx.clone(),
        );

        let conv_id = conversation_id.to_string();
        tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(conv_id = %conv_id, "Conversation runtime finished");
        });

        let handle = ConversationHandle {
            turn_tx,
            broadcast_tx,
        };
        runtimes.insert(conversation_id.to_string(), handle.clone());
        Ok(handle)
    }

    /// Run one turn for a user message and wait for its outcome
    pub async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<TurnOutcome, RuntimeError> {
        let handle = self.get_or_create(conversation_id).await?;
        let (reply, rx) = oneshot::channel();
        handle
            .turn_tx
            .send(TurnRequest {
                activity_id: uuid::Uuid::new_v4().to_string(),
                text: text.to_string(),
                reply,
            })
            .await
            .map_err(|_| RuntimeError::Stopped(conversation_id.to_string()))?;
        rx.await
            .map_err(|_| RuntimeError::Stopped(conversation_id.to_string()))?
    }

    /// Snapshot for a new SSE client plus the live feed after it
    pub async fn subscribe(
        &self,
        conversation_id: &str,
    ) -> Result<(SseEvent, broadcast::Receiver<SseEvent>), RuntimeError> {
        let handle = self.get_or_create(conversation_id).await?;
        // Subscribe before reading so nothing falls between snapshot and feed
        let rx = handle.broadcast_tx.subscribe();

        let conversation = self.db.get_conversation(conversation_id)?;
        let activities = self.db.get_activities(conversation_id)?;
        let last_sequence_id = activities.last().map_or(0, |a| a.sequence_id);
        let init = SseEvent::Init {
            conversation: serde_json::to_value(&conversation)
                .map_err(|e| RuntimeError::Storage(e.to_string()))?,
            activities: activities
                .iter()
                .filter_map(|a| serde_json::to_value(a).ok())
                .collect(),
            last_sequence_id,
        };
        Ok((init, rx))
    }
}
