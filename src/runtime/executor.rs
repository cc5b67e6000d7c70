//! Conversation runtime executor

use super::traits::Storage;
use super::{RuntimeError, SseEvent};

use crate::db::{ActivityRole, StoredActivity};
use crate::dialog::{Activity, DialogRegistry};
use crate::recognizer::{IntentRecognizer, RecognizerResult};
use crate::state_machine::{
    transition, ConversationState, Effect, TransitionResult, TurnEvent, TurnStatus,
};
use crate::writing::{route_turn, WritingTrigger};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};

/// One user message waiting for its turn
#[derive(Debug)]
pub struct TurnRequest {
    pub activity_id: String,
    pub text: String,
    pub reply: oneshot::Sender<Result<TurnOutcome, RuntimeError>>,
}

/// Everything a turn produced, returned to the waiting request
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub activity_id: String,
    pub status: TurnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub activities: Vec<StoredActivity>,
    /// Set when this turn asked the client to open the writing editor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writing_trigger: Option<WritingTrigger>,
}

/// Owns one conversation and runs its turns strictly one at a time
pub struct ConversationRuntime<S>
where
    S: Storage + 'static,
{
    conv_id: String,
    root_dialog: String,
    storage: S,
    registry: Arc<DialogRegistry>,
    recognizer: Arc<dyn IntentRecognizer>,
    turn_rx: mpsc::Receiver<TurnRequest>,
    broadcast_tx: broadcast::Sender<SseEvent>,
}

impl<S> ConversationRuntime<S>
where
    S: Storage + 'static,
{
    pub fn new(
        conv_id: impl Into<String>,
        root_dialog: impl Into<String>,
        storage: S,
        registry: Arc<DialogRegistry>,
        recognizer: Arc<dyn IntentRecognizer>,
        turn_rx: mpsc::Receiver<TurnRequest>,
        broadcast_tx: broadcast::Sender<SseEvent>,
    ) -> Self {
        Self {
            conv_id: conv_id.into(),
            root_dialog: root_dialog.into(),
            storage,
            registry,
            recognizer,
            turn_rx,
            broadcast_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(conv_id = %self.conv_id, "Starting conversation runtime");

        while let Some(request) = self.turn_rx.recv().await {
            let TurnRequest {
                activity_id,
                text,
                reply,
            } = request;
            let outcome = self.process_turn(activity_id, &text).await;
            if let Err(e) = &outcome {
                tracing::error!(conv_id = %self.conv_id, error = %e, "Turn failed");
                let _ = self.broadcast_tx.send(SseEvent::Error {
                    message: e.to_string(),
                });
            }
            // The request may have gone away; the turn is committed regardless
            let _ = reply.send(outcome);
        }

        tracing::info!(conv_id = %self.conv_id, "Conversation runtime stopped");
    }

    /// Load, recognize, transition, execute effects, save
    async fn process_turn(
        &self,
        activity_id: String,
        text: &str,
    ) -> Result<TurnOutcome, RuntimeError> {
        let started = Instant::now();

        let inbound = self
            .storage
            .append_activity(&self.conv_id, &activity_id, ActivityRole::User, &Activity::text(text))
            .await
            .map_err(RuntimeError::Storage)?;
        self.broadcast_activity(&inbound);

        let state = self
            .storage
            .load_state(&self.conv_id)
            .await
            .map_err(RuntimeError::Storage)?;
        let intent = self.recognize(text).await;

        let mut result = transition(
            &state,
            &self.registry,
            TurnEvent::UserMessage {
                activity_id: activity_id.clone(),
                text: text.to_string(),
                intent,
            },
        )?;
        let mut sent = self.execute_effects(&result).await?;

        if result.turn.status == TurnStatus::Empty {
            tracing::debug!(conv_id = %self.conv_id, dialog = %self.root_dialog, "Nothing active, beginning root dialog");
            result = transition(
                &result.new_state,
                &self.registry,
                TurnEvent::begin(self.root_dialog.clone(), Value::Null),
            )?;
            sent.extend(self.execute_effects(&result).await?);
        }

        let writing_trigger = route_turn(sent.iter().map(|s| &s.activity));
        let status = result.turn.status;
        let _ = self.broadcast_tx.send(SseEvent::TurnComplete {
            status,
            writing_trigger: writing_trigger.clone(),
        });

        tracing::info!(
            conv_id = %self.conv_id,
            status = ?status,
            dialogs = ?result.new_state.dialog_path(),
            replies = sent.len(),
            duration_ms = started.elapsed().as_millis(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            activity_id,
            status,
            result: result.turn.result,
            activities: sent,
            writing_trigger,
        })
    }

    /// Recognizer failures only cost the intent fallback
    async fn recognize(&self, text: &str) -> Option<RecognizerResult> {
        if !self.recognizer.is_configured() {
            return None;
        }
        match self.recognizer.recognize(text).await {
            Ok(result) => {
                tracing::debug!(conv_id = %self.conv_id, intent = ?result.top_intent, score = result.score, "Recognized");
                Some(result)
            }
            Err(e) => {
                tracing::warn!(conv_id = %self.conv_id, error = %e, "Recognizer failed, continuing without intent");
                None
            }
        }
    }

    async fn execute_effects(
        &self,
        result: &TransitionResult,
    ) -> Result<Vec<StoredActivity>, RuntimeError> {
        let mut sent = Vec::new();
        for effect in &result.effects {
            match effect {
                Effect::SendActivity(activity) => {
                    let id = uuid::Uuid::new_v4().to_string();
                    let stored = self
                        .storage
                        .append_activity(&self.conv_id, &id, ActivityRole::Bot, activity)
                        .await
                        .map_err(RuntimeError::Storage)?;
                    self.broadcast_activity(&stored);
                    sent.push(stored);
                }
                Effect::PersistState => {
                    self.save(&result.new_state).await?;
                }
            }
        }
        Ok(sent)
    }

    async fn save(&self, state: &ConversationState) -> Result<(), RuntimeError> {
        self.storage
            .save_state(&self.conv_id, state)
            .await
            .map_err(RuntimeError::Storage)
    }

    fn broadcast_activity(&self, activity: &StoredActivity) {
        match serde_json::to_value(activity) {
            Ok(json) => {
                let _ = self.broadcast_tx.send(SseEvent::Activity { activity: json });
            }
            Err(e) => {
                tracing::warn!(conv_id = %self.conv_id, error = %e, "Activity not serializable, not broadcast");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot;
    use crate::recognizer::UnconfiguredRecognizer;
    use crate::runtime::testing::{InMemoryStorage, MockRecognizer};
    use crate::runtime::StateStore;
    use crate::writing::WritingSection;

    struct Harness {
        storage: Arc<InMemoryStorage>,
        turn_tx: mpsc::Sender<TurnRequest>,
        broadcast_rx: broadcast::Receiver<SseEvent>,
    }

    fn start(root: &str, recognizer: Arc<dyn IntentRecognizer>) -> Harness {
        let storage = Arc::new(InMemoryStorage::new());
        let (turn_tx, turn_rx) = mpsc::channel(8);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(64);
        let runtime = ConversationRuntime::new(
            "conv-1",
            root,
            storage.clone(),
            Arc::new(bot::registry().unwrap()),
            recognizer,
            turn_rx,
            broadcast_tx,
        );
        tokio::spawn(runtime.run());
        Harness {
            storage,
            turn_tx,
            broadcast_rx,
        }
    }

    impl Harness {
        async fn say(&self, text: &str) -> TurnOutcome {
            let (reply, rx) = oneshot::channel();
            self.turn_tx
                .send(TurnRequest {
                    activity_id: uuid::Uuid::new_v4().to_string(),
                    text: text.to_string(),
                    reply,
                })
                .await
                .unwrap();
            rx.await.unwrap().unwrap()
        }
    }

    fn texts(outcome: &TurnOutcome) -> Vec<String> {
        outcome
            .activities
            .iter()
            .filter_map(|a| a.activity.text.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_first_message_begins_root_dialog() {
        let harness = start(bot::HELLO_CHAIN, Arc::new(UnconfiguredRecognizer));

        let first = harness.say("start").await;
        assert_eq!(first.status, TurnStatus::Waiting);
        assert_eq!(texts(&first), vec!["Say something!"]);

        let second = harness.say("hello").await;
        assert_eq!(second.status, TurnStatus::Completed);
        assert_eq!(texts(&second), vec!["You said Hi!"]);

        let transcript = harness.storage.transcript("conv-1");
        let roles: Vec<ActivityRole> = transcript.iter().map(|a| a.role).collect();
        assert_eq!(
            roles,
            vec![ActivityRole::User, ActivityRole::Bot, ActivityRole::User, ActivityRole::Bot]
        );
    }

    #[tokio::test]
    async fn test_state_persisted_with_last_activity_id() {
        let harness = start(bot::HELLO_CHAIN, Arc::new(UnconfiguredRecognizer));
        let outcome = harness.say("start").await;

        let state = harness.storage.load_state("conv-1").await.unwrap();
        assert_eq!(state.dialog_path(), vec![bot::HELLO_CHAIN]);
        assert_eq!(state.last_activity_id, Some(outcome.activity_id));
        assert!(state.is_waiting());
    }

    #[tokio::test]
    async fn test_recognized_intent_reaches_choice_prompt() {
        let recognizer = MockRecognizer::new().with_intent("I want to practise", "WritingExercise", 0.8);
        let harness = start(bot::MAIN, Arc::new(recognizer));

        harness.say("start").await;
        let outcome = harness.say("I want to practise").await;
        assert!(outcome.activities[0].activity.attachment.is_some());
        assert_eq!(
            texts(&outcome),
            vec!["Which section would you like to write?"]
        );
    }

    #[tokio::test]
    async fn test_section_prompt_reports_writing_trigger() {
        let harness = start(bot::EXERCISE, Arc::new(UnconfiguredRecognizer));
        harness.say("start").await;

        let outcome = harness.say("Conclusion").await;
        let trigger = outcome.writing_trigger.unwrap();
        assert_eq!(trigger.section, Some(WritingSection::Conclusion));
        assert!(trigger.structured);
    }

    #[tokio::test]
    async fn test_turn_broadcasts_activities_then_completion() {
        let mut harness = start(bot::HELLO_CHAIN, Arc::new(UnconfiguredRecognizer));
        harness.say("start").await;

        let mut kinds = Vec::new();
        while let Ok(event) = harness.broadcast_rx.try_recv() {
            kinds.push(match event {
                SseEvent::Activity { .. } => "activity",
                SseEvent::TurnComplete { .. } => "turn_complete",
                SseEvent::Init { .. } => "init",
                SseEvent::Error { .. } => "error",
            });
        }
        assert_eq!(kinds, vec!["activity", "activity", "turn_complete"]);
    }
}
