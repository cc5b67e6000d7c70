//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::{AttemptStore, StateStore, TranscriptStore};
use crate::db::{ActivityRole, StoredActivity, WritingSessionRecord};
use crate::dialog::{Activity, DialogRegistry};
use crate::grading::{FeedbackPayload, GradingError, GradingOracle, SubmissionRequest};
use crate::recognizer::{IntentRecognizer, RecognizerError, RecognizerResult};
use crate::state_machine::{transition, ConversationState, TurnEvent, TurnResult, TurnStatus};
use crate::writing::WritingSection;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock Grading Oracle
// ============================================================================

/// Oracle that answers from a queue and records every request
pub struct MockOracle {
    responses: Mutex<VecDeque<Result<FeedbackPayload, GradingError>>>,
    requests: Mutex<Vec<SubmissionRequest>>,
    delay: Option<Duration>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Hold every answer back, so a submission stays in flight for a while
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_response(&self, response: Result<FeedbackPayload, GradingError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<SubmissionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GradingOracle for MockOracle {
    async fn grade(&self, request: &SubmissionRequest) -> Result<FeedbackPayload, GradingError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GradingError::network("No mock response queued")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Mock Recognizer
// ============================================================================

/// Recognizer that maps fixed phrases to intents
#[derive(Default)]
pub struct MockRecognizer {
    intents: HashMap<String, (String, f64)>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intent(mut self, text: &str, intent: &str, score: f64) -> Self {
        self.intents
            .insert(text.to_lowercase(), (intent.to_string(), score));
        self
    }
}

#[async_trait]
impl IntentRecognizer for MockRecognizer {
    fn is_configured(&self) -> bool {
        true
    }

    async fn recognize(&self, text: &str) -> Result<RecognizerResult, RecognizerError> {
        let (top_intent, score) = match self.intents.get(&text.trim().to_lowercase()) {
            Some((intent, score)) => (Some(intent.clone()), *score),
            None => (None, 0.0),
        };
        Ok(RecognizerResult {
            text: text.to_string(),
            top_intent,
            score,
            entities: Value::Null,
        })
    }
}

// ============================================================================
// In-Memory Storage
// ============================================================================

#[derive(Default)]
struct SessionRow {
    record: Option<WritingSessionRecord>,
    attempts: BTreeMap<WritingSection, i64>,
}

/// In-memory storage for testing
#[derive(Default)]
pub struct InMemoryStorage {
    states: Mutex<HashMap<String, ConversationState>>,
    transcripts: Mutex<HashMap<String, Vec<StoredActivity>>>,
    sessions: Mutex<HashMap<String, SessionRow>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self, conv_id: &str) -> Vec<StoredActivity> {
        self.transcripts
            .lock()
            .unwrap()
            .get(conv_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Texts of one role in a conversation's transcript, in order
    pub fn texts(&self, conv_id: &str, role: ActivityRole) -> Vec<String> {
        self.transcripts
            .lock()
            .unwrap()
            .get(conv_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.role == role)
                    .filter_map(|e| e.activity.text.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl StateStore for InMemoryStorage {
    async fn load_state(&self, conv_id: &str) -> Result<ConversationState, String> {
        Ok(self
            .states
            .lock()
            .unwrap()
            .get(conv_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_state(&self, conv_id: &str, state: &ConversationState) -> Result<(), String> {
        self.states
            .lock()
            .unwrap()
            .insert(conv_id.to_string(), state.clone());
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for InMemoryStorage {
    async fn append_activity(
        &self,
        conv_id: &str,
        activity_id: &str,
        role: ActivityRole,
        activity: &Activity,
    ) -> Result<StoredActivity, String> {
        let mut transcripts = self.transcripts.lock().unwrap();
        let entries = transcripts.entry(conv_id.to_string()).or_default();
        let stored = StoredActivity {
            id: activity_id.to_string(),
            conversation_id: conv_id.to_string(),
            sequence_id: i64::try_from(entries.len()).unwrap_or(i64::MAX) + 1,
            role,
            activity: activity.clone(),
            created_at: Utc::now(),
        };
        entries.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl AttemptStore for InMemoryStorage {
    async fn create_session(
        &self,
        id: &str,
        task_type: &str,
        question_number: u32,
    ) -> Result<WritingSessionRecord, String> {
        let record = WritingSessionRecord {
            id: id.to_string(),
            task_type: task_type.to_string(),
            question_number,
            created_at: Utc::now(),
            closed_at: None,
        };
        self.sessions.lock().unwrap().insert(
            id.to_string(),
            SessionRow {
                record: Some(record.clone()),
                attempts: BTreeMap::new(),
            },
        );
        Ok(record)
    }

    async fn get_session(&self, id: &str) -> Result<Option<WritingSessionRecord>, String> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(id)
            .and_then(|row| row.record.clone()))
    }

    async fn close_session(&self, id: &str) -> Result<(), String> {
        let mut sessions = self.sessions.lock().unwrap();
        let record = sessions
            .get_mut(id)
            .and_then(|row| row.record.as_mut())
            .ok_or_else(|| format!("Writing session not found: {id}"))?;
        record.closed_at = Some(Utc::now());
        Ok(())
    }

    async fn load_attempts(&self, session_id: &str) -> Result<BTreeMap<WritingSection, i64>, String> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|row| row.attempts.clone())
            .unwrap_or_default())
    }

    async fn save_attempts(
        &self,
        session_id: &str,
        section: WritingSection,
        remaining: u8,
    ) -> Result<(), String> {
        self.sessions
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .attempts
            .insert(section, i64::from(remaining));
        Ok(())
    }
}

// ============================================================================
// Test Flow
// ============================================================================

/// Drives the pure transition the way the host does, one user message per turn:
/// continue the stack, and begin the root dialog when nothing was active.
/// Replies queue up and are consumed in order by the `assert_*` helpers.
pub struct TestFlow {
    registry: DialogRegistry,
    root: String,
    state: ConversationState,
    replies: VecDeque<Activity>,
    last_turn: TurnResult,
    next_id: u64,
}

impl TestFlow {
    pub fn new(registry: DialogRegistry, root: &str) -> Self {
        Self {
            registry,
            root: root.to_string(),
            state: ConversationState::new(),
            replies: VecDeque::new(),
            last_turn: TurnResult::empty(),
            next_id: 0,
        }
    }

    pub fn send(&mut self, text: &str) -> &mut Self {
        self.turn(text, None)
    }

    /// Send with a recognizer result attached
    pub fn send_with_intent(&mut self, text: &str, intent: &str, score: f64) -> &mut Self {
        let result = RecognizerResult {
            text: text.to_string(),
            top_intent: Some(intent.to_string()),
            score,
            entities: Value::Null,
        };
        self.turn(text, Some(result))
    }

    fn turn(&mut self, text: &str, intent: Option<RecognizerResult>) -> &mut Self {
        self.next_id += 1;
        let event = TurnEvent::UserMessage {
            activity_id: format!("activity-{}", self.next_id),
            text: text.to_string(),
            intent,
        };
        let mut result = transition(&self.state, &self.registry, event).unwrap();
        if result.turn.status == TurnStatus::Empty {
            let replies: Vec<Activity> = result.activities().cloned().collect();
            self.replies.extend(replies);
            result = transition(
                &result.new_state,
                &self.registry,
                TurnEvent::begin(self.root.clone(), Value::Null),
            )
            .unwrap();
        }
        self.replies.extend(result.activities().cloned());
        self.state = result.new_state;
        self.last_turn = result.turn;
        self
    }

    fn next_reply(&mut self) -> Activity {
        self.replies
            .pop_front()
            .unwrap_or_else(|| panic!("expected a reply, none left"))
    }

    pub fn assert_reply(&mut self, expected: &str) -> &mut Self {
        let reply = self.next_reply();
        assert_eq!(reply.text.as_deref(), Some(expected), "reply: {reply:?}");
        self
    }

    pub fn assert_reply_contains(&mut self, needle: &str) -> &mut Self {
        let reply = self.next_reply();
        let text = reply.text.clone().unwrap_or_default();
        assert!(text.contains(needle), "{text:?} does not contain {needle:?}");
        self
    }

    pub fn assert_card(&mut self) -> &mut Self {
        let reply = self.next_reply();
        assert!(reply.attachment.is_some(), "expected a card, got {reply:?}");
        self
    }

    pub fn assert_no_reply(&mut self) -> &mut Self {
        assert!(self.replies.is_empty(), "unexpected replies: {:?}", self.replies);
        self
    }

    pub fn skip(&mut self, n: usize) -> &mut Self {
        for _ in 0..n {
            self.next_reply();
        }
        self
    }

    /// Drop replies up to, not including, the first one with this text
    pub fn skip_until(&mut self, text: &str) -> &mut Self {
        while self
            .replies
            .front()
            .is_some_and(|r| r.text.as_deref() != Some(text))
        {
            self.replies.pop_front();
        }
        assert!(!self.replies.is_empty(), "no reply {text:?}");
        self
    }

    /// Drain every pending reply
    pub fn replies(&mut self) -> Vec<Activity> {
        self.replies.drain(..).collect()
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn last_turn(&self) -> &TurnResult {
        &self.last_turn
    }

    /// Simulate a frame restored without the prompt it was waiting on
    pub fn clear_pending_prompt(&mut self) {
        if let Some(frame) = self.state.stack.last_mut() {
            frame.pending_prompt = None;
        }
    }
}
