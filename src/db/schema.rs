//! Database schema and types

use crate::dialog::Activity;
use crate::state_machine::ConversationState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    state TEXT NOT NULL DEFAULT '{"stack":[]}',
    last_activity_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_updated ON conversations(updated_at DESC);

CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    role TEXT NOT NULL,
    text TEXT,
    attachment TEXT,
    channel_data TEXT,
    created_at TEXT NOT NULL,

    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_activities_conversation ON activities(conversation_id, sequence_id);

CREATE TABLE IF NOT EXISTS writing_sessions (
    id TEXT PRIMARY KEY,
    task_type TEXT NOT NULL,
    question_number INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    closed_at TEXT
);

CREATE TABLE IF NOT EXISTS section_attempts (
    session_id TEXT NOT NULL,
    section TEXT NOT NULL,
    remaining INTEGER NOT NULL,
    updated_at TEXT NOT NULL,

    PRIMARY KEY (session_id, section),
    FOREIGN KEY (session_id) REFERENCES writing_sessions(id) ON DELETE CASCADE
);
"#;

/// Conversation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub state: ConversationState,
    pub last_activity_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub activity_count: i64,
}

/// Who an activity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityRole {
    User,
    Bot,
}

impl fmt::Display for ActivityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityRole::User => write!(f, "user"),
            ActivityRole::Bot => write!(f, "bot"),
        }
    }
}

/// A transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredActivity {
    pub id: String,
    pub conversation_id: String,
    pub sequence_id: i64,
    pub role: ActivityRole,
    #[serde(flatten)]
    pub activity: Activity,
    pub created_at: DateTime<Utc>,
}

/// A writing session and its exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritingSessionRecord {
    pub id: String,
    pub task_type: String,
    pub question_number: u32,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl WritingSessionRecord {
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}
