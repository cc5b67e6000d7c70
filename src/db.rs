//! Database module for English Ready
//!
//! Provides persistence for conversations, their transcripts, writing
//! sessions and per-section attempt budgets.

mod schema;

pub use schema::*;

use crate::dialog::{Activity, ChannelSignal};
use crate::state_machine::ConversationState;
use crate::writing::WritingSection;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
    #[error("Writing session not found: {0}")]
    SessionNotFound(String),
    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Conversation Operations ====================

    /// Create a new conversation with an empty dialog stack
    pub fn create_conversation(&self, id: &str) -> DbResult<Conversation> {
        let conn = self.lock()?;
        let now = Utc::now();
        let state = ConversationState::new();

        conn.execute(
            "INSERT INTO conversations (id, state, last_activity_id, created_at, updated_at)
             VALUES (?1, ?2, NULL, ?3, ?3)",
            params![id, serde_json::to_string(&state)?, now.to_rfc3339()],
        )?;

        Ok(Conversation {
            id: id.to_string(),
            state,
            last_activity_id: None,
            created_at: now,
            updated_at: now,
            activity_count: 0,
        })
    }

    /// Get conversation by ID
    pub fn get_conversation(&self, id: &str) -> DbResult<Conversation> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.state, c.last_activity_id, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM activities a WHERE a.conversation_id = c.id) as activity_count
             FROM conversations c WHERE c.id = ?1",
        )?;

        stmt.query_row(params![id], parse_conversation_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::ConversationNotFound(id.to_string()),
                other => DbError::Sqlite(other),
            })
    }

    /// List conversations, most recently active first
    pub fn list_conversations(&self) -> DbResult<Vec<Conversation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.state, c.last_activity_id, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM activities a WHERE a.conversation_id = c.id) as activity_count
             FROM conversations c ORDER BY c.updated_at DESC",
        )?;

        let rows = stmt.query_map([], parse_conversation_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Persist the dialog stack after a turn
    pub fn update_conversation_state(&self, id: &str, state: &ConversationState) -> DbResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE conversations SET state = ?1, last_activity_id = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                serde_json::to_string(state)?,
                state.last_activity_id,
                Utc::now().to_rfc3339(),
                id
            ],
        )?;
        if updated == 0 {
            return Err(DbError::ConversationNotFound(id.to_string()));
        }
        Ok(())
    }

    // ==================== Activity Operations ====================

    /// Append an activity to a conversation's transcript
    pub fn add_activity(
        &self,
        activity_id: &str,
        conversation_id: &str,
        role: ActivityRole,
        activity: &Activity,
    ) -> DbResult<StoredActivity> {
        let conn = self.lock()?;
        let now = Utc::now();

        let sequence_id: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sequence_id), 0) + 1 FROM activities WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )?;

        let attachment = activity
            .attachment
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let channel_data = activity
            .channel_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            "INSERT INTO activities (id, conversation_id, sequence_id, role, text, attachment, channel_data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                activity_id,
                conversation_id,
                sequence_id,
                role.to_string(),
                activity.text,
                attachment,
                channel_data,
                now.to_rfc3339(),
            ],
        )?;

        conn.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), conversation_id],
        )?;

        Ok(StoredActivity {
            id: activity_id.to_string(),
            conversation_id: conversation_id.to_string(),
            sequence_id,
            role,
            activity: activity.clone(),
            created_at: now,
        })
    }

    /// Full transcript in order
    pub fn get_activities(&self, conversation_id: &str) -> DbResult<Vec<StoredActivity>> {
        self.get_activities_after(conversation_id, 0)
    }

    /// Transcript entries after a sequence ID
    pub fn get_activities_after(
        &self,
        conversation_id: &str,
        after_sequence: i64,
    ) -> DbResult<Vec<StoredActivity>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, sequence_id, role, text, attachment, channel_data, created_at
             FROM activities WHERE conversation_id = ?1 AND sequence_id > ?2 ORDER BY sequence_id ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id, after_sequence], parse_activity_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    // ==================== Writing Session Operations ====================

    pub fn create_writing_session(
        &self,
        id: &str,
        task_type: &str,
        question_number: u32,
    ) -> DbResult<WritingSessionRecord> {
        let conn = self.lock()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO writing_sessions (id, task_type, question_number, created_at, closed_at)
             VALUES (?1, ?2, ?3, ?4, NULL)",
            params![id, task_type, question_number, now.to_rfc3339()],
        )?;
        Ok(WritingSessionRecord {
            id: id.to_string(),
            task_type: task_type.to_string(),
            question_number,
            created_at: now,
            closed_at: None,
        })
    }

    pub fn get_writing_session(&self, id: &str) -> DbResult<WritingSessionRecord> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, task_type, question_number, created_at, closed_at
             FROM writing_sessions WHERE id = ?1",
            params![id],
            |row| {
                Ok(WritingSessionRecord {
                    id: row.get(0)?,
                    task_type: row.get(1)?,
                    question_number: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                    closed_at: row
                        .get::<_, Option<String>>(4)?
                        .map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()?
        .ok_or_else(|| DbError::SessionNotFound(id.to_string()))
    }

    pub fn close_writing_session(&self, id: &str) -> DbResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE writing_sessions SET closed_at = COALESCE(closed_at, ?1) WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        if updated == 0 {
            return Err(DbError::SessionNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Persisted attempt counts; sections never written are absent
    pub fn load_attempts(&self, session_id: &str) -> DbResult<BTreeMap<WritingSection, i64>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT section, remaining FROM section_attempts WHERE session_id = ?1")?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut attempts = BTreeMap::new();
        for row in rows {
            let (section, remaining) = row?;
            match section.parse::<WritingSection>() {
                Ok(section) => {
                    attempts.insert(section, remaining);
                }
                Err(e) => tracing::warn!(session_id = %session_id, error = %e, "Skipping stored attempts row"),
            }
        }
        Ok(attempts)
    }

    /// Last write wins
    pub fn save_attempts(&self, session_id: &str, section: WritingSection, remaining: u8) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO section_attempts (session_id, section, remaining, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_id, section) DO UPDATE SET remaining = excluded.remaining, updated_at = excluded.updated_at",
            params![session_id, section.key(), remaining, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

fn parse_conversation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let state_json: String = row.get(1)?;
    let state: ConversationState = serde_json::from_str(&state_json).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Unreadable conversation state, starting from an empty stack");
        ConversationState::default()
    });
    Ok(Conversation {
        id: row.get(0)?,
        state,
        last_activity_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
        activity_count: row.get(5)?,
    })
}

fn parse_activity_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredActivity> {
    let role = match row.get::<_, String>(3)?.as_str() {
        "user" => ActivityRole::User,
        _ => ActivityRole::Bot,
    };
    Ok(StoredActivity {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sequence_id: row.get(2)?,
        role,
        activity: Activity {
            text: row.get(4)?,
            attachment: row
                .get::<_, Option<String>>(5)?
                .and_then(|s| serde_json::from_str(&s).ok()),
            channel_data: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| serde_json::from_str::<ChannelSignal>(&s).ok()),
        },
        created_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
