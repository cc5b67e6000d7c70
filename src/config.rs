//! Process configuration from the environment

use crate::grading::GradeScale;
use crate::recognizer::LuisSettings;
use crate::writing::AttemptPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Bot Framework host port; the grading oracle owns 8000
pub const DEFAULT_PORT: u16 = 3978;
pub const DEFAULT_ROOT_DIALOG: &str = "main";
pub const DEFAULT_ORACLE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_GRADING_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub root_dialog: String,
    pub oracle_url: String,
    pub grading_timeout: Duration,
    pub grade_scale: GradeScale,
    pub attempt_policy: AttemptPolicy,
    /// `None` unless app id, key and host are all set
    pub luis: Option<LuisSettings>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = get("ENGLISH_READY_DB_PATH").map_or_else(
            || {
                let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.english-ready/english_ready.db"))
            },
            PathBuf::from,
        );

        Self {
            db_path,
            port: parsed(&get, "ENGLISH_READY_PORT").unwrap_or(DEFAULT_PORT),
            root_dialog: get("ENGLISH_READY_ROOT_DIALOG")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ROOT_DIALOG.to_string()),
            oracle_url: get("GRADING_ORACLE_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ORACLE_URL.to_string()),
            grading_timeout: parsed::<u64>(&get, "GRADING_TIMEOUT_SECS")
                .map_or(DEFAULT_GRADING_TIMEOUT, Duration::from_secs),
            grade_scale: parsed(&get, "GRADING_SCALE").unwrap_or_default(),
            attempt_policy: parsed(&get, "ENGLISH_READY_ATTEMPT_POLICY").unwrap_or_default(),
            luis: LuisSettings::from_parts(
                get("LUIS_APP_ID"),
                get("LUIS_API_KEY"),
                get("LUIS_API_HOST_NAME"),
            ),
        }
    }
}

fn parsed<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring invalid setting");
            None
        }
    }
}
