//! Application-level configuration loading: room policy and question source.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{dao::questions::Difficulty, state::registry::RoomPolicy};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_RELAY_CONFIG_PATH";
/// Public Open Trivia DB endpoint.
const DEFAULT_OPEN_TRIVIA_URL: &str = "https://opentdb.com";

const DEFAULT_MAX_PARTICIPANTS: usize = 2;
const DEFAULT_QUESTION_COUNT: usize = 5;
const DEFAULT_SUPPLIER_TIMEOUT_MS: u64 = 5_000;

/// Where round questions come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionSourceConfig {
    /// Open Trivia DB HTTP API.
    OpenTrivia {
        #[serde(default = "default_open_trivia_url")]
        base_url: String,
    },
    /// Question bank compiled into the binary.
    Builtin,
}

impl Default for QuestionSourceConfig {
    fn default() -> Self {
        if cfg!(feature = "open-trivia") {
            QuestionSourceConfig::OpenTrivia {
                base_url: default_open_trivia_url(),
            }
        } else {
            QuestionSourceConfig::Builtin
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Member cap per room, `None` for uncapped call-only rooms.
    pub max_participants: Option<usize>,
    /// Whether `join-room` creates unknown rooms.
    pub auto_create_rooms: bool,
    /// Questions per round.
    pub question_count: usize,
    /// Difficulty requested from the supplier.
    pub difficulty: Difficulty,
    /// Upper bound for obtaining a round's questions.
    pub supplier_timeout: Duration,
    /// Whether `start-game` may carry client-fetched questions.
    pub accept_client_questions: bool,
    /// Selected question supplier.
    pub question_source: QuestionSourceConfig,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        max_participants = ?app_config.max_participants,
                        question_count = app_config.question_count,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON configuration document; absent keys take their default.
    pub fn from_json_str(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Membership rules for the room registry.
    pub fn room_policy(&self) -> RoomPolicy {
        RoomPolicy {
            max_participants: self.max_participants,
            auto_create: self.auto_create_rooms,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    max_participants: Option<usize>,
    auto_create_rooms: bool,
    question_count: usize,
    difficulty: Difficulty,
    supplier_timeout_ms: u64,
    accept_client_questions: bool,
    question_source: QuestionSourceConfig,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            max_participants: Some(DEFAULT_MAX_PARTICIPANTS),
            auto_create_rooms: true,
            question_count: DEFAULT_QUESTION_COUNT,
            difficulty: Difficulty::default(),
            supplier_timeout_ms: DEFAULT_SUPPLIER_TIMEOUT_MS,
            accept_client_questions: false,
            question_source: QuestionSourceConfig::default(),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            // A zero cap would make every room unjoinable.
            max_participants: value.max_participants.map(|cap| cap.max(1)),
            auto_create_rooms: value.auto_create_rooms,
            question_count: value.question_count.max(1),
            difficulty: value.difficulty,
            supplier_timeout: Duration::from_millis(value.supplier_timeout_ms),
            accept_client_questions: value.accept_client_questions,
            question_source: value.question_source,
        }
    }
}

fn default_open_trivia_url() -> String {
    DEFAULT_OPEN_TRIVIA_URL.to_string()
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config.max_participants, Some(2));
        assert!(config.auto_create_rooms);
        assert_eq!(config.question_count, 5);
        assert_eq!(config.supplier_timeout, Duration::from_secs(5));
        assert!(!config.accept_client_questions);
    }

    #[test]
    fn null_cap_means_uncapped() {
        let config = AppConfig::from_json_str(r#"{"max_participants":null}"#).unwrap();
        assert_eq!(config.room_policy().max_participants, None);
    }

    #[test]
    fn parses_builtin_source_and_difficulty() {
        let config = AppConfig::from_json_str(
            r#"{"difficulty":"medium","question_source":{"kind":"builtin"},"auto_create_rooms":false}"#,
        )
        .unwrap();
        assert_eq!(config.difficulty, Difficulty::Medium);
        assert_eq!(config.question_source, QuestionSourceConfig::Builtin);
        assert!(!config.room_policy().auto_create);
    }

    #[test]
    fn open_trivia_source_defaults_base_url() {
        let config =
            AppConfig::from_json_str(r#"{"question_source":{"kind":"open_trivia"}}"#).unwrap();
        assert_eq!(
            config.question_source,
            QuestionSourceConfig::OpenTrivia {
                base_url: "https://opentdb.com".into()
            }
        );
    }
}
