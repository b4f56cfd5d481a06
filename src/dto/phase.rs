use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::GamePhase;

/// Publicly visible game phase exposed to REST clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleGamePhase {
    /// No round was played yet.
    Idle,
    /// A question is open.
    Active,
    /// Answers of the current question are revealed.
    Revealing,
    /// The last round is over.
    Finished,
}

impl From<&GamePhase> for VisibleGamePhase {
    fn from(value: &GamePhase) -> Self {
        match value {
            GamePhase::Idle => VisibleGamePhase::Idle,
            GamePhase::Active { .. } => VisibleGamePhase::Active,
            GamePhase::Revealing { .. } => VisibleGamePhase::Revealing,
            GamePhase::Finished => VisibleGamePhase::Finished,
        }
    }
}
