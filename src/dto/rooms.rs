use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::{format_system_time, phase::VisibleGamePhase},
    state::room::Room,
};

/// Debug projection of a room exposed by the `/rooms` routes.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    /// Key clients join with.
    pub room_key: String,
    /// Member identifiers in join order.
    pub participants: Vec<String>,
    /// Phase of the room's game.
    pub phase: VisibleGamePhase,
    /// Index of the question in flight, when a round is running.
    pub current_question_index: Option<usize>,
    /// Whether a game start is waiting on the question supplier.
    pub start_pending: bool,
    /// Creation time, RFC 3339.
    pub created_at: String,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        let snapshot = room.game().snapshot();
        Self {
            room_key: room.key().to_string(),
            participants: room.participants().map(ToString::to_string).collect(),
            phase: VisibleGamePhase::from(&snapshot.phase),
            current_question_index: snapshot.phase.question_index(),
            start_pending: snapshot.pending.is_some(),
            created_at: format_system_time(room.created_at()),
        }
    }
}

/// Response of `GET /rooms`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomsResponse {
    /// Open rooms sorted by key.
    pub rooms: Vec<RoomSummary>,
}
