use tracing::{debug, info};

use crate::{
    dto::rooms::{RoomSummary, RoomsResponse},
    error::ServiceError,
    state::{ParticipantId, SharedState},
};

/// Create a fresh room and join its creator.
pub async fn create_room(
    state: &SharedState,
    participant: ParticipantId,
    room_key: &str,
) -> Result<(), ServiceError> {
    state
        .update_rooms(|registry| Ok(registry.create(room_key, participant)?.outbound))
        .await
}

/// Join a room, leaving the current one first.
pub async fn join_room(
    state: &SharedState,
    participant: ParticipantId,
    room_key: &str,
) -> Result<(), ServiceError> {
    state
        .update_rooms(|registry| {
            let outcome = registry.join(room_key, participant)?;
            if !outcome.joined_as_new {
                debug!(room = %room_key, %participant, "participant rejoined its room");
            }
            Ok(outcome.outbound)
        })
        .await
}

/// Leave the current room while keeping the connection open.
pub async fn leave_room(state: &SharedState, participant: ParticipantId) -> Result<(), ServiceError> {
    state
        .update_rooms(|registry| match registry.leave(participant) {
            Err(ServiceError::UnknownParticipant(_)) => Err(ServiceError::NotInRoom),
            other => other,
        })
        .await
}

/// Tell the other members the call was hung up.
pub async fn end_call(state: &SharedState, participant: ParticipantId) -> Result<(), ServiceError> {
    state
        .update_rooms(|registry| registry.end_call(&participant))
        .await
}

/// Forget a closed connection and remove its participant from its room.
pub async fn disconnect(state: &SharedState, participant: ParticipantId) {
    state.connections().remove(&participant);
    let result = state
        .update_rooms(|registry| match registry.leave(participant) {
            Err(ServiceError::UnknownParticipant(_)) => Ok(Vec::new()),
            other => other,
        })
        .await;

    if let Err(err) = result {
        info!(%participant, error = %err, "cleanup after disconnect failed");
    }
}

/// Summaries of every registered room, sorted by key.
pub async fn list_rooms(state: &SharedState) -> RoomsResponse {
    let mut rooms = state
        .read_rooms(|registry| registry.rooms().map(RoomSummary::from).collect::<Vec<_>>())
        .await;
    rooms.sort_by(|a, b| a.room_key.cmp(&b.room_key));
    RoomsResponse { rooms }
}

/// Summary of one room.
pub async fn get_room(state: &SharedState, room_key: &str) -> Result<RoomSummary, ServiceError> {
    state
        .read_rooms(|registry| registry.get(room_key).map(RoomSummary::from))
        .await
        .ok_or_else(|| ServiceError::RoomNotFound(room_key.to_string()))
}
