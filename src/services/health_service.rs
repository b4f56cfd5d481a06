use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the current room and connection counts.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let rooms = state.read_rooms(|registry| registry.len()).await;
    HealthResponse::ok(rooms, state.connections().len())
}
