use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::rooms::{RoomSummary, RoomsResponse},
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Read-only room inspection endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/rooms/{room_key}", get(get_room))
}

#[utoipa::path(
    get,
    path = "/rooms",
    tag = "rooms",
    responses((status = 200, description = "Registered rooms", body = RoomsResponse))
)]
/// List every registered room with its members and game phase.
pub async fn list_rooms(State(state): State<SharedState>) -> Json<RoomsResponse> {
    Json(room_service::list_rooms(&state).await)
}

#[utoipa::path(
    get,
    path = "/rooms/{room_key}",
    tag = "rooms",
    params(("room_key" = String, Path, description = "Room key")),
    responses(
        (status = 200, description = "Room details", body = RoomSummary),
        (status = 404, description = "Unknown room")
    )
)]
/// Return one room.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(room_key): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    let summary = room_service::get_room(&state, &room_key).await?;
    Ok(Json(summary))
}
