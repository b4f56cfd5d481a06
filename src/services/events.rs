use tracing::warn;

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    error::ServiceError,
    services::{
        game_service, room_service,
        signaling::{self, SignalKind},
    },
    state::{ParticipantId, SharedState},
};

/// Route a parsed client message to its handler.
///
/// Failures are reported to the sender only; they never close the connection.
pub async fn dispatch(state: &SharedState, participant: ParticipantId, message: ClientMessage) {
    let kind = message.kind();
    let result = match message {
        ClientMessage::CreateRoom(request) => {
            room_service::create_room(state, participant, &request.room_key).await
        }
        ClientMessage::JoinRoom(request) => {
            room_service::join_room(state, participant, &request.room_key).await
        }
        ClientMessage::LeaveRoom => room_service::leave_room(state, participant).await,
        ClientMessage::Offer(signal) => {
            signaling::relay(state, participant, SignalKind::Offer, signal).await
        }
        ClientMessage::Answer(signal) => {
            signaling::relay(state, participant, SignalKind::Answer, signal).await
        }
        ClientMessage::IceCandidate(signal) => {
            signaling::relay(state, participant, SignalKind::IceCandidate, signal).await
        }
        ClientMessage::DataMessage(signal) => {
            signaling::relay(state, participant, SignalKind::Data, signal).await
        }
        ClientMessage::EndCall => room_service::end_call(state, participant).await,
        ClientMessage::StartGame { questions } => game_service::plan_start(state, participant)
            .await
            .map(|pending| {
                // The supplier may take a while; keep this connection's other frames flowing.
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(err) = game_service::finish_start(&state, pending, questions).await {
                        report_error(&state, participant, "start-game", &err);
                    }
                });
            }),
        ClientMessage::SubmitAnswer { answer } => {
            game_service::submit_answer(state, participant, answer).await
        }
        ClientMessage::NextQuestion => game_service::next_question(state, participant).await,
    };

    if let Err(err) = result {
        report_error(state, participant, kind, &err);
    }
}

/// Log a failed request and tell the requesting participant about it.
pub fn report_error(
    state: &SharedState,
    participant: ParticipantId,
    kind: &str,
    err: &ServiceError,
) {
    warn!(%participant, kind, error = %err, "request rejected");
    state.notify(
        &participant,
        &ServerMessage::RoomError {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    );
}
