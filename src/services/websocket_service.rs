use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    services::{events, room_service},
    state::{ParticipantConnection, ParticipantId, SharedState},
};

/// The writer task is gone; the connection should be terminated.
#[derive(Debug, Error)]
#[error("connection closed")]
pub struct ConnectionClosed;

/// Handle the full lifecycle for an individual participant WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let participant = ParticipantId::new();
    state.connections().insert(
        participant,
        ParticipantConnection {
            id: participant,
            tx: outbound_tx.clone(),
        },
    );
    info!(%participant, "participant connected");

    let welcome = ServerMessage::Welcome {
        participant_id: participant,
    };
    if send_message_to_websocket(&outbound_tx, &welcome).is_err() {
        room_service::disconnect(&state, participant).await;
        finalize(writer_task, outbound_tx).await;
        return;
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let inbound = match ClientMessage::from_json_str(&text) {
                    Ok(inbound) => inbound,
                    Err(err) => {
                        warn!(%participant, error = %err, "failed to parse or validate participant message");
                        let notice = ServerMessage::RoomError {
                            code: "invalid_message".into(),
                            message: err.to_string(),
                        };
                        if send_message_to_websocket(&outbound_tx, &notice).is_err() {
                            break;
                        }
                        continue;
                    }
                };

                debug!(%participant, kind = inbound.kind(), "received participant message");
                events::dispatch(&state, participant, inbound).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%participant, "participant closed the connection");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%participant, error = %err, "websocket error");
                break;
            }
        }
    }

    room_service::disconnect(&state, participant).await;
    info!(%participant, "participant disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Returns `Ok(())` if the message was queued or if serialization failed
/// (permanent error, no point retrying).
pub fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), ConnectionClosed>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_serialized_text_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let participant = ParticipantId::new();

        send_message_to_websocket(
            &tx,
            &ServerMessage::Welcome {
                participant_id: participant,
            },
        )
        .unwrap();

        let Some(Message::Text(text)) = rx.try_recv().ok() else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["type"], "welcome");
        assert_eq!(value["participant_id"], participant.to_string());
    }

    #[test]
    fn closed_writer_is_reported() {
        let (tx, rx) = mpsc::unbounded_channel::<Message>();
        drop(rx);
        assert!(send_message_to_websocket(&tx, &ServerMessage::RoomReady { room_key: "ABC".into() }).is_err());
    }
}
