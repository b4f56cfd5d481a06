use serde_json::Value;
use tracing::debug;

use crate::{
    dto::ws::{ServerMessage, SignalPayload},
    error::ServiceError,
    state::{ParticipantId, SharedState, room::Outbound},
};

/// Kind of opaque frame forwarded between peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
    Data,
}

impl SignalKind {
    fn message(self, from: ParticipantId, payload: Value) -> ServerMessage {
        match self {
            SignalKind::Offer => ServerMessage::Offer { from, payload },
            SignalKind::Answer => ServerMessage::Answer { from, payload },
            SignalKind::IceCandidate => ServerMessage::IceCandidate { from, payload },
            SignalKind::Data => ServerMessage::DataMessage { from, payload },
        }
    }
}

/// Forward a signaling payload, untouched, to the sender's peers.
///
/// Only the `from` annotation is added. A target outside the room receives nothing.
pub async fn relay(
    state: &SharedState,
    sender: ParticipantId,
    kind: SignalKind,
    signal: SignalPayload,
) -> Result<(), ServiceError> {
    let SignalPayload { payload, target } = signal;
    state
        .update_rooms(|registry| {
            let recipients = registry.relay_targets(&sender, target)?;
            if recipients.is_empty() {
                debug!(participant = %sender, ?kind, "no recipient for relayed frame");
            }
            let message = kind.message(sender, payload);
            Ok(recipients
                .into_iter()
                .map(|recipient| Outbound::new(recipient, message.clone()))
                .collect())
        })
        .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_annotated_messages() {
        let from = ParticipantId::new();
        let payload = json!({"sdp": "v=0"});
        assert_eq!(
            SignalKind::IceCandidate.message(from, payload.clone()),
            ServerMessage::IceCandidate { from, payload }
        );
    }
}
