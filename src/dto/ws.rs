use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::validation::validate_room_key,
    state::game::{Answer, ParticipantId, Question},
};

/// Messages accepted from participant WebSocket clients.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Create a fresh room and join it.
    CreateRoom(RoomRequest),
    /// Join a room, creating it if allowed.
    JoinRoom(RoomRequest),
    /// Leave the current room while keeping the connection open.
    LeaveRoom,
    /// WebRTC session description offer.
    Offer(SignalPayload),
    /// WebRTC session description answer.
    Answer(SignalPayload),
    /// WebRTC ICE candidate.
    IceCandidate(SignalPayload),
    /// Free-form peer data.
    DataMessage(SignalPayload),
    /// Start a trivia round.
    StartGame {
        /// Client-fetched questions, honoured only when the server allows it.
        #[serde(default)]
        questions: Option<Vec<QuestionInput>>,
    },
    /// Answer the open question.
    SubmitAnswer {
        /// Chosen option index, negative for "no answer".
        answer: Answer,
    },
    /// Move past the current reveal.
    NextQuestion,
    /// Tell the other participants the call was hung up.
    EndCall,
}

impl ClientMessage {
    /// Parse a text frame into a message and validate its contents.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        let message: Self = serde_json::from_str(text)?;
        match &message {
            ClientMessage::CreateRoom(request) | ClientMessage::JoinRoom(request) => {
                request.validate()?
            }
            ClientMessage::StartGame {
                questions: Some(questions),
            } => {
                for question in questions {
                    question.validate()?;
                }
            }
            _ => {}
        }
        Ok(message)
    }

    /// Short name of the event, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::CreateRoom(_) => "create-room",
            ClientMessage::JoinRoom(_) => "join-room",
            ClientMessage::LeaveRoom => "leave-room",
            ClientMessage::Offer(_) => "offer",
            ClientMessage::Answer(_) => "answer",
            ClientMessage::IceCandidate(_) => "ice-candidate",
            ClientMessage::DataMessage(_) => "data-message",
            ClientMessage::StartGame { .. } => "start-game",
            ClientMessage::SubmitAnswer { .. } => "submit-answer",
            ClientMessage::NextQuestion => "next-question",
            ClientMessage::EndCall => "end-call",
        }
    }
}

/// Failure to turn a text frame into a [`ClientMessage`].
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    /// The frame is not a known message.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The message is well-formed but carries invalid values.
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// Payload naming a room.
#[derive(Debug, Deserialize)]
pub struct RoomRequest {
    /// Caller-supplied room key.
    pub room_key: String,
}

impl Validate for RoomRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_room_key(&self.room_key) {
            errors.add("room_key", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Opaque signaling blob with optional explicit addressee.
#[derive(Debug, Deserialize)]
pub struct SignalPayload {
    /// Opaque content, never inspected by the server.
    pub payload: Value,
    /// Deliver to this participant only instead of the whole room.
    #[serde(default)]
    pub target: Option<ParticipantId>,
}

/// Question shipped by a client in `start-game`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_correct_index"))]
pub struct QuestionInput {
    /// Question text shown to every participant.
    #[validate(length(min = 1, max = 500))]
    pub prompt: String,
    /// Answer choices in display order.
    #[validate(length(min = 2, max = 6))]
    pub options: Vec<String>,
    /// Position of the right choice within `options`.
    pub correct_index: usize,
}

fn validate_correct_index(question: &QuestionInput) -> Result<(), ValidationError> {
    if question.correct_index >= question.options.len() {
        let mut err = ValidationError::new("correct_index_range");
        err.message = Some(
            format!(
                "correct index {} is out of range for {} options",
                question.correct_index,
                question.options.len()
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

impl From<QuestionInput> for Question {
    fn from(value: QuestionInput) -> Self {
        Self {
            prompt: value.prompt,
            options: value.options,
            correct_index: value.correct_index,
        }
    }
}

/// Client-facing view of a question: the correct option stays on the server until the reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    /// Question text.
    pub prompt: String,
    /// Answer choices in display order.
    pub options: Vec<String>,
}

impl From<&Question> for QuestionView {
    fn from(value: &Question) -> Self {
        Self {
            prompt: value.prompt.clone(),
            options: value.options.clone(),
        }
    }
}

/// Messages pushed to participant WebSocket clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// First frame on every connection, carrying the assigned identifier.
    Welcome { participant_id: ParticipantId },
    /// Acknowledges `create-room`.
    RoomCreated { room_key: String },
    /// Members already in the room, sent to the joiner only.
    Participants {
        room_key: String,
        peers: Vec<ParticipantId>,
    },
    /// A participant joined the room.
    UserJoined { participant_id: ParticipantId },
    /// A participant left the room.
    UserLeft { participant_id: ParticipantId },
    /// The room now holds two participants and the call can start.
    RoomReady { room_key: String },
    /// Relayed WebRTC offer.
    Offer { from: ParticipantId, payload: Value },
    /// Relayed WebRTC answer.
    Answer { from: ParticipantId, payload: Value },
    /// Relayed ICE candidate.
    IceCandidate { from: ParticipantId, payload: Value },
    /// Relayed peer data.
    DataMessage { from: ParticipantId, payload: Value },
    /// A peer hung up.
    CallEnded { from: ParticipantId },
    /// A round started.
    GameStarted {
        current_question_index: usize,
        scores: IndexMap<ParticipantId, u32>,
        questions: Vec<QuestionView>,
    },
    /// Every participant answered the open question.
    RevealAnswers {
        question_index: usize,
        correct_index: usize,
        answers: IndexMap<ParticipantId, Answer>,
        scores: IndexMap<ParticipantId, u32>,
    },
    /// The following question is open.
    NextQuestion {
        current_question_index: usize,
        scores: IndexMap<ParticipantId, u32>,
    },
    /// The round is over.
    GameOver { scores: IndexMap<ParticipantId, u32> },
    /// Non-fatal error notice for the requesting participant.
    RoomError { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_room() {
        let message = ClientMessage::from_json_str(r#"{"type":"join-room","room_key":"ABC"}"#)
            .unwrap();
        match message {
            ClientMessage::JoinRoom(request) => assert_eq!(request.room_key, "ABC"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_room_key() {
        let err = ClientMessage::from_json_str(r#"{"type":"join-room","room_key":"a b"}"#)
            .unwrap_err();
        assert!(matches!(err, InboundError::Invalid(_)));
    }

    #[test]
    fn parses_unit_and_sentinel_messages() {
        assert!(matches!(
            ClientMessage::from_json_str(r#"{"type":"next-question"}"#).unwrap(),
            ClientMessage::NextQuestion
        ));
        assert!(matches!(
            ClientMessage::from_json_str(r#"{"type":"submit-answer","answer":-1}"#).unwrap(),
            ClientMessage::SubmitAnswer {
                answer: Answer::NoAnswer
            }
        ));
        assert!(matches!(
            ClientMessage::from_json_str(r#"{"type":"start-game"}"#).unwrap(),
            ClientMessage::StartGame { questions: None }
        ));
    }

    #[test]
    fn parses_targeted_offer() {
        let target = ParticipantId::new();
        let text = format!(
            r#"{{"type":"offer","payload":{{"sdp":"v=0"}},"target":"{target}"}}"#
        );
        match ClientMessage::from_json_str(&text).unwrap() {
            ClientMessage::Offer(signal) => {
                assert_eq!(signal.target, Some(target));
                assert_eq!(signal.payload["sdp"], "v=0");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn rejects_client_question_with_bad_correct_index() {
        let text = r#"{"type":"start-game","questions":[{"prompt":"?","options":["a","b"],"correct_index":2}]}"#;
        assert!(matches!(
            ClientMessage::from_json_str(text).unwrap_err(),
            InboundError::Invalid(_)
        ));
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(matches!(
            ClientMessage::from_json_str(r#"{"type":"get-rooms"}"#).unwrap_err(),
            InboundError::Malformed(_)
        ));
    }

    #[test]
    fn serializes_reveal_with_sentinel() {
        let p1 = ParticipantId::new();
        let mut answers = IndexMap::new();
        answers.insert(p1, Answer::NoAnswer);
        let mut scores = IndexMap::new();
        scores.insert(p1, 0);

        let value = serde_json::to_value(ServerMessage::RevealAnswers {
            question_index: 0,
            correct_index: 2,
            answers,
            scores,
        })
        .unwrap();

        assert_eq!(value["type"], "reveal-answers");
        assert_eq!(value["answers"][p1.to_string()], -1);
        assert_eq!(value["scores"][p1.to_string()], 0);
    }
}
