use std::time::SystemTime;

use indexmap::IndexSet;
use tracing::{debug, info};

use crate::{
    dto::ws::{QuestionView, ServerMessage},
    error::ServiceError,
    state::{
        game::{Advance, Answer, GameState, ParticipantId, Question},
        state_machine::PlanId,
    },
};

/// A message addressed to one participant, produced by a state operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    /// Participant the message must be delivered to.
    pub recipient: ParticipantId,
    /// Message to deliver.
    pub message: ServerMessage,
}

impl Outbound {
    /// Address `message` to `recipient`.
    pub fn new(recipient: ParticipantId, message: ServerMessage) -> Self {
        Self { recipient, message }
    }
}

/// A call session: its members and the trivia game they share.
///
/// The game state lives inside the room so both are created and dropped together.
#[derive(Debug, Clone)]
pub struct Room {
    key: String,
    participants: IndexSet<ParticipantId>,
    created_at: SystemTime,
    game: GameState,
}

impl Room {
    pub(crate) fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            participants: IndexSet::new(),
            created_at: SystemTime::now(),
            game: GameState::new(),
        }
    }

    /// Caller-supplied key identifying the room.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Members in join order.
    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> {
        self.participants.iter()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the room has no members left.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Whether `participant` is a member.
    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.participants.contains(participant)
    }

    /// Creation time of the room.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Trivia state shared by the members.
    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Every member except `participant`.
    pub fn peers_of(&self, participant: &ParticipantId) -> Vec<ParticipantId> {
        self.participants
            .iter()
            .filter(|member| *member != participant)
            .copied()
            .collect()
    }

    pub(crate) fn insert(&mut self, participant: ParticipantId) -> bool {
        let inserted = self.participants.insert(participant);
        self.game.add_participant(participant);
        inserted
    }

    pub(crate) fn remove(&mut self, participant: &ParticipantId) -> bool {
        self.game.remove_participant(participant);
        self.participants.shift_remove(participant)
    }

    /// Address `message` to every member.
    pub(crate) fn broadcast(&self, message: ServerMessage) -> Vec<Outbound> {
        self.participants
            .iter()
            .map(|member| Outbound::new(*member, message.clone()))
            .collect()
    }

    /// Address `message` to every member except `sender`.
    pub(crate) fn broadcast_except(
        &self,
        sender: &ParticipantId,
        message: ServerMessage,
    ) -> Vec<Outbound> {
        self.participants
            .iter()
            .filter(|member| *member != sender)
            .map(|member| Outbound::new(*member, message.clone()))
            .collect()
    }

    /// Reserve a round start while the questions are being fetched.
    pub fn plan_start(&mut self) -> Result<PlanId, ServiceError> {
        Ok(self.game.plan_start()?)
    }

    /// Commit a planned start with resolved questions and announce it to the room.
    pub fn commit_start(
        &mut self,
        plan_id: PlanId,
        questions: Vec<Question>,
    ) -> Result<Vec<Outbound>, ServiceError> {
        if questions.is_empty() {
            self.game.abort_start(plan_id)?;
            return Err(ServiceError::InvalidInput(
                "a round needs at least one question".into(),
            ));
        }

        self.game.commit_start(plan_id, questions)?;
        info!(
            room = %self.key,
            questions = self.game.questions().len(),
            "game started"
        );

        Ok(self.broadcast(ServerMessage::GameStarted {
            current_question_index: 0,
            scores: self.game.scores().clone(),
            questions: self.game.questions().iter().map(QuestionView::from).collect(),
        }))
    }

    /// Drop a planned start, e.g. after a supplier failure.
    pub fn abort_start(&mut self, plan_id: PlanId) -> Result<(), ServiceError> {
        self.game.abort_start(plan_id)
    }

    /// Record an answer and reveal the question once every member answered.
    pub fn submit_answer(
        &mut self,
        participant: ParticipantId,
        answer: Answer,
    ) -> Result<Vec<Outbound>, ServiceError> {
        if !self.contains(&participant) {
            return Err(ServiceError::UnknownParticipant(participant));
        }

        if !self.game.record_answer(participant, answer)? {
            debug!(room = %self.key, %participant, "ignoring repeated answer");
            return Ok(Vec::new());
        }

        self.reveal_if_complete()
    }

    /// Enter the reveal if the members still in the room have all answered.
    ///
    /// Called after every answer and after every departure.
    pub fn reveal_if_complete(&mut self) -> Result<Vec<Outbound>, ServiceError> {
        if !self.game.all_answered(self.participants.len()) {
            return Ok(Vec::new());
        }

        let reveal = self.game.reveal()?;
        info!(
            room = %self.key,
            question = reveal.question_index,
            "all participants answered; revealing"
        );

        Ok(self.broadcast(ServerMessage::RevealAnswers {
            question_index: reveal.question_index,
            correct_index: reveal.correct_index,
            answers: reveal.answers,
            scores: reveal.scores,
        }))
    }

    /// Move past the reveal to the following question or the final scores.
    pub fn advance(&mut self) -> Result<Vec<Outbound>, ServiceError> {
        let message = match self.game.advance()? {
            Advance::Next { question_index } => ServerMessage::NextQuestion {
                current_question_index: question_index,
                scores: self.game.scores().clone(),
            },
            Advance::Finished => {
                info!(room = %self.key, "game over");
                ServerMessage::GameOver {
                    scores: self.game.scores().clone(),
                }
            }
        };

        Ok(self.broadcast(message))
    }
}
