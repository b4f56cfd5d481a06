use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    state::state_machine::{
        ApplyError, GameEvent, GamePhase, GameStateMachine, PlanError, PlanId, Snapshot,
    },
};

/// Opaque identifier of one live connection, reassigned on reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Allocate a fresh identifier for a new connection.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ParticipantId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One trivia question as handed out by a question supplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Text shown to the players.
    pub prompt: String,
    /// Answer choices, already in presentation order.
    pub options: Vec<String>,
    /// Index into `options` of the right answer.
    pub correct_index: usize,
}

/// A participant's answer to the open question.
///
/// On the wire this is a plain integer where any negative value means the
/// client-side timer ran out without a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Answer {
    /// Index of the chosen option.
    Choice(usize),
    /// No option was picked before the timer elapsed.
    NoAnswer,
}

impl Answer {
    /// Whether this answer matches the question's correct option.
    pub fn is_correct(&self, question: &Question) -> bool {
        matches!(self, Answer::Choice(index) if *index == question.correct_index)
    }
}

impl From<i64> for Answer {
    fn from(value: i64) -> Self {
        usize::try_from(value)
            .map(Answer::Choice)
            .unwrap_or(Answer::NoAnswer)
    }
}

impl From<Answer> for i64 {
    fn from(value: Answer) -> Self {
        match value {
            Answer::Choice(index) => i64::try_from(index).unwrap_or(i64::MAX),
            Answer::NoAnswer => -1,
        }
    }
}

/// Outcome of revealing the open question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reveal {
    /// Index of the revealed question.
    pub question_index: usize,
    /// Correct option of the revealed question.
    pub correct_index: usize,
    /// Every submitted answer, keyed by participant.
    pub answers: IndexMap<ParticipantId, Answer>,
    /// Scores after crediting correct answers.
    pub scores: IndexMap<ParticipantId, u32>,
}

/// Outcome of moving past a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// A new question is open.
    Next {
        /// Index of the newly opened question.
        question_index: usize,
    },
    /// The last question was revealed; the round is over.
    Finished,
}

/// Authoritative trivia progress for one room.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    machine: GameStateMachine,
    questions: Vec<Question>,
    scores: IndexMap<ParticipantId, u32>,
    pending_answers: IndexMap<ParticipantId, Answer>,
}

impl GameState {
    /// Fresh idle game state with no participants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase of the round.
    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    /// State machine snapshot including any pending start.
    pub fn snapshot(&self) -> Snapshot {
        self.machine.snapshot()
    }

    /// Whether a round is in progress.
    pub fn is_active(&self) -> bool {
        self.phase().is_active()
    }

    /// Question sequence of the running round (empty outside a round).
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Scores keyed by participant, in join order.
    pub fn scores(&self) -> &IndexMap<ParticipantId, u32> {
        &self.scores
    }

    /// Answers submitted for the question in flight.
    pub fn pending_answers(&self) -> &IndexMap<ParticipantId, Answer> {
        &self.pending_answers
    }

    /// Question currently open or being revealed.
    pub fn current_question(&self) -> Option<&Question> {
        self.phase()
            .question_index()
            .and_then(|index| self.questions.get(index))
    }

    /// Track a newly joined participant with a zero score.
    pub fn add_participant(&mut self, participant: ParticipantId) {
        self.scores.entry(participant).or_insert(0);
    }

    /// Forget a departed participant's score and pending answer.
    pub fn remove_participant(&mut self, participant: &ParticipantId) {
        self.scores.shift_remove(participant);
        self.pending_answers.shift_remove(participant);
    }

    /// Reserve the start of a round; the phase stays unchanged until [`commit_start`](Self::commit_start).
    pub fn plan_start(&mut self) -> Result<PlanId, PlanError> {
        self.machine.plan(GameEvent::StartGame).map(|plan| plan.id)
    }

    /// Commit a planned start with a fully resolved question sequence.
    ///
    /// Every tracked participant's score goes back to zero.
    pub fn commit_start(
        &mut self,
        plan_id: PlanId,
        questions: Vec<Question>,
    ) -> Result<(), ApplyError> {
        self.machine.apply(plan_id)?;
        self.questions = questions;
        self.scores.values_mut().for_each(|score| *score = 0);
        self.pending_answers.clear();
        Ok(())
    }

    /// Drop a planned start, leaving the previous phase untouched.
    pub fn abort_start(&mut self, plan_id: PlanId) -> Result<(), ServiceError> {
        self.machine.abort(plan_id)?;
        Ok(())
    }

    /// Record `participant`'s answer for the open question.
    ///
    /// Returns `false` when the participant already answered: the first
    /// submission wins and later ones leave the recorded answer untouched.
    pub fn record_answer(
        &mut self,
        participant: ParticipantId,
        answer: Answer,
    ) -> Result<bool, ServiceError> {
        let GamePhase::Active { question_index } = self.phase() else {
            return Err(ServiceError::InvalidStateTransition(format!(
                "answers are only accepted while a question is open (phase {:?})",
                self.phase()
            )));
        };

        if !self.scores.contains_key(&participant) {
            return Err(ServiceError::UnknownParticipant(participant));
        }

        if let Answer::Choice(index) = answer {
            let option_count = self
                .questions
                .get(question_index)
                .map(|question| question.options.len())
                .unwrap_or_default();
            if index >= option_count {
                return Err(ServiceError::InvalidInput(format!(
                    "answer index {index} is out of range (question has {option_count} options)"
                )));
            }
        }

        if self.pending_answers.contains_key(&participant) {
            return Ok(false);
        }

        self.pending_answers.insert(participant, answer);
        Ok(true)
    }

    /// Whether every one of `participant_count` members answered the open question.
    pub fn all_answered(&self, participant_count: usize) -> bool {
        matches!(self.phase(), GamePhase::Active { .. })
            && participant_count > 0
            && self.pending_answers.len() >= participant_count
    }

    /// Enter the reveal of the open question and credit one point per correct answer.
    pub fn reveal(&mut self) -> Result<Reveal, ServiceError> {
        let phase = self.machine.transition(GameEvent::AllAnswered)?;
        let GamePhase::Revealing { question_index } = phase else {
            return Err(ServiceError::InvalidStateTransition(format!(
                "unexpected phase {phase:?} after reveal"
            )));
        };

        let question = self.questions.get(question_index).ok_or_else(|| {
            ServiceError::InvalidStateTransition(format!(
                "question {question_index} is out of range"
            ))
        })?;

        for (participant, answer) in &self.pending_answers {
            if !answer.is_correct(question) {
                continue;
            }
            if let Some(score) = self.scores.get_mut(participant) {
                *score += 1;
            }
        }

        Ok(Reveal {
            question_index,
            correct_index: question.correct_index,
            answers: self.pending_answers.clone(),
            scores: self.scores.clone(),
        })
    }

    /// Leave the reveal: open the following question, or finish the round after the last one.
    pub fn advance(&mut self) -> Result<Advance, ServiceError> {
        let GamePhase::Revealing { question_index } = self.phase() else {
            return Err(ServiceError::InvalidStateTransition(format!(
                "next question is only available after a reveal (phase {:?})",
                self.phase()
            )));
        };

        if question_index + 1 < self.questions.len() {
            self.machine.transition(GameEvent::NextQuestion)?;
            self.pending_answers.clear();
            Ok(Advance::Next {
                question_index: question_index + 1,
            })
        } else {
            self.machine.transition(GameEvent::Finish)?;
            self.pending_answers.clear();
            self.questions.clear();
            Ok(Advance::Finished)
        }
    }
}
