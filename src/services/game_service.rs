use std::sync::Arc;

use tracing::debug;

use crate::{
    dao::questions::{Difficulty, QuestionSupplier, SupplierError},
    dto::ws::QuestionInput,
    error::ServiceError,
    state::{ParticipantId, PendingStart, SharedState, game::Answer, game::Question},
};

/// Start a round in the initiator's room.
///
/// Client-provided questions are used only when the configuration allows it;
/// otherwise the configured supplier is asked for a fresh set.
pub async fn start_game(
    state: &SharedState,
    initiator: ParticipantId,
    questions: Option<Vec<QuestionInput>>,
) -> Result<(), ServiceError> {
    let pending = plan_start(state, initiator).await?;
    finish_start(state, pending, questions).await
}

/// Reserve the round start in the room the initiator is in right now.
pub async fn plan_start(
    state: &SharedState,
    initiator: ParticipantId,
) -> Result<PendingStart, ServiceError> {
    state.plan_start(initiator).await
}

/// Gather the questions for a planned start and open its first question.
pub async fn finish_start(
    state: &SharedState,
    pending: PendingStart,
    questions: Option<Vec<QuestionInput>>,
) -> Result<(), ServiceError> {
    let config = state.config();
    let provided: Option<Vec<Question>> = match questions {
        Some(questions) if config.accept_client_questions => {
            Some(questions.into_iter().map(Question::from).collect())
        }
        Some(_) => {
            debug!(participant = %pending.initiator, "ignoring client-provided questions");
            None
        }
        None => None,
    };

    let supplier = state.question_supplier();
    let count = config.question_count;
    let difficulty = config.difficulty;

    state
        .finish_start(pending, move || {
            resolve_questions(supplier, provided, count, difficulty)
        })
        .await
}

/// Use the provided questions, or ask the supplier for `count` of them.
async fn resolve_questions(
    supplier: Arc<dyn QuestionSupplier>,
    provided: Option<Vec<Question>>,
    count: usize,
    difficulty: Difficulty,
) -> Result<Vec<Question>, ServiceError> {
    if let Some(questions) = provided {
        return Ok(questions);
    }

    debug!(supplier = supplier.name(), count, %difficulty, "fetching questions");
    let questions = supplier.fetch(count, difficulty).await?;
    if questions.is_empty() {
        return Err(SupplierError::Exhausted {
            requested: count,
            available: 0,
        }
        .into());
    }
    Ok(questions)
}

/// Record the participant's answer to the open question.
pub async fn submit_answer(
    state: &SharedState,
    participant: ParticipantId,
    answer: Answer,
) -> Result<(), ServiceError> {
    state
        .update_rooms(|registry| registry.submit_answer(participant, answer))
        .await
}

/// Move the participant's room past its reveal.
pub async fn next_question(
    state: &SharedState,
    participant: ParticipantId,
) -> Result<(), ServiceError> {
    state
        .update_rooms(|registry| registry.advance(&participant))
        .await
}
