use thiserror::Error;
use uuid::Uuid;

/// Phases a room's trivia round can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// No round has been played yet in this room.
    Idle,
    /// A question is open and answers are being collected.
    Active {
        /// Index of the open question.
        question_index: usize,
    },
    /// Every current participant answered; answers and scores are exposed.
    Revealing {
        /// Index of the question being revealed.
        question_index: usize,
    },
    /// The last question was revealed and the round is over.
    Finished,
}

impl GamePhase {
    /// Whether a round is in progress (a question is open or being revealed).
    pub fn is_active(&self) -> bool {
        matches!(self, GamePhase::Active { .. } | GamePhase::Revealing { .. })
    }

    /// Index of the question in flight, if any.
    pub fn question_index(&self) -> Option<usize> {
        match self {
            GamePhase::Active { question_index } | GamePhase::Revealing { question_index } => {
                Some(*question_index)
            }
            GamePhase::Idle | GamePhase::Finished => None,
        }
    }
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A participant starts a new round.
    StartGame,
    /// All current participants submitted an answer for the open question.
    AllAnswered,
    /// Move from the reveal to the following question.
    NextQuestion,
    /// Move from the reveal of the last question to the final scores.
    Finish,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: GameEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: GamePhase,
    /// Phase the state machine will transition to.
    pub to: GamePhase,
    /// Event that triggered this transition.
    pub event: GameEvent,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: GamePhase,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<GamePhase>,
}

/// Per-room state machine driving question progression.
///
/// Transitions are two-step: [`plan`](Self::plan) validates an event and
/// records it as pending without touching the phase, [`apply`](Self::apply)
/// commits it. Slow work (fetching questions) happens in between, so other
/// events keep observing the previous phase until the commit.
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    phase: GamePhase,
    pending: Option<Plan>,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self {
            phase: GamePhase::Idle,
            pending: None,
        }
    }
}

impl GameStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Whether a planned transition is waiting to be applied or aborted.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: GameEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    ///
    /// While a plan is pending every other plan is refused, so the phase the
    /// plan was computed from is still current here.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<GamePhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        self.phase = plan.to;

        Ok(self.phase)
    }

    /// Plan and immediately apply a transition that needs no intermediate work.
    pub fn transition(&mut self, event: GameEvent) -> Result<GamePhase, PlanError> {
        let plan = self.plan(event)?;
        self.phase = plan.to;
        self.pending = None;
        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (GamePhase::Idle | GamePhase::Finished, GameEvent::StartGame) => {
                GamePhase::Active { question_index: 0 }
            }
            (GamePhase::Active { question_index }, GameEvent::AllAnswered) => {
                GamePhase::Revealing { question_index }
            }
            (GamePhase::Revealing { question_index }, GameEvent::NextQuestion) => {
                GamePhase::Active {
                    question_index: question_index + 1,
                }
            }
            (GamePhase::Revealing { .. }, GameEvent::Finish) => GamePhase::Finished,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut GameStateMachine, event: GameEvent) -> GamePhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = GameStateMachine::new();
        assert_eq!(sm.phase(), GamePhase::Idle);
        assert!(!sm.phase().is_active());
    }

    #[test]
    fn full_round_through_two_questions() {
        let mut sm = GameStateMachine::new();

        assert_eq!(
            apply(&mut sm, GameEvent::StartGame),
            GamePhase::Active { question_index: 0 }
        );
        assert_eq!(
            apply(&mut sm, GameEvent::AllAnswered),
            GamePhase::Revealing { question_index: 0 }
        );
        assert_eq!(
            apply(&mut sm, GameEvent::NextQuestion),
            GamePhase::Active { question_index: 1 }
        );
        assert_eq!(
            apply(&mut sm, GameEvent::AllAnswered),
            GamePhase::Revealing { question_index: 1 }
        );
        assert_eq!(apply(&mut sm, GameEvent::Finish), GamePhase::Finished);
        assert_eq!(
            apply(&mut sm, GameEvent::StartGame),
            GamePhase::Active { question_index: 0 }
        );
    }

    #[test]
    fn invalid_transition_returns_error() {
        let mut sm = GameStateMachine::new();
        let err = sm.plan(GameEvent::AllAnswered).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, GamePhase::Idle);
                assert_eq!(invalid.event, GameEvent::AllAnswered);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reveal_is_not_reentered() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);
        apply(&mut sm, GameEvent::AllAnswered);

        let err = sm.transition(GameEvent::AllAnswered).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));
        assert_eq!(sm.phase(), GamePhase::Revealing { question_index: 0 });
    }

    #[test]
    fn start_is_rejected_while_a_round_runs() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);
        assert!(sm.plan(GameEvent::StartGame).is_err());
    }

    #[test]
    fn pending_plan_keeps_previous_phase_visible() {
        let mut sm = GameStateMachine::new();
        let plan = sm.plan(GameEvent::StartGame).unwrap();

        assert_eq!(sm.phase(), GamePhase::Idle);
        assert_eq!(
            sm.snapshot().pending,
            Some(GamePhase::Active { question_index: 0 })
        );
        assert_eq!(sm.plan(GameEvent::StartGame).unwrap_err(), PlanError::AlreadyPending);

        sm.apply(plan.id).unwrap();
        assert!(!sm.has_pending());
    }

    #[test]
    fn apply_with_stale_plan_id_is_rejected() {
        let mut sm = GameStateMachine::new();
        let plan = sm.plan(GameEvent::StartGame).unwrap();
        let err = sm.apply(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApplyError::IdMismatch { .. }));
        assert!(sm.has_pending());
        sm.apply(plan.id).unwrap();
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = GameStateMachine::new();
        let plan = sm.plan(GameEvent::StartGame).unwrap();
        sm.abort(plan.id).unwrap();
        assert!(sm.pending.is_none());
        assert_eq!(sm.phase(), GamePhase::Idle);
        assert_eq!(sm.abort(plan.id).unwrap_err(), AbortError::NoPending);
        assert_eq!(sm.apply(plan.id).unwrap_err(), ApplyError::NoPending);
    }
}
