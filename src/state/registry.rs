use std::collections::HashMap;

use tracing::{info, warn};

use crate::{
    dto::ws::ServerMessage,
    error::ServiceError,
    state::{
        game::{Answer, ParticipantId, Question},
        room::{Outbound, Room},
        state_machine::PlanId,
    },
};

/// Membership rules applied by [`RoomRegistry::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomPolicy {
    /// Maximum number of members per room, `None` for uncapped rooms.
    pub max_participants: Option<usize>,
    /// Create rooms on first join instead of requiring `create-room`.
    pub auto_create: bool,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self {
            max_participants: Some(2),
            auto_create: true,
        }
    }
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    /// `false` when the participant was already a member of this room.
    pub joined_as_new: bool,
    /// Members that were in the room before the joiner.
    pub peers: Vec<ParticipantId>,
    /// Notifications produced by the join.
    pub outbound: Vec<Outbound>,
}

/// Owns every room and the participant → room index.
///
/// All membership and game mutations go through this type; each operation runs
/// to completion and returns the messages it produced.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    memberships: HashMap<ParticipantId, String>,
    policy: RoomPolicy,
}

impl RoomRegistry {
    /// Empty registry enforcing `policy`.
    pub fn new(policy: RoomPolicy) -> Self {
        Self {
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            policy,
        }
    }

    /// Look up a room by key.
    pub fn get(&self, room_key: &str) -> Option<&Room> {
        self.rooms.get(room_key)
    }

    /// Every registered room, in no particular order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Number of registered rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is registered.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Key of the room `participant` belongs to.
    pub fn room_of(&self, participant: &ParticipantId) -> Option<&str> {
        self.memberships.get(participant).map(String::as_str)
    }

    /// Create a room that must not exist yet and join `creator` to it.
    pub fn create(
        &mut self,
        room_key: &str,
        creator: ParticipantId,
    ) -> Result<JoinOutcome, ServiceError> {
        if self.rooms.contains_key(room_key) {
            return Err(ServiceError::RoomAlreadyExists(room_key.to_string()));
        }

        let mut outbound = self.leave_current(creator);
        self.rooms
            .insert(room_key.to_string(), Room::new(room_key));
        info!(room = %room_key, participant = %creator, "room created");
        outbound.push(Outbound::new(
            creator,
            ServerMessage::RoomCreated {
                room_key: room_key.to_string(),
            },
        ));

        let mut outcome = self.admit(room_key, creator)?;
        outbound.append(&mut outcome.outbound);
        outcome.outbound = outbound;
        Ok(outcome)
    }

    /// Join `participant` to the room keyed `room_key`.
    ///
    /// Rejoining the current room keeps membership unchanged but notifies the
    /// peers again. Joining another room first leaves the current one.
    pub fn join(
        &mut self,
        room_key: &str,
        participant: ParticipantId,
    ) -> Result<JoinOutcome, ServiceError> {
        if self.room_of(&participant) == Some(room_key) {
            let room = self
                .rooms
                .get(room_key)
                .ok_or_else(|| ServiceError::RoomNotFound(room_key.to_string()))?;
            let peers = room.peers_of(&participant);
            let mut outbound = room.broadcast_except(
                &participant,
                ServerMessage::UserJoined {
                    participant_id: participant,
                },
            );
            outbound.push(Outbound::new(
                participant,
                ServerMessage::Participants {
                    room_key: room_key.to_string(),
                    peers: peers.clone(),
                },
            ));
            return Ok(JoinOutcome {
                joined_as_new: false,
                peers,
                outbound,
            });
        }

        match self.rooms.get(room_key) {
            Some(room) => {
                if let Some(capacity) = self.policy.max_participants {
                    if room.len() >= capacity {
                        return Err(ServiceError::RoomFull {
                            room_key: room_key.to_string(),
                            capacity,
                        });
                    }
                }
            }
            None if !self.policy.auto_create => {
                return Err(ServiceError::RoomNotFound(room_key.to_string()));
            }
            None => {}
        }

        let mut outbound = self.leave_current(participant);
        if !self.rooms.contains_key(room_key) {
            self.rooms
                .insert(room_key.to_string(), Room::new(room_key));
            info!(room = %room_key, participant = %participant, "room created");
        }

        let mut outcome = self.admit(room_key, participant)?;
        outbound.append(&mut outcome.outbound);
        outcome.outbound = outbound;
        Ok(outcome)
    }

    /// Remove `participant` from its room, dropping the room once empty.
    ///
    /// A departure during an open question can complete it and trigger the reveal.
    pub fn leave(&mut self, participant: ParticipantId) -> Result<Vec<Outbound>, ServiceError> {
        let room_key = self
            .memberships
            .remove(&participant)
            .ok_or(ServiceError::UnknownParticipant(participant))?;

        let Some(room) = self.rooms.get_mut(&room_key) else {
            return Ok(Vec::new());
        };

        room.remove(&participant);
        info!(room = %room_key, %participant, remaining = room.len(), "participant left");

        if room.is_empty() {
            self.rooms.remove(&room_key);
            info!(room = %room_key, "room deleted");
            return Ok(Vec::new());
        }

        let mut outbound = room.broadcast(ServerMessage::UserLeft {
            participant_id: participant,
        });
        match room.reveal_if_complete() {
            Ok(mut reveal) => outbound.append(&mut reveal),
            Err(err) => warn!(room = %room_key, error = %err, "failed to re-evaluate answers"),
        }

        Ok(outbound)
    }

    /// Reserve a round start in the room of `participant`.
    pub fn plan_start_game(
        &mut self,
        participant: &ParticipantId,
    ) -> Result<(String, PlanId), ServiceError> {
        let room = self.room_of_mut(participant)?;
        let plan_id = room.plan_start()?;
        Ok((room.key().to_string(), plan_id))
    }

    /// Commit a planned start once its questions are resolved.
    pub fn commit_start_game(
        &mut self,
        room_key: &str,
        plan_id: PlanId,
        questions: Vec<Question>,
    ) -> Result<Vec<Outbound>, ServiceError> {
        let room = self
            .rooms
            .get_mut(room_key)
            .ok_or_else(|| ServiceError::RoomNotFound(room_key.to_string()))?;
        room.commit_start(plan_id, questions)
    }

    /// Abort a planned start. A room deleted meanwhile has nothing left to abort.
    pub fn abort_start_game(&mut self, room_key: &str, plan_id: PlanId) -> Result<(), ServiceError> {
        match self.rooms.get_mut(room_key) {
            Some(room) => room.abort_start(plan_id),
            None => Ok(()),
        }
    }

    /// Record `participant`'s answer in its room.
    pub fn submit_answer(
        &mut self,
        participant: ParticipantId,
        answer: Answer,
    ) -> Result<Vec<Outbound>, ServiceError> {
        self.room_of_mut(&participant)?
            .submit_answer(participant, answer)
    }

    /// Advance the room of `participant` past its reveal.
    pub fn advance(&mut self, participant: &ParticipantId) -> Result<Vec<Outbound>, ServiceError> {
        self.room_of_mut(participant)?.advance()
    }

    /// Resolve who receives a frame relayed by `sender`.
    ///
    /// Without `target` every other member receives it. A target outside the
    /// sender's room, or the sender itself, resolves to nobody.
    pub fn relay_targets(
        &self,
        sender: &ParticipantId,
        target: Option<ParticipantId>,
    ) -> Result<Vec<ParticipantId>, ServiceError> {
        let room = self.room_of_ref(sender)?;
        Ok(match target {
            Some(target) if target != *sender && room.contains(&target) => vec![target],
            Some(_) => Vec::new(),
            None => room.peers_of(sender),
        })
    }

    /// Tell the other members `participant` hung up. Membership is unchanged.
    pub fn end_call(&self, participant: &ParticipantId) -> Result<Vec<Outbound>, ServiceError> {
        let room = self.room_of_ref(participant)?;
        Ok(room.broadcast_except(
            participant,
            ServerMessage::CallEnded { from: *participant },
        ))
    }

    fn room_of_ref(&self, participant: &ParticipantId) -> Result<&Room, ServiceError> {
        let room_key = self.memberships.get(participant).ok_or(ServiceError::NotInRoom)?;
        self.rooms
            .get(room_key)
            .ok_or_else(|| ServiceError::RoomNotFound(room_key.clone()))
    }

    fn room_of_mut(&mut self, participant: &ParticipantId) -> Result<&mut Room, ServiceError> {
        let room_key = self.memberships.get(participant).ok_or(ServiceError::NotInRoom)?;
        self.rooms
            .get_mut(room_key)
            .ok_or_else(|| ServiceError::RoomNotFound(room_key.clone()))
    }

    /// Implicit leave before moving to another room.
    fn leave_current(&mut self, participant: ParticipantId) -> Vec<Outbound> {
        if !self.memberships.contains_key(&participant) {
            return Vec::new();
        }
        self.leave(participant).unwrap_or_default()
    }

    /// Insert `participant` into an existing room and build the join notifications.
    fn admit(
        &mut self,
        room_key: &str,
        participant: ParticipantId,
    ) -> Result<JoinOutcome, ServiceError> {
        let room = self
            .rooms
            .get_mut(room_key)
            .ok_or_else(|| ServiceError::RoomNotFound(room_key.to_string()))?;

        room.insert(participant);
        self.memberships.insert(participant, room_key.to_string());
        info!(room = %room_key, %participant, members = room.len(), "participant joined");

        let peers = room.peers_of(&participant);
        let mut outbound = room.broadcast_except(
            &participant,
            ServerMessage::UserJoined {
                participant_id: participant,
            },
        );
        outbound.push(Outbound::new(
            participant,
            ServerMessage::Participants {
                room_key: room_key.to_string(),
                peers: peers.clone(),
            },
        ));
        if room.len() == 2 {
            outbound.extend(room.broadcast(ServerMessage::RoomReady {
                room_key: room_key.to_string(),
            }));
        }

        Ok(JoinOutcome {
            joined_as_new: true,
            peers,
            outbound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::state_machine::GamePhase;

    fn messages_for(outbound: &[Outbound], recipient: ParticipantId) -> Vec<&ServerMessage> {
        outbound
            .iter()
            .filter(|out| out.recipient == recipient)
            .map(|out| &out.message)
            .collect()
    }

    fn sample_questions() -> Vec<Question> {
        vec![Question {
            prompt: "Which planet is known as the Red Planet?".into(),
            options: vec![
                "Venus".into(),
                "Mars".into(),
                "Jupiter".into(),
                "Saturn".into(),
            ],
            correct_index: 1,
        }]
    }

    #[test]
    fn first_join_creates_room_and_second_gets_peers() {
        let mut registry = RoomRegistry::default();
        let p1 = ParticipantId::new();
        let p2 = ParticipantId::new();

        let first = registry.join("ABC", p1).unwrap();
        assert!(first.joined_as_new);
        assert!(first.peers.is_empty());
        assert_eq!(registry.len(), 1);

        let second = registry.join("ABC", p2).unwrap();
        assert_eq!(second.peers, vec![p1]);
        assert_eq!(
            messages_for(&second.outbound, p1),
            vec![
                &ServerMessage::UserJoined { participant_id: p2 },
                &ServerMessage::RoomReady {
                    room_key: "ABC".into()
                },
            ]
        );
        assert_eq!(
            messages_for(&second.outbound, p2),
            vec![
                &ServerMessage::Participants {
                    room_key: "ABC".into(),
                    peers: vec![p1],
                },
                &ServerMessage::RoomReady {
                    room_key: "ABC".into()
                },
            ]
        );
    }

    #[test]
    fn rejoin_is_idempotent_but_notifies_peers() {
        let mut registry = RoomRegistry::default();
        let p1 = ParticipantId::new();
        let p2 = ParticipantId::new();
        registry.join("ABC", p1).unwrap();
        registry.join("ABC", p2).unwrap();

        let again = registry.join("ABC", p2).unwrap();
        assert!(!again.joined_as_new);
        assert_eq!(registry.get("ABC").unwrap().len(), 2);
        assert_eq!(
            messages_for(&again.outbound, p1),
            vec![&ServerMessage::UserJoined { participant_id: p2 }]
        );
    }

    #[test]
    fn third_participant_is_rejected_when_capped() {
        let mut registry = RoomRegistry::default();
        registry.join("ABC", ParticipantId::new()).unwrap();
        registry.join("ABC", ParticipantId::new()).unwrap();

        let err = registry.join("ABC", ParticipantId::new()).unwrap_err();
        assert!(matches!(err, ServiceError::RoomFull { capacity: 2, .. }));
    }

    #[test]
    fn uncapped_rooms_accept_more_members() {
        let mut registry = RoomRegistry::new(RoomPolicy {
            max_participants: None,
            auto_create: true,
        });
        for _ in 0..3 {
            registry.join("call", ParticipantId::new()).unwrap();
        }
        assert_eq!(registry.get("call").unwrap().len(), 3);
    }

    #[test]
    fn strict_mode_requires_existing_room() {
        let mut registry = RoomRegistry::new(RoomPolicy {
            max_participants: Some(2),
            auto_create: false,
        });
        let p1 = ParticipantId::new();
        assert!(matches!(
            registry.join("ABC", p1).unwrap_err(),
            ServiceError::RoomNotFound(_)
        ));

        let created = registry.create("ABC", p1).unwrap();
        assert_eq!(
            created.outbound[0].message,
            ServerMessage::RoomCreated {
                room_key: "ABC".into()
            }
        );
        assert!(matches!(
            registry.create("ABC", ParticipantId::new()).unwrap_err(),
            ServiceError::RoomAlreadyExists(_)
        ));
        assert!(registry.join("ABC", ParticipantId::new()).is_ok());
    }

    #[test]
    fn joining_another_room_leaves_the_first() {
        let mut registry = RoomRegistry::default();
        let p1 = ParticipantId::new();
        let p2 = ParticipantId::new();
        registry.join("ABC", p1).unwrap();
        registry.join("ABC", p2).unwrap();

        let moved = registry.join("XYZ", p2).unwrap();
        assert_eq!(registry.room_of(&p2), Some("XYZ"));
        assert_eq!(registry.get("ABC").unwrap().len(), 1);
        assert_eq!(
            messages_for(&moved.outbound, p1),
            vec![&ServerMessage::UserLeft { participant_id: p2 }]
        );
    }

    #[test]
    fn last_leave_deletes_room_and_game() {
        let mut registry = RoomRegistry::default();
        let p1 = ParticipantId::new();
        registry.join("ABC", p1).unwrap();

        assert!(registry.leave(p1).unwrap().is_empty());
        assert!(registry.get("ABC").is_none());
        assert!(registry.is_empty());
        assert!(matches!(
            registry.leave(p1).unwrap_err(),
            ServiceError::UnknownParticipant(_)
        ));
    }

    #[test]
    fn full_room_rejection_keeps_current_membership() {
        let mut registry = RoomRegistry::default();
        let p3 = ParticipantId::new();
        registry.join("ABC", ParticipantId::new()).unwrap();
        registry.join("ABC", ParticipantId::new()).unwrap();
        registry.join("XYZ", p3).unwrap();

        assert!(registry.join("ABC", p3).is_err());
        assert_eq!(registry.room_of(&p3), Some("XYZ"));
    }

    #[test]
    fn relay_targets_respect_room_boundaries() {
        let mut registry = RoomRegistry::default();
        let p1 = ParticipantId::new();
        let p2 = ParticipantId::new();
        let outsider = ParticipantId::new();
        registry.join("ABC", p1).unwrap();
        registry.join("ABC", p2).unwrap();
        registry.join("XYZ", outsider).unwrap();

        assert_eq!(registry.relay_targets(&p1, None).unwrap(), vec![p2]);
        assert_eq!(registry.relay_targets(&p1, Some(p2)).unwrap(), vec![p2]);
        assert!(registry.relay_targets(&p1, Some(outsider)).unwrap().is_empty());
        assert!(matches!(
            registry.relay_targets(&ParticipantId::new(), None).unwrap_err(),
            ServiceError::NotInRoom
        ));
    }

    #[test]
    fn start_commit_fails_when_room_vanished() {
        let mut registry = RoomRegistry::default();
        let p1 = ParticipantId::new();
        registry.join("ABC", p1).unwrap();
        let (room_key, plan_id) = registry.plan_start_game(&p1).unwrap();

        registry.leave(p1).unwrap();
        assert!(matches!(
            registry
                .commit_start_game(&room_key, plan_id, sample_questions())
                .unwrap_err(),
            ServiceError::RoomNotFound(_)
        ));
        assert!(registry.abort_start_game(&room_key, plan_id).is_ok());
    }

    #[test]
    fn answers_during_pending_start_are_rejected() {
        let mut registry = RoomRegistry::default();
        let p1 = ParticipantId::new();
        registry.join("ABC", p1).unwrap();
        let (room_key, plan_id) = registry.plan_start_game(&p1).unwrap();

        assert!(matches!(
            registry.submit_answer(p1, Answer::Choice(1)).unwrap_err(),
            ServiceError::InvalidStateTransition(_)
        ));
        assert!(registry.plan_start_game(&p1).is_err());

        registry
            .commit_start_game(&room_key, plan_id, sample_questions())
            .unwrap();
        assert_eq!(
            registry.get("ABC").unwrap().game().phase(),
            GamePhase::Active { question_index: 0 }
        );
    }

    #[test]
    fn mid_round_joiner_must_answer_before_reveal() {
        let mut registry = RoomRegistry::default();
        let p1 = ParticipantId::new();
        let p2 = ParticipantId::new();
        registry.join("ABC", p1).unwrap();
        let (room_key, plan_id) = registry.plan_start_game(&p1).unwrap();
        let mut questions = sample_questions();
        questions.extend(sample_questions());
        registry
            .commit_start_game(&room_key, plan_id, questions)
            .unwrap();

        registry.join("ABC", p2).unwrap();
        let scores = registry.get("ABC").unwrap().game().scores().clone();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores.get(&p2), Some(&0));

        let first = registry.submit_answer(p1, Answer::Choice(1)).unwrap();
        assert!(
            !first
                .iter()
                .any(|out| matches!(out.message, ServerMessage::RevealAnswers { .. }))
        );
        assert_eq!(
            registry.get("ABC").unwrap().game().phase(),
            GamePhase::Active { question_index: 0 }
        );

        let second = registry.submit_answer(p2, Answer::Choice(0)).unwrap();
        for participant in [p1, p2] {
            let messages = messages_for(&second, participant);
            let Some(ServerMessage::RevealAnswers {
                answers, scores, ..
            }) = messages.first()
            else {
                panic!("expected a reveal for {participant}");
            };
            assert_eq!(answers.len(), 2);
            assert_eq!(answers.get(&p1), Some(&Answer::Choice(1)));
            assert_eq!(answers.get(&p2), Some(&Answer::Choice(0)));
            assert_eq!(scores.get(&p1), Some(&1));
            assert_eq!(scores.get(&p2), Some(&0));
        }
    }

    #[test]
    fn end_call_notifies_peers_only() {
        let mut registry = RoomRegistry::default();
        let p1 = ParticipantId::new();
        let p2 = ParticipantId::new();
        registry.join("ABC", p1).unwrap();
        registry.join("ABC", p2).unwrap();

        let outbound = registry.end_call(&p1).unwrap();
        assert_eq!(
            outbound,
            vec![Outbound::new(p2, ServerMessage::CallEnded { from: p1 })]
        );
        assert_eq!(registry.get("ABC").unwrap().len(), 2);
    }
}
