pub mod game;
pub mod registry;
pub mod room;
pub mod state_machine;

use std::{future::Future, sync::Arc};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::{sync::Mutex, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dao::questions::{QuestionSupplier, SupplierError},
    dto::ws::ServerMessage,
    error::ServiceError,
    services::websocket_service::send_message_to_websocket,
    state::{game::Question, registry::RoomRegistry, room::Outbound},
};

pub use self::game::ParticipantId;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};

/// Reference-counted handle to the application state shared by every task.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected participant.
pub struct ParticipantConnection {
    /// Participant owning the socket.
    pub id: ParticipantId,
    /// Queue drained by the socket's writer task.
    pub tx: tokio::sync::mpsc::UnboundedSender<Message>,
}

/// A round start reserved in a room and waiting for its questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStart {
    /// Room the start was planned in.
    pub room_key: String,
    /// Plan to commit or abort.
    pub plan_id: PlanId,
    /// Participant that asked for the round.
    pub initiator: ParticipantId,
}

/// Central application state: the room registry, open connections and the question source.
pub struct AppState {
    config: Arc<AppConfig>,
    registry: Mutex<RoomRegistry>,
    connections: DashMap<ParticipantId, ParticipantConnection>,
    questions: Arc<dyn QuestionSupplier>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, questions: Arc<dyn QuestionSupplier>) -> SharedState {
        let registry = RoomRegistry::new(config.room_policy());
        Arc::new(Self {
            config: Arc::new(config),
            registry: Mutex::new(registry),
            connections: DashMap::new(),
            questions,
        })
    }

    /// Access the immutable application configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Registry of open participant sockets keyed by participant id.
    pub fn connections(&self) -> &DashMap<ParticipantId, ParticipantConnection> {
        &self.connections
    }

    /// Supplier used when a round starts without client questions.
    pub fn question_supplier(&self) -> Arc<dyn QuestionSupplier> {
        self.questions.clone()
    }

    /// Run a read-only closure against the registry.
    pub async fn read_rooms<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&RoomRegistry) -> T,
    {
        let guard = self.registry.lock().await;
        f(&guard)
    }

    /// Run a registry operation and deliver the messages it produced.
    ///
    /// Delivery happens before the lock is released so every participant
    /// observes room events in the order they were applied.
    pub async fn update_rooms<F>(&self, op: F) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut RoomRegistry) -> Result<Vec<Outbound>, ServiceError>,
    {
        let mut guard = self.registry.lock().await;
        let outbound = op(&mut guard)?;
        self.deliver(outbound);
        drop(guard);
        Ok(())
    }

    /// Push each message onto its recipient's writer channel.
    ///
    /// Recipients that disconnected meanwhile are skipped; their departure is
    /// handled by their own connection task.
    pub fn deliver(&self, outbound: Vec<Outbound>) {
        for Outbound { recipient, message } in outbound {
            self.notify(&recipient, &message);
        }
    }

    /// Send one message to one participant, best effort.
    pub fn notify(&self, participant: &ParticipantId, message: &ServerMessage) {
        let Some(connection) = self.connections.get(participant) else {
            debug!(%participant, "dropping message for disconnected participant");
            return;
        };

        let tx = connection.tx.clone();
        drop(connection);

        if send_message_to_websocket(&tx, message).is_err() {
            debug!(%participant, "writer closed; message dropped");
        }
    }

    /// Reserve a round start in the initiator's room.
    ///
    /// The room is resolved here, in arrival order with every other event;
    /// the phase stays unchanged until [`finish_start`](Self::finish_start).
    pub async fn plan_start(&self, initiator: ParticipantId) -> Result<PendingStart, ServiceError> {
        let mut guard = self.registry.lock().await;
        let (room_key, plan_id) = guard.plan_start_game(&initiator)?;
        info!(room = %room_key, participant = %initiator, %plan_id, "game start planned");
        Ok(PendingStart {
            room_key,
            plan_id,
            initiator,
        })
    }

    /// Resolve the questions of a planned start and commit or abort it.
    ///
    /// `work` runs without holding the registry lock, so other rooms and
    /// other events keep flowing meanwhile.
    pub async fn finish_start<F, Fut>(
        &self,
        pending: PendingStart,
        work: F,
    ) -> Result<(), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Question>, ServiceError>>,
    {
        let PendingStart {
            room_key, plan_id, ..
        } = pending;

        let limit = self.config.supplier_timeout;
        let outcome = match timeout(limit, work()).await {
            Ok(result) => result,
            Err(_) => Err(SupplierError::Timeout(limit).into()),
        };

        let mut guard = self.registry.lock().await;
        match outcome {
            Ok(questions) => match guard.commit_start_game(&room_key, plan_id, questions) {
                Ok(outbound) => {
                    self.deliver(outbound);
                    Ok(())
                }
                Err(err) => {
                    if let Err(abort_err) = guard.abort_start_game(&room_key, plan_id) {
                        debug!(room = %room_key, error = %abort_err, "start plan already gone");
                    }
                    Err(err)
                }
            },
            Err(err) => {
                warn!(room = %room_key, %plan_id, error = %err, "aborting game start");
                if let Err(abort_err) = guard.abort_start_game(&room_key, plan_id) {
                    warn!(
                        room = %room_key,
                        %plan_id,
                        error = %abort_err,
                        "failed to abort game start"
                    );
                }
                Err(err)
            }
        }
    }
}
