//! Shared application state for the API server.
//!
//! [`AppState`] holds the bracket service and the broadcast channel used
//! to tell connected renderers that a bracket changed.

use std::sync::Arc;

use camporee_bracket::service::DynBracketService;
use camporee_types::GameId;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

/// Capacity of the broadcast channel for change notices.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// What kind of mutation produced a [`BracketChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The event was started or late teams joined.
    Started,
    /// A heat was created.
    HeatCreated,
    /// A team was given a bye or scratched.
    TeamPlaced,
    /// Heat results were recorded.
    ResultsSaved,
    /// A round was renamed or its final flag changed.
    RoundUpdated,
    /// A round was advanced.
    Advanced,
    /// The consolation line was opened.
    ConsolationOpened,
    /// The challenge match was created.
    ChallengeCreated,
    /// The podium review changed.
    StandingsUpdated,
    /// The standings were submitted to the queue.
    StandingsSubmitted,
}

/// Change notice pushed over the `WebSocket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketChange {
    /// The game whose bracket changed.
    pub game_id: GameId,
    /// What happened.
    pub change: ChangeKind,
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for change notices.
    pub tx: broadcast::Sender<BracketChange>,
    /// The bracket service every handler goes through.
    pub service: Arc<Mutex<DynBracketService>>,
}

impl AppState {
    /// Create application state around a service.
    pub fn new(service: DynBracketService) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            service: Arc::new(Mutex::new(service)),
        }
    }

    /// Subscribe to change notices.
    pub fn subscribe(&self) -> broadcast::Receiver<BracketChange> {
        self.tx.subscribe()
    }

    /// Publish a change notice to all connected clients.
    ///
    /// Returns the number of receivers that received the message.
    /// Returns 0 if no clients are connected (this is not an error).
    pub fn broadcast(&self, change: &BracketChange) -> usize {
        // send returns Err only when there are zero receivers,
        // which is normal when no WebSocket clients are connected.
        self.tx.send(change.clone()).unwrap_or(0)
    }

    /// Publish `change` for `game_id`.
    pub fn notify(&self, game_id: &GameId, change: ChangeKind) {
        let receivers = self.broadcast(&BracketChange {
            game_id: game_id.clone(),
            change,
        });
        debug!(game_id = %game_id, ?change, receivers, "Change broadcast");
    }
}
