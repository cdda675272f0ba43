//! Diagnostics
//!
//! Structured records of every notable room event: accepted and rejected
//! actions, phase transitions, scores, ack latency. Rooms hand them to a
//! [`DiagnosticSink`]; storing or aggregating them is the sink's business.
//!
//! Diagnostics are separate from the state broadcast. A rejected action is
//! reported here and never reaches the other players.

use std::sync::{Arc, Mutex};
use serde::Serialize;
use tracing::{info, warn};

use crate::game::action::{Action, RejectReason};
use crate::game::catalog::SanctuaryId;
use crate::game::player::PlayerId;
use crate::game::scoring::ScoreEntry;
use crate::game::state::Phase;
use crate::network::room::{JoinRejection, StartRejection};

/// Tracing target for diagnostic records.
pub const DIAGNOSTICS_TARGET: &str = "faraway::diagnostics";

/// Where a record originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Room and game lifecycle.
    Server,
    /// Socket lifecycle.
    Connection,
}

/// What happened.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DiagnosticEvent {
    /// Socket opened.
    SocketConnected,
    /// Socket closed.
    SocketDisconnected,
    /// Room created by its first player.
    RoomCreated,
    /// Player joined a room.
    RoomJoined {
        /// Users seated after the join.
        users: usize,
    },
    /// Join refused.
    RoomJoinRejected {
        /// Why.
        reason: JoinRejection,
    },
    /// Player left a room.
    PlayerLeft {
        /// Users still seated.
        users: usize,
    },
    /// Last player left, room dropped.
    RoomDestroyed,
    /// A player asked to start.
    StartRequested,
    /// Start refused.
    StartRejected {
        /// Why.
        reason: StartRejection,
    },
    /// Game state created, `beginGame` sent.
    GameBegin {
        /// Players dealt in.
        users: usize,
    },
    /// Grace period over, room marked started.
    GameStarted,
    /// Action applied.
    ActionAccepted {
        /// The applied action.
        action: Action,
    },
    /// Action refused.
    ActionRejected {
        /// The refused action.
        action: Action,
        /// Reason code.
        reason: RejectReason,
    },
    /// Phase changed.
    PhaseTransition {
        /// Phase left.
        from: Phase,
        /// Phase entered.
        to: Phase,
        /// Current turn.
        turn: u8,
    },
    /// Sanctuary candidates drawn for a player.
    SanctuaryOffered {
        /// Candidates drawn.
        cards: Vec<SanctuaryId>,
    },
    /// One player's final score.
    ScoreBreakdown(ScoreEntry),
    /// Final result of the game.
    EndGameScore {
        /// Players holding the best total.
        winners: Vec<PlayerId>,
        /// Breakdowns in seat order.
        scores: Vec<ScoreEntry>,
    },
    /// One player's rejected action count for the game.
    InvalidMoves {
        /// Rejected actions.
        count: u32,
    },
    /// Ack for a recorded sequence.
    UpdateAck {
        /// Acknowledged sequence.
        state_seq: u64,
    },
    /// Ack for a sequence the room never recorded.
    UpdateAckMissingSent {
        /// Sequence the client claims to have seen.
        state_seq: u64,
    },
}

impl DiagnosticEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticEvent::SocketConnected => "socketConnected",
            DiagnosticEvent::SocketDisconnected => "socketDisconnected",
            DiagnosticEvent::RoomCreated => "roomCreated",
            DiagnosticEvent::RoomJoined { .. } => "roomJoined",
            DiagnosticEvent::RoomJoinRejected { .. } => "roomJoinRejected",
            DiagnosticEvent::PlayerLeft { .. } => "playerLeft",
            DiagnosticEvent::RoomDestroyed => "roomDestroyed",
            DiagnosticEvent::StartRequested => "startRequested",
            DiagnosticEvent::StartRejected { .. } => "startRejected",
            DiagnosticEvent::GameBegin { .. } => "gameBegin",
            DiagnosticEvent::GameStarted => "gameStarted",
            DiagnosticEvent::ActionAccepted { .. } => "actionAccepted",
            DiagnosticEvent::ActionRejected { .. } => "actionRejected",
            DiagnosticEvent::PhaseTransition { .. } => "phaseTransition",
            DiagnosticEvent::SanctuaryOffered { .. } => "sanctuaryOffered",
            DiagnosticEvent::ScoreBreakdown(_) => "scoreBreakdown",
            DiagnosticEvent::EndGameScore { .. } => "endGameScore",
            DiagnosticEvent::InvalidMoves { .. } => "invalidMoves",
            DiagnosticEvent::UpdateAck { .. } => "updateAck",
            DiagnosticEvent::UpdateAckMissingSent { .. } => "updateAckMissingSent",
        }
    }

    /// Rejections and desyncs are logged at warn.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            DiagnosticEvent::ActionRejected { .. } | DiagnosticEvent::UpdateAckMissingSent { .. }
        )
    }
}

/// One diagnostic record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Origin.
    pub scope: Scope,
    /// Room / game id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    /// Player concerned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    /// Game phase at the time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// Measured round trip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<i64>,
    /// Event.
    #[serde(flatten)]
    pub event: DiagnosticEvent,
}

impl Diagnostic {
    /// Record from room or game code.
    pub fn server(event: DiagnosticEvent) -> Self {
        Self {
            scope: Scope::Server,
            game_id: None,
            player_id: None,
            phase: None,
            latency_ms: None,
            event,
        }
    }

    /// Record from connection handling.
    pub fn connection(event: DiagnosticEvent) -> Self {
        Self {
            scope: Scope::Connection,
            ..Self::server(event)
        }
    }

    /// Attach the game id.
    pub fn game(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    /// Attach the player.
    pub fn player(mut self, player_id: PlayerId) -> Self {
        self.player_id = Some(player_id);
        self
    }

    /// Attach the phase, if a game is running.
    pub fn phase(mut self, phase: Option<Phase>) -> Self {
        self.phase = phase;
        self
    }

    /// Attach a latency measurement.
    pub fn latency(mut self, latency_ms: i64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

// =============================================================================
// SINKS
// =============================================================================

/// Receiver of diagnostic records.
pub trait DiagnosticSink: Send + Sync {
    /// Handle one record. Must not block.
    fn record(&self, diagnostic: &Diagnostic);
}

/// Shared sink handle.
pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Emits every record as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, diagnostic: &Diagnostic) {
        let payload = serde_json::to_string(&diagnostic.event).unwrap_or_default();
        let game_id = diagnostic.game_id.as_deref().unwrap_or("-");
        let player = diagnostic.player_id.map(|id| id.short()).unwrap_or_default();
        let phase = diagnostic.phase.map(Phase::as_str).unwrap_or("-");
        let action = diagnostic.event.name();

        if diagnostic.event.is_warning() {
            let reason = match &diagnostic.event {
                DiagnosticEvent::ActionRejected { reason, .. } => reason.code(),
                _ => "-",
            };
            warn!(
                target: DIAGNOSTICS_TARGET,
                scope = ?diagnostic.scope,
                game_id,
                player = %player,
                phase,
                latency_ms = ?diagnostic.latency_ms,
                action,
                reason,
                payload = %payload,
            );
        } else {
            info!(
                target: DIAGNOSTICS_TARGET,
                scope = ?diagnostic.scope,
                game_id,
                player = %player,
                phase,
                latency_ms = ?diagnostic.latency_ms,
                action,
                payload = %payload,
            );
        }
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record so far.
    pub fn records(&self) -> Vec<Diagnostic> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of records matching a predicate.
    pub fn count(&self, predicate: impl Fn(&Diagnostic) -> bool) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|diagnostic| predicate(diagnostic))
            .count()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, diagnostic: &Diagnostic) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic.clone());
    }
}
