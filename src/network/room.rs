//! Room
//!
//! A room owns its users, the running game, the broadcast sequence and the
//! invalid-move counters. [`Room`] is the synchronous record; [`RoomActor`]
//! wraps it in a tokio task fed by a FIFO command queue, so every mutation of
//! one room is applied strictly one at a time while other rooms run freely.
//!
//! Room methods never send anything themselves. They queue [`Outbound`]
//! messages, which the actor delivers after each command.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use serde::{Serialize, Deserialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
#[cfg(feature = "debug-tracing")]
use tracing::debug;
use tracing::{info, warn};

use crate::core::rng::DeterministicRng;
use crate::diagnostics::{Diagnostic, DiagnosticEvent, SharedSink};
use crate::game::action::{Action, RejectReason};
use crate::game::catalog::Catalog;
use crate::game::events::GameEvent;
use crate::game::player::PlayerId;
use crate::game::scoring::ScoreEntry;
use crate::game::state::{GameState, Phase};
use crate::network::protocol::{BeginGameInfo, RoomSnapshot, RoomSummary, ServerMessage};
use crate::network::sync::{now_ms, AckOutcome, SyncTracker};
use crate::{DEFAULT_MAX_PLAYERS, MIN_PLAYERS, PROTOCOL_VERSION, START_GRACE_MS};

/// Room command queue depth.
const COMMAND_QUEUE_SIZE: usize = 256;

// =============================================================================
// IDENTIFIERS AND CONFIG
// =============================================================================

/// Short room identifier, also used as the game id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Length of generated ids.
    pub const LEN: usize = 5;

    /// Fresh random id (5 lowercase hex characters).
    pub fn generate() -> Self {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        Self(simple[..Self::LEN].to_string())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-room settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomConfig {
    /// Players needed to start.
    pub min_players: usize,
    /// Capacity.
    pub max_players: usize,
    /// Delay between `beginGame` and the room being marked started.
    pub start_grace: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: MIN_PLAYERS,
            max_players: DEFAULT_MAX_PLAYERS,
            start_grace: Duration::from_millis(START_GRACE_MS),
        }
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Why a join was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
pub enum JoinRejection {
    /// Room at capacity.
    #[error("room is full")]
    Full,
    /// Game already began.
    #[error("room already started")]
    Started,
    /// No such room.
    #[error("room not found")]
    NotFound,
}

impl JoinRejection {
    /// Rejection event sent to the requester.
    pub fn message(&self) -> ServerMessage {
        match self {
            JoinRejection::Full => ServerMessage::RoomFull,
            JoinRejection::Started => ServerMessage::RoomStarted,
            JoinRejection::NotFound => ServerMessage::RoomNotFound,
        }
    }
}

/// Why a start request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
pub enum StartRejection {
    /// Fewer than the minimum number of players.
    #[error("not enough players")]
    NotEnoughPlayers,
    /// Game already began; the request is ignored.
    #[error("game already started")]
    AlreadyStarted,
    /// No such room.
    #[error("room not found")]
    NotFound,
}

impl StartRejection {
    /// Rejection event sent to the requester, if the client is told at all.
    pub fn message(&self) -> Option<ServerMessage> {
        match self {
            StartRejection::NotEnoughPlayers => Some(ServerMessage::NotEnoughPlayers),
            StartRejection::AlreadyStarted => None,
            StartRejection::NotFound => Some(ServerMessage::RoomNotFound),
        }
    }
}

/// Result of a game action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Applied; carries the snapshot that was broadcast.
    Accepted(Box<RoomSnapshot>),
    /// Refused; game state untouched.
    Rejected(RejectReason),
}

/// Delivery target of an outbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    /// Every user in the room.
    All,
    /// One user.
    Player(PlayerId),
}

/// A message queued for delivery.
#[derive(Clone, Debug, PartialEq)]
pub struct Outbound {
    /// Target.
    pub to: Recipient,
    /// Message.
    pub message: ServerMessage,
}

// =============================================================================
// ROOM
// =============================================================================

/// Authoritative state of one room.
pub struct Room {
    id: RoomId,
    config: RoomConfig,
    users: Vec<PlayerId>,
    /// Grace period over.
    started: bool,
    game: Option<GameState>,
    sync: SyncTracker,
    invalid_moves: BTreeMap<PlayerId, u32>,
    catalog: Arc<Catalog>,
    sink: SharedSink,
    run_seed: u64,
    /// Last user left; the room accepts nothing more.
    closed: bool,
    outbox: Vec<Outbound>,
}

impl Room {
    /// Create a room with its first user seated.
    pub fn new(
        id: RoomId,
        creator: PlayerId,
        config: RoomConfig,
        catalog: Arc<Catalog>,
        sink: SharedSink,
        run_seed: u64,
    ) -> Self {
        let room = Self {
            id,
            config,
            users: vec![creator],
            started: false,
            game: None,
            sync: SyncTracker::new(),
            invalid_moves: BTreeMap::new(),
            catalog,
            sink,
            run_seed,
            closed: false,
            outbox: Vec::new(),
        };
        room.record(Diagnostic::server(DiagnosticEvent::RoomCreated).player(creator));
        room
    }

    /// Room identifier.
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Seated users in join order.
    pub fn users(&self) -> &[PlayerId] {
        &self.users
    }

    /// Running game, if begun.
    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    /// Whether the grace period is over.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether the last user left.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Sequence of the latest broadcast.
    pub fn state_seq(&self) -> u64 {
        self.sync.state_seq()
    }

    /// Rejected actions by a player so far.
    pub fn invalid_moves(&self, player: &PlayerId) -> u32 {
        self.invalid_moves.get(player).copied().unwrap_or(0)
    }

    /// Drain queued outbound messages.
    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Seat a player, answer with `roomJoined` and broadcast an update.
    pub fn join(&mut self, player: PlayerId, now: i64) -> Result<(), JoinRejection> {
        let rejection = if self.closed {
            Some(JoinRejection::NotFound)
        } else if self.users.len() >= self.config.max_players {
            Some(JoinRejection::Full)
        } else if self.started || self.game.is_some() {
            Some(JoinRejection::Started)
        } else {
            None
        };
        if let Some(reason) = rejection {
            self.record(
                Diagnostic::server(DiagnosticEvent::RoomJoinRejected { reason }).player(player),
            );
            return Err(reason);
        }

        self.users.push(player);
        let snapshot = self.snapshot(now);
        self.send_to(player, ServerMessage::RoomJoined(snapshot));
        self.broadcast_update(now);
        self.record(
            Diagnostic::server(DiagnosticEvent::RoomJoined { users: self.users.len() })
                .player(player),
        );
        Ok(())
    }

    /// Remove a player. Closes the room when it empties.
    ///
    /// A running game drops the player's seat and carries on; the remaining
    /// users receive an update.
    pub fn leave(&mut self, player: PlayerId, now: i64) -> bool {
        let Some(index) = self.users.iter().position(|user| *user == player) else {
            return false;
        };
        self.users.remove(index);
        if let Some(game) = self.game.as_mut() {
            game.remove_player(&player);
        }
        self.record(
            Diagnostic::server(DiagnosticEvent::PlayerLeft { users: self.users.len() })
                .player(player),
        );
        self.record_game_events();

        if self.users.is_empty() {
            self.closed = true;
            self.record(Diagnostic::server(DiagnosticEvent::RoomDestroyed));
        } else if self.game.is_some() {
            self.broadcast_update(now);
        }
        true
    }

    /// Begin a game: create its state and send `beginGame`.
    ///
    /// The room is marked started by [`Room::mark_started`] once the grace
    /// period has passed.
    pub fn start_game(&mut self, requester: PlayerId, now: i64) -> Result<(), StartRejection> {
        let rejection = if self.closed {
            Some(StartRejection::NotFound)
        } else if self.started || self.game.is_some() {
            Some(StartRejection::AlreadyStarted)
        } else if self.users.len() < self.config.min_players {
            Some(StartRejection::NotEnoughPlayers)
        } else {
            None
        };
        if let Some(reason) = rejection {
            self.record(
                Diagnostic::server(DiagnosticEvent::StartRejected { reason }).player(requester),
            );
            return Err(reason);
        }

        self.record(Diagnostic::server(DiagnosticEvent::StartRequested).player(requester));

        let rng = DeterministicRng::for_game(self.run_seed, self.id.as_str());
        self.game = Some(GameState::new(self.users.clone(), self.catalog.clone(), rng));
        self.record(Diagnostic::server(DiagnosticEvent::GameBegin { users: self.users.len() }));

        self.broadcast(ServerMessage::BeginGame(BeginGameInfo {
            protocol_version: PROTOCOL_VERSION,
            server_time: now,
            game_id: self.id.clone(),
        }));
        Ok(())
    }

    /// End of the grace period: mark started and send the first update.
    pub fn mark_started(&mut self, now: i64) {
        if self.closed || self.started || self.game.is_none() {
            return;
        }
        self.started = true;
        self.record(Diagnostic::server(DiagnosticEvent::GameStarted));
        self.broadcast_update(now);
    }

    // =========================================================================
    // Game
    // =========================================================================

    /// Apply a player action.
    ///
    /// Accepted actions are broadcast. Rejected ones are reported to that
    /// player only and bump the invalid-move counter of seated users.
    pub fn apply(&mut self, player: PlayerId, action: Action, now: i64) -> CommandOutcome {
        let result = if !self.users.contains(&player) {
            Err(RejectReason::NotSeated)
        } else {
            match self.game.as_mut() {
                Some(game) => game.apply(player, action),
                None => Err(RejectReason::Phase),
            }
        };

        match result {
            Ok(()) => {
                self.record(
                    Diagnostic::server(DiagnosticEvent::ActionAccepted { action }).player(player),
                );
                self.record_game_events();
                let snapshot = self.broadcast_update(now);
                CommandOutcome::Accepted(Box::new(snapshot))
            }
            Err(reason) => {
                if self.users.contains(&player) {
                    *self.invalid_moves.entry(player).or_insert(0) += 1;
                }
                self.record(
                    Diagnostic::server(DiagnosticEvent::ActionRejected { action, reason })
                        .player(player),
                );
                self.send_to(player, ServerMessage::action_rejected(action, reason));
                CommandOutcome::Rejected(reason)
            }
        }
    }

    /// Process an update ack from a user.
    pub fn acknowledge(&mut self, player: PlayerId, state_seq: u64, now: i64) -> Option<AckOutcome> {
        if !self.users.contains(&player) {
            return None;
        }
        let outcome = self.sync.acknowledge(state_seq, now);
        let diagnostic = match outcome {
            AckOutcome::Measured { latency_ms } => {
                Diagnostic::server(DiagnosticEvent::UpdateAck { state_seq }).latency(latency_ms)
            }
            AckOutcome::UnknownSequence => {
                Diagnostic::server(DiagnosticEvent::UpdateAckMissingSent { state_seq })
            }
        };
        self.record(diagnostic.player(player));
        Some(outcome)
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Room list entry.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.id.clone(),
            users: self.users.clone(),
            state: self.started,
            max_players: self.config.max_players,
        }
    }

    /// Full snapshot at the current sequence.
    ///
    /// Player states, winners and scores cover current users only; `score`
    /// follows the order of `users`.
    pub fn snapshot(&self, now: i64) -> RoomSnapshot {
        let game = self.game.as_ref();
        let seated = |id: &PlayerId| self.users.contains(id);
        RoomSnapshot {
            room_id: self.id.clone(),
            users: self.users.clone(),
            state: self.started,
            max_players: self.config.max_players,
            protocol_version: PROTOCOL_VERSION,
            server_time: now,
            state_seq: self.sync.state_seq(),
            phase: game.map(GameState::phase),
            turn: game.map(GameState::turn),
            players: game.map(|g| {
                g.players()
                    .iter()
                    .filter(|(id, _)| seated(*id))
                    .map(|(id, state)| (*id, state.clone()))
                    .collect()
            }),
            shop: game.map(|g| g.shop().to_vec()),
            shop_order: game.map(|g| g.shop_order().to_vec()),
            pool_size: game.map(|g| g.region_pool().len()),
            sanctuary_pool_size: game.map(|g| g.sanctuary_pool().len()),
            winner: game
                .and_then(GameState::winner)
                .map(|winners| winners.iter().copied().filter(|id| seated(id)).collect()),
            score: game.and_then(|g| self.user_scores(g)),
        }
    }

    /// Final scores re-keyed from seat order to user order.
    fn user_scores(&self, game: &GameState) -> Option<Vec<ScoreEntry>> {
        let by_seat: BTreeMap<&PlayerId, &ScoreEntry> =
            game.seats().iter().zip(game.score()?).collect();
        Some(
            self.users
                .iter()
                .filter_map(|id| by_seat.get(id).map(|entry| (*entry).clone()))
                .collect(),
        )
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn phase(&self) -> Option<Phase> {
        self.game.as_ref().map(GameState::phase)
    }

    fn record(&self, diagnostic: Diagnostic) {
        let diagnostic = diagnostic.game(self.id.as_str()).phase(self.phase());
        self.sink.record(&diagnostic);
    }

    fn send_to(&mut self, player: PlayerId, message: ServerMessage) {
        self.outbox.push(Outbound { to: Recipient::Player(player), message });
    }

    fn broadcast(&mut self, message: ServerMessage) {
        self.outbox.push(Outbound { to: Recipient::All, message });
    }

    /// Stamp a new sequence and queue the snapshot for everyone.
    fn broadcast_update(&mut self, now: i64) -> RoomSnapshot {
        self.sync.stamp(now);
        let snapshot = self.snapshot(now);
        self.broadcast(ServerMessage::Update(snapshot.clone()));
        snapshot
    }

    /// Forward engine events to the diagnostic sink.
    fn record_game_events(&mut self) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        for event in game.take_events() {
            match event {
                GameEvent::PhaseChanged { from, to, turn } => {
                    self.record(Diagnostic::server(DiagnosticEvent::PhaseTransition { from, to, turn }));
                }
                GameEvent::SanctuaryOffered { player, cards } => {
                    self.record(
                        Diagnostic::server(DiagnosticEvent::SanctuaryOffered { cards }).player(player),
                    );
                }
                GameEvent::GameFinished { winners, scores } => {
                    for (player, entry) in &scores {
                        self.record(
                            Diagnostic::server(DiagnosticEvent::ScoreBreakdown(entry.clone()))
                                .player(*player),
                        );
                    }
                    info!(
                        "Game {} ended, winners: {:?}",
                        self.id,
                        winners.iter().map(PlayerId::short).collect::<Vec<_>>()
                    );
                    self.record(Diagnostic::server(DiagnosticEvent::EndGameScore {
                        winners,
                        scores: scores.into_iter().map(|(_, entry)| entry).collect(),
                    }));
                    for player in &self.users {
                        let count = self.invalid_moves.get(player).copied().unwrap_or(0);
                        self.record(
                            Diagnostic::server(DiagnosticEvent::InvalidMoves { count }).player(*player),
                        );
                    }
                }
            }
        }
    }
}

// =============================================================================
// ACTOR
// =============================================================================

/// Commands accepted by a room actor.
pub enum RoomCommand {
    /// Seat a player.
    Join {
        /// Joining player.
        player: PlayerId,
        /// The player's outbound queue.
        sender: mpsc::Sender<ServerMessage>,
        /// Join result.
        reply: oneshot::Sender<Result<(), JoinRejection>>,
    },
    /// Remove a player; replies with the users left.
    Leave {
        /// Departing player.
        player: PlayerId,
        /// Users still seated.
        reply: oneshot::Sender<usize>,
    },
    /// Begin the game.
    Start {
        /// Requesting player.
        player: PlayerId,
        /// Start result.
        reply: oneshot::Sender<Result<(), StartRejection>>,
    },
    /// Grace period elapsed.
    MarkStarted,
    /// Game action.
    Action {
        /// Acting player.
        player: PlayerId,
        /// The action.
        action: Action,
        /// Accepted or rejected.
        reply: oneshot::Sender<CommandOutcome>,
    },
    /// Update ack.
    Ack {
        /// Acknowledging player.
        player: PlayerId,
        /// Sequence received.
        state_seq: u64,
    },
}

/// Cloneable handle to a running room actor.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    id: RoomId,
    commands: mpsc::Sender<RoomCommand>,
    /// Latest room list entry, published by the actor after every command.
    summary: watch::Receiver<RoomSummary>,
}

impl RoomHandle {
    /// Room identifier.
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Seat a player. A stopped actor reads as a missing room.
    pub async fn join(
        &self,
        player: PlayerId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(), JoinRejection> {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(RoomCommand::Join { player, sender, reply }).await.is_err() {
            return Err(JoinRejection::NotFound);
        }
        rx.await.unwrap_or(Err(JoinRejection::NotFound))
    }

    /// Remove a player; returns the users left.
    pub async fn leave(&self, player: PlayerId) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(RoomCommand::Leave { player, reply }).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Begin the game.
    pub async fn start(&self, player: PlayerId) -> Result<(), StartRejection> {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(RoomCommand::Start { player, reply }).await.is_err() {
            return Err(StartRejection::NotFound);
        }
        rx.await.unwrap_or(Err(StartRejection::NotFound))
    }

    /// Submit a game action.
    pub async fn submit(&self, player: PlayerId, action: Action) -> CommandOutcome {
        let gone = CommandOutcome::Rejected(RejectReason::NotSeated);
        let (reply, rx) = oneshot::channel();
        if self.commands.send(RoomCommand::Action { player, action, reply }).await.is_err() {
            return gone;
        }
        rx.await.unwrap_or(gone)
    }

    /// Forward an update ack.
    pub async fn acknowledge(&self, player: PlayerId, state_seq: u64) {
        let _ = self.commands.send(RoomCommand::Ack { player, state_seq }).await;
    }

    /// Room list entry, or None once the room has closed.
    ///
    /// Reads the last published value; never waits on the actor.
    pub fn summary(&self) -> Option<RoomSummary> {
        let summary = self.summary.borrow().clone();
        if summary.users.is_empty() || self.commands.is_closed() {
            return None;
        }
        Some(summary)
    }
}

/// Task that owns one room and processes its commands in arrival order.
pub struct RoomActor {
    room: Room,
    /// Outbound channels of seated users.
    senders: BTreeMap<PlayerId, mpsc::Sender<ServerMessage>>,
    commands: mpsc::Receiver<RoomCommand>,
    /// For the grace timer; weak so dropping every handle stops the actor.
    self_commands: mpsc::WeakSender<RoomCommand>,
    summary: watch::Sender<RoomSummary>,
}

impl RoomActor {
    /// Spawn the actor for a freshly created room.
    pub fn spawn(room: Room, creator_sender: mpsc::Sender<ServerMessage>) -> RoomHandle {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let (summary_tx, summary_rx) = watch::channel(room.summary());
        let id = room.id().clone();

        let mut senders = BTreeMap::new();
        if let Some(creator) = room.users().first() {
            senders.insert(*creator, creator_sender);
        }

        let actor = Self {
            room,
            senders,
            commands: rx,
            self_commands: tx.downgrade(),
            summary: summary_tx,
        };
        tokio::spawn(actor.run());

        RoomHandle { id, commands: tx, summary: summary_rx }
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
            if self.room.is_closed() {
                break;
            }
        }
        #[cfg(feature = "debug-tracing")]
        debug!("Room {} actor stopped", self.room.id());
    }

    /// Apply one command. Replies go out after delivery, so a caller sees
    /// the room as every other user does.
    fn handle(&mut self, command: RoomCommand) {
        let now = now_ms();
        match command {
            RoomCommand::Join { player, sender, reply } => {
                #[cfg(feature = "debug-tracing")]
                debug!("Room {} join {}", self.room.id(), player.short());
                let result = self.room.join(player, now);
                if result.is_ok() {
                    self.senders.insert(player, sender);
                }
                self.deliver();
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player, reply } => {
                #[cfg(feature = "debug-tracing")]
                debug!("Room {} leave {}", self.room.id(), player.short());
                self.room.leave(player, now);
                self.senders.remove(&player);
                self.deliver();
                let _ = reply.send(self.room.users().len());
            }
            RoomCommand::Start { player, reply } => {
                let result = self.room.start_game(player, now);
                if result.is_ok() {
                    self.schedule_mark_started();
                }
                self.deliver();
                let _ = reply.send(result);
            }
            RoomCommand::MarkStarted => {
                self.room.mark_started(now);
                self.deliver();
            }
            RoomCommand::Action { player, action, reply } => {
                #[cfg(feature = "debug-tracing")]
                debug!("Room {} {} from {}", self.room.id(), action, player.short());
                let outcome = self.room.apply(player, action, now);
                self.deliver();
                let _ = reply.send(outcome);
            }
            RoomCommand::Ack { player, state_seq } => {
                self.room.acknowledge(player, state_seq, now);
                self.deliver();
            }
        }
    }

    /// Grace timer: runs outside the actor so the queue keeps moving.
    fn schedule_mark_started(&self) {
        let commands = self.self_commands.clone();
        let grace = self.room.config.start_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(RoomCommand::MarkStarted).await;
            }
        });
    }

    /// Publish the summary and hand queued messages to the users' queues.
    ///
    /// Never waits on a client. A user whose queue is full or closed is
    /// removed through the normal leave path, and the resulting updates
    /// go out on the next pass.
    fn deliver(&mut self) {
        loop {
            self.summary.send_replace(self.room.summary());
            let outbound = self.room.take_outbound();
            if outbound.is_empty() {
                return;
            }

            let mut dropped = Vec::new();
            for Outbound { to, message } in outbound {
                match to {
                    Recipient::All => {
                        self.senders.retain(|player, sender| {
                            match sender.try_send(message.clone()) {
                                Ok(()) => true,
                                Err(err) => {
                                    dropped.push((*player, matches!(err, TrySendError::Full(_))));
                                    false
                                }
                            }
                        });
                    }
                    Recipient::Player(player) => {
                        let Some(sender) = self.senders.get(&player) else {
                            continue;
                        };
                        if let Err(err) = sender.try_send(message) {
                            dropped.push((player, matches!(err, TrySendError::Full(_))));
                            self.senders.remove(&player);
                        }
                    }
                }
            }

            for (player, full) in dropped {
                if full {
                    warn!("Room {} dropping {}: outbound queue full", self.room.id(), player.short());
                } else {
                    info!("Room {} dropping {}: connection gone", self.room.id(), player.short());
                }
                self.room.leave(player, now_ms());
            }
        }
    }
}
