//! Room Registry
//!
//! Maps room ids to running room actors and players to the room they sit
//! in. Registry maps are guarded by their own locks; everything that touches
//! a single room goes through that room's command queue.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

use crate::diagnostics::{Diagnostic, DiagnosticEvent, SharedSink};
use crate::game::action::Action;
use crate::game::catalog::Catalog;
use crate::game::player::PlayerId;
use crate::network::protocol::{ErrorCode, RoomSummary, ServerMessage};
use crate::network::room::{
    CommandOutcome, JoinRejection, Room, RoomActor, RoomConfig, RoomHandle, RoomId, StartRejection,
};

/// Registry errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Player already sits in a room.
    #[error("player already in a room")]
    AlreadyInRoom,

    /// Player sits in no room.
    #[error("player not in a room")]
    NotInRoom,

    /// Join refused by the room.
    #[error("join refused: {0}")]
    Join(#[from] JoinRejection),

    /// Start refused by the room.
    #[error("start refused: {0}")]
    Start(#[from] StartRejection),
}

impl RegistryError {
    /// Reply for the requesting client, if it is told at all.
    pub fn to_message(&self) -> Option<ServerMessage> {
        match self {
            RegistryError::AlreadyInRoom => {
                Some(ServerMessage::error(ErrorCode::AlreadyInRoom, self.to_string()))
            }
            RegistryError::NotInRoom => {
                Some(ServerMessage::error(ErrorCode::NotInRoom, self.to_string()))
            }
            RegistryError::Join(rejection) => Some(rejection.message()),
            RegistryError::Start(rejection) => rejection.message(),
        }
    }
}

/// All rooms on this server.
pub struct RoomRegistry {
    rooms: RwLock<BTreeMap<RoomId, RoomHandle>>,
    player_rooms: RwLock<BTreeMap<PlayerId, RoomId>>,
    config: RoomConfig,
    catalog: Arc<Catalog>,
    sink: SharedSink,
    run_seed: u64,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new(config: RoomConfig, catalog: Arc<Catalog>, sink: SharedSink, run_seed: u64) -> Self {
        Self {
            rooms: RwLock::new(BTreeMap::new()),
            player_rooms: RwLock::new(BTreeMap::new()),
            config,
            catalog,
            sink,
            run_seed,
        }
    }

    /// Create a room with `player` seated in it.
    pub async fn create_room(
        &self,
        player: PlayerId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<RoomId, RegistryError> {
        let mut player_rooms = self.player_rooms.write().await;
        if player_rooms.contains_key(&player) {
            return Err(RegistryError::AlreadyInRoom);
        }

        let mut rooms = self.rooms.write().await;
        let mut id = RoomId::generate();
        while rooms.contains_key(&id) {
            id = RoomId::generate();
        }

        let room = Room::new(
            id.clone(),
            player,
            self.config.clone(),
            self.catalog.clone(),
            self.sink.clone(),
            self.run_seed,
        );
        rooms.insert(id.clone(), RoomActor::spawn(room, sender));
        player_rooms.insert(player, id.clone());

        info!("Room {} created by {}", id, player.short());
        Ok(id)
    }

    /// Seat `player` in an existing room.
    pub async fn join_room(
        &self,
        player: PlayerId,
        room_id: &RoomId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(), RegistryError> {
        if self.room_of(&player).await.is_some() {
            return Err(RegistryError::AlreadyInRoom);
        }

        let Some(handle) = self.handle(room_id).await else {
            self.sink.record(
                &Diagnostic::server(DiagnosticEvent::RoomJoinRejected {
                    reason: JoinRejection::NotFound,
                })
                .game(room_id.as_str())
                .player(player),
            );
            return Err(JoinRejection::NotFound.into());
        };

        handle.join(player, sender).await?;
        self.player_rooms.write().await.insert(player, room_id.clone());
        Ok(())
    }

    /// Remove `player` from their room; drops the room once empty.
    pub async fn leave_room(&self, player: PlayerId) -> Result<RoomId, RegistryError> {
        let room_id = self
            .player_rooms
            .write()
            .await
            .remove(&player)
            .ok_or(RegistryError::NotInRoom)?;

        if let Some(handle) = self.handle(&room_id).await {
            if handle.leave(player).await == 0 {
                self.rooms.write().await.remove(&room_id);
                info!("Room {} destroyed", room_id);
            }
        }
        Ok(room_id)
    }

    /// Ask a room to begin its game.
    pub async fn start_game(&self, player: PlayerId, room_id: &RoomId) -> Result<(), RegistryError> {
        let handle = self
            .handle(room_id)
            .await
            .ok_or(RegistryError::Start(StartRejection::NotFound))?;
        handle.start(player).await?;
        Ok(())
    }

    /// Route a game action to the player's room.
    pub async fn submit_action(
        &self,
        player: PlayerId,
        action: Action,
    ) -> Result<CommandOutcome, RegistryError> {
        let handle = self.player_handle(&player).await?;
        Ok(handle.submit(player, action).await)
    }

    /// Route an update ack to the player's room.
    pub async fn acknowledge(&self, player: PlayerId, state_seq: u64) -> Result<(), RegistryError> {
        let handle = self.player_handle(&player).await?;
        handle.acknowledge(player, state_seq).await;
        Ok(())
    }

    /// Summaries of every live room, ordered by id.
    ///
    /// Built from each room's last published summary, so a busy or stuck
    /// room never holds up the lobby.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        self.rooms
            .read()
            .await
            .values()
            .filter_map(RoomHandle::summary)
            .collect()
    }

    /// Room the player sits in.
    pub async fn room_of(&self, player: &PlayerId) -> Option<RoomId> {
        self.player_rooms.read().await.get(player).cloned()
    }

    /// Live room count.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    async fn handle(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.read().await.get(room_id).cloned()
    }

    async fn player_handle(&self, player: &PlayerId) -> Result<RoomHandle, RegistryError> {
        let room_id = self.room_of(player).await.ok_or(RegistryError::NotInRoom)?;
        self.handle(&room_id).await.ok_or(RegistryError::NotInRoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    use crate::diagnostics::MemorySink;
    use crate::game::action::RejectReason;

    fn registry(sink: Arc<MemorySink>) -> RoomRegistry {
        let catalog = Arc::new(Catalog::standard().unwrap());
        RoomRegistry::new(RoomConfig::default(), catalog, sink, 7)
    }

    fn channel() -> (mpsc::Sender<ServerMessage>, mpsc::Receiver<ServerMessage>) {
        mpsc::channel(64)
    }

    #[tokio::test]
    async fn test_create_join_leave_lifecycle() {
        let registry = registry(Arc::new(MemorySink::new()));
        let a = PlayerId::random();
        let b = PlayerId::random();
        let (tx_a, _rx_a) = channel();
        let (tx_b, _rx_b) = channel();

        let id = registry.create_room(a, tx_a).await.unwrap();
        registry.join_room(b, &id, tx_b).await.unwrap();

        let rooms = registry.list_rooms().await;
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].users, vec![a, b]);
        assert!(!rooms[0].state);

        assert_eq!(registry.leave_room(a).await, Ok(id.clone()));
        assert_eq!(registry.room_count().await, 1);
        assert_eq!(registry.leave_room(b).await, Ok(id));
        assert_eq!(registry.room_count().await, 0);
        assert_eq!(registry.leave_room(b).await, Err(RegistryError::NotInRoom));
    }

    #[tokio::test]
    async fn test_one_room_per_player() {
        let registry = registry(Arc::new(MemorySink::new()));
        let a = PlayerId::random();
        let (tx, _rx) = channel();

        let id = registry.create_room(a, tx.clone()).await.unwrap();
        assert_eq!(registry.create_room(a, tx.clone()).await, Err(RegistryError::AlreadyInRoom));
        assert_eq!(registry.join_room(a, &id, tx).await, Err(RegistryError::AlreadyInRoom));
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let sink = Arc::new(MemorySink::new());
        let registry = registry(sink.clone());
        let a = PlayerId::random();
        let (tx, _rx) = channel();
        let missing = RoomId::from("nope0");

        let err = registry.join_room(a, &missing, tx).await.unwrap_err();
        assert_eq!(err, RegistryError::Join(JoinRejection::NotFound));
        assert_eq!(err.to_message(), Some(ServerMessage::RoomNotFound));
        assert_eq!(
            sink.count(|d| matches!(d.event, DiagnosticEvent::RoomJoinRejected { .. })),
            1
        );

        let err = registry.start_game(a, &missing).await.unwrap_err();
        assert_eq!(err.to_message(), Some(ServerMessage::RoomNotFound));
    }

    #[tokio::test]
    async fn test_actions_need_a_room() {
        let registry = registry(Arc::new(MemorySink::new()));
        let a = PlayerId::random();

        let err = registry.submit_action(a, Action::PlayCard(1)).await.unwrap_err();
        assert_eq!(err, RegistryError::NotInRoom);
        assert!(matches!(err.to_message(), Some(ServerMessage::Error(_))));
        assert_eq!(registry.acknowledge(a, 1).await, Err(RegistryError::NotInRoom));
    }

    #[tokio::test]
    async fn test_start_and_play_through_registry() {
        let registry = registry(Arc::new(MemorySink::new()));
        let a = PlayerId::random();
        let b = PlayerId::random();
        let (tx_a, mut rx_a) = channel();
        let (tx_b, _rx_b) = channel();

        let id = registry.create_room(a, tx_a).await.unwrap();
        assert_eq!(
            registry.start_game(a, &id).await,
            Err(RegistryError::Start(StartRejection::NotEnoughPlayers))
        );

        registry.join_room(b, &id, tx_b).await.unwrap();
        registry.start_game(b, &id).await.unwrap();
        let ignored = registry.start_game(a, &id).await.unwrap_err();
        assert_eq!(ignored.to_message(), None);

        // Drain until the game state shows up.
        let hand = loop {
            match rx_a.recv().await {
                Some(ServerMessage::Update(snapshot)) if snapshot.players.is_some() => {
                    break snapshot.players.unwrap()[&a].hand.clone();
                }
                Some(_) => continue,
                None => panic!("room closed"),
            }
        };

        let outcome = registry.submit_action(a, Action::PlayCard(hand[0])).await.unwrap();
        assert!(matches!(outcome, CommandOutcome::Accepted(_)));
        let outcome = registry.submit_action(a, Action::PlayCard(hand[1])).await.unwrap();
        assert_eq!(outcome, CommandOutcome::Rejected(RejectReason::AlreadyPlayed));

        let c = PlayerId::random();
        let (tx_c, _rx_c) = channel();
        assert_eq!(
            registry.join_room(c, &id, tx_c).await,
            Err(RegistryError::Join(JoinRejection::Started))
        );
        assert_eq!(registry.room_of(&c).await, None);
    }

    #[tokio::test]
    async fn test_stalled_client_does_not_block_room_or_lobby() {
        let sink = Arc::new(MemorySink::new());
        let registry = registry(sink.clone());
        let a = PlayerId::random();
        let b = PlayerId::random();
        let wait = Duration::from_secs(5);

        // A never reads its queue.
        let (tx_a, _rx_a) = mpsc::channel(1);
        let (tx_b, mut rx_b) = channel();

        let id = registry.create_room(a, tx_a).await.unwrap();
        registry.join_room(b, &id, tx_b).await.unwrap();
        registry.start_game(b, &id).await.unwrap();

        let hand = loop {
            match timeout(wait, rx_b.recv()).await.unwrap() {
                Some(ServerMessage::Update(snapshot)) if snapshot.players.is_some() => {
                    break snapshot.players.unwrap()[&b].hand.clone();
                }
                Some(_) => continue,
                None => panic!("room closed"),
            }
        };

        let outcome = timeout(wait, registry.submit_action(b, Action::PlayCard(hand[0])))
            .await
            .expect("room stalled")
            .unwrap();
        assert!(matches!(outcome, CommandOutcome::Accepted(_)));

        let rooms = timeout(wait, registry.list_rooms()).await.expect("lobby stalled");
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].users, vec![b]);

        // The stalled client's own disconnect still cleans up.
        assert_eq!(registry.leave_room(a).await, Ok(id.clone()));
        assert_eq!(registry.room_count().await, 1);
        assert_eq!(registry.leave_room(b).await, Ok(id));
        assert_eq!(registry.room_count().await, 0);
    }
}
