//! WebSocket Game Server
//!
//! Async WebSocket server for room lobbies and game sessions.
//! Each connection gets a player id, a bounded outbound queue drained by a
//! sender task, and a read loop that routes messages to the room registry.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock, broadcast};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::diagnostics::{Diagnostic, DiagnosticEvent, SharedSink};
use crate::game::catalog::{Catalog, CatalogError};
use crate::game::player::PlayerId;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::network::registry::RoomRegistry;
use crate::network::room::RoomConfig;

/// Outbound queue depth per connection.
const OUTBOUND_QUEUE_SIZE: usize = 64;

/// How long a closing connection may take to flush its queue.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Settings applied to every room.
    pub room: RoomConfig,
    /// Run seed for per-game RNG derivation; random when unset.
    pub run_seed: Option<u64>,
    /// Alternative catalog file; the embedded catalog when unset.
    pub catalog_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            room: RoomConfig::default(),
            run_seed: None,
            catalog_path: None,
        }
    }
}

impl ServerConfig {
    /// Read `FARAWAY_*` (and `PORT`) environment variables over the defaults.
    pub fn from_env() -> Result<Self, GameServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GameServerError> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            let port: u16 = parse_var("PORT", &port)?;
            config.bind_addr.set_port(port);
        }
        if let Some(addr) = lookup("FARAWAY_BIND_ADDR") {
            config.bind_addr = parse_var("FARAWAY_BIND_ADDR", &addr)?;
        }
        if let Some(max) = lookup("FARAWAY_MAX_CONNECTIONS") {
            config.max_connections = parse_var("FARAWAY_MAX_CONNECTIONS", &max)?;
        }
        if let Some(max) = lookup("FARAWAY_MAX_PLAYERS") {
            config.room.max_players = parse_var("FARAWAY_MAX_PLAYERS", &max)?;
            if config.room.max_players < config.room.min_players {
                return Err(GameServerError::Config(format!(
                    "FARAWAY_MAX_PLAYERS must be at least {}",
                    config.room.min_players
                )));
            }
        }
        if let Some(grace) = lookup("FARAWAY_START_GRACE_MS") {
            config.room.start_grace = Duration::from_millis(parse_var("FARAWAY_START_GRACE_MS", &grace)?);
        }
        if let Some(seed) = lookup("FARAWAY_RUN_SEED") {
            config.run_seed = Some(parse_var("FARAWAY_RUN_SEED", &seed)?);
        }
        if let Some(path) = lookup("FARAWAY_CATALOG") {
            config.catalog_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Load the configured catalog.
    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => Catalog::from_path(path),
            None => Catalog::standard(),
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, GameServerError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| GameServerError::Config(format!("{key}={value:?}: {e}")))
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Bad configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Connected client state.
struct ConnectedClient {
    /// Identity assigned on connect.
    player_id: PlayerId,
    /// Connection time.
    connected_at: Instant,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Rooms.
    registry: Arc<RoomRegistry>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Diagnostic records.
    sink: SharedSink,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig, catalog: Arc<Catalog>, sink: SharedSink) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let run_seed = config.run_seed.unwrap_or_else(rand_seed);
        let registry = RoomRegistry::new(config.room.clone(), catalog, sink.clone(), run_seed);

        Self {
            config,
            registry: Arc::new(registry),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            sink,
            shutdown_tx,
        }
    }

    /// Bind the configured address and run the server.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.run_with_listener(listener).await
    }

    /// Run the server on an already bound listener.
    #[instrument(skip_all)]
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                tokio::spawn(reject_connection(stream, addr));
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let registry = self.registry.clone();
        let sink = self.sink.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE_SIZE);
            let player_id = PlayerId::random();

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(addr, ConnectedClient {
                    player_id,
                    connected_at: Instant::now(),
                });
            }
            sink.record(&Diagnostic::connection(DiagnosticEvent::SocketConnected).player(player_id));

            // Spawn message sender task
            let mut sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            let _ = msg_tx.send(ServerMessage::WellConnected { player_id }).await;
            let _ = msg_tx.send(ServerMessage::Rooms { rooms: registry.list_rooms().await }).await;

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.send(ServerMessage::error(
                                            ErrorCode::InvalidInput,
                                            "Invalid message format",
                                        )).await;
                                        continue;
                                    }
                                };

                                Self::handle_client_message(player_id, client_msg, &registry, &msg_tx).await;
                            }
                            Some(Ok(Message::Binary(_))) => {
                                let _ = msg_tx.send(ServerMessage::error(
                                    ErrorCode::InvalidInput,
                                    "Binary frames are not supported",
                                )).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            if let Ok(room_id) = registry.leave_room(player_id).await {
                debug!("{} left room {} on disconnect", player_id.short(), room_id);
            }
            drop(msg_tx);
            if tokio::time::timeout(FLUSH_TIMEOUT, &mut sender_task).await.is_err() {
                sender_task.abort();
            }

            let removed = {
                let mut clients = clients.write().await;
                clients.remove(&addr)
            };
            sink.record(&Diagnostic::connection(DiagnosticEvent::SocketDisconnected).player(player_id));

            if let Some(client) = removed {
                info!(
                    "Client {} ({}) cleaned up after {:?}",
                    addr,
                    client.player_id.short(),
                    client.connected_at.elapsed()
                );
            }
        });
    }

    /// Handle a client message.
    async fn handle_client_message(
        player_id: PlayerId,
        msg: ClientMessage,
        registry: &RoomRegistry,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let action = msg.action();
        let result = match msg {
            ClientMessage::GetRooms => {
                let _ = sender.send(ServerMessage::Rooms { rooms: registry.list_rooms().await }).await;
                Ok(())
            }
            ClientMessage::CreateRoom => match registry.create_room(player_id, sender.clone()).await {
                Ok(room_id) => {
                    let _ = sender.send(ServerMessage::JoinedRoom { room_id }).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            ClientMessage::JoinRoom { room_id } => {
                registry.join_room(player_id, &room_id, sender.clone()).await
            }
            ClientMessage::LeaveRoom => registry.leave_room(player_id).await.map(|_| ()),
            ClientMessage::StartGame { room_id } => registry.start_game(player_id, &room_id).await,
            ClientMessage::UpdateAck { state_seq, .. } => {
                registry.acknowledge(player_id, state_seq).await
            }
            ClientMessage::PlayCard { .. }
            | ClientMessage::ShopChooseCard { .. }
            | ClientMessage::SanctuaryChoose { .. } => match action {
                // Rejections are answered by the room itself.
                Some(action) => registry.submit_action(player_id, action).await.map(|_| ()),
                None => Ok(()),
            },
        };

        if let Err(e) = result {
            debug!("{} request refused: {}", player_id.short(), e);
            if let Some(reply) = e.to_message() {
                let _ = sender.send(reply).await;
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get live room count.
    pub async fn room_count(&self) -> usize {
        self.registry.room_count().await
    }
}

/// Complete the handshake only to tell the client the server is full.
async fn reject_connection(stream: TcpStream, addr: SocketAddr) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    let msg = ServerMessage::error(ErrorCode::ServerOverloaded, "Connection limit reached");
    if let Ok(text) = msg.to_json() {
        let _ = ws.send(Message::Text(text)).await;
    }
    let _ = ws.close(None).await;
    debug!("Rejected {} at connection limit", addr);
}

/// Run seed when none is configured.
fn rand_seed() -> u64 {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(seed)
}
