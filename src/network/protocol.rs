//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every message is a JSON text frame: an object tagged by `"type"`, with
//! camelCase field names.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::game::action::{Action, RejectReason};
use crate::game::catalog::RegionId;
use crate::game::player::{PlayerId, PlayerState};
use crate::game::scoring::ScoreEntry;
use crate::game::state::Phase;
use crate::network::room::RoomId;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// List open rooms.
    GetRooms,

    /// Create a room and sit in it.
    CreateRoom,

    /// Join an existing room.
    JoinRoom {
        /// Room to join.
        room_id: RoomId,
    },

    /// Leave the current room.
    LeaveRoom,

    /// Begin the game in a room.
    StartGame {
        /// Room to start.
        room_id: RoomId,
    },

    /// Play a region from hand.
    PlayCard {
        /// Region id.
        card: u32,
    },

    /// Take a region from the shop.
    ShopChooseCard {
        /// Region id.
        card: u32,
    },

    /// Keep an offered sanctuary.
    SanctuaryChoose {
        /// 1-based sanctuary id.
        card: u32,
    },

    /// Acknowledge a received update.
    UpdateAck {
        /// Sequence of the update received.
        state_seq: u64,
        /// Client clock when it arrived, informational.
        #[serde(default)]
        client_time: Option<i64>,
    },
}

impl ClientMessage {
    /// The game action carried by this message, if any.
    pub fn action(&self) -> Option<Action> {
        match self {
            ClientMessage::PlayCard { card } => Some(Action::PlayCard(*card)),
            ClientMessage::ShopChooseCard { card } => Some(Action::ShopChooseCard(*card)),
            ClientMessage::SanctuaryChoose { card } => Some(Action::SanctuaryChoose(*card)),
            _ => None,
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Connection accepted; identity assigned.
    WellConnected {
        /// Identity for this connection.
        player_id: PlayerId,
    },

    /// Open rooms.
    Rooms {
        /// Live rooms, ordered by id.
        rooms: Vec<RoomSummary>,
    },

    /// Room created; the creator is seated in it.
    JoinedRoom {
        /// The new room.
        room_id: RoomId,
    },

    /// Join accepted; sent to the joiner only.
    RoomJoined(RoomSnapshot),

    /// Join refused: room at capacity.
    RoomFull,

    /// Join refused: game already began.
    RoomStarted,

    /// Room does not exist.
    RoomNotFound,

    /// Start refused: too few players.
    NotEnoughPlayers,

    /// Game created; first update follows after the grace period.
    BeginGame(BeginGameInfo),

    /// Authoritative room state.
    Update(RoomSnapshot),

    /// The sender's action was refused. Not broadcast.
    ActionRejected {
        /// Wire name of the refused action.
        action: String,
        /// Card it referenced.
        card: u32,
        /// Reason code.
        reason: RejectReason,
    },

    /// Malformed input or lifecycle error.
    Error(ServerError),

    /// Server is going away.
    Shutdown {
        /// Human-readable cause.
        reason: String,
    },
}

/// Room list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    /// Room identifier.
    pub room_id: RoomId,
    /// Seated players in join order.
    pub users: Vec<PlayerId>,
    /// Game is running (grace period over).
    pub state: bool,
    /// Capacity.
    pub max_players: usize,
}

/// Full room state as broadcast in `update` and `roomJoined`.
///
/// Game fields are absent until a game begins. Pools are exposed by size
/// only; `score` is ordered like `users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// Room identifier.
    pub room_id: RoomId,
    /// Seated players in join order.
    pub users: Vec<PlayerId>,
    /// Game is running (grace period over).
    pub state: bool,
    /// Capacity.
    pub max_players: usize,
    /// Protocol version.
    pub protocol_version: u32,
    /// Server clock, epoch milliseconds.
    pub server_time: i64,
    /// Broadcast sequence this snapshot belongs to.
    pub state_seq: u64,

    /// Current phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// Current turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<u8>,
    /// Per-player state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<BTreeMap<PlayerId, PlayerState>>,
    /// Shop offer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop: Option<Vec<RegionId>>,
    /// Shop pick order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_order: Option<Vec<PlayerId>>,
    /// Undealt regions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<usize>,
    /// Undrawn sanctuaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanctuary_pool_size: Option<usize>,
    /// Winners once the game ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Vec<PlayerId>>,
    /// Scores once the game ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Vec<ScoreEntry>>,
}

/// Payload of `beginGame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginGameInfo {
    /// Protocol version.
    pub protocol_version: u32,
    /// Server clock, epoch milliseconds.
    pub server_time: i64,
    /// Game identifier (the room id).
    pub game_id: RoomId,
}

/// Error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    /// Frame could not be parsed.
    InvalidInput,
    /// Player already sits in a room.
    AlreadyInRoom,
    /// Player sits in no room.
    NotInRoom,
    /// Connection limit reached.
    ServerOverloaded,
    /// Unexpected server failure.
    InternalError,
}

impl ServerMessage {
    /// Error message shorthand.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError {
            code,
            message: message.into(),
        })
    }

    /// Rejection notice for an action.
    pub fn action_rejected(action: Action, reason: RejectReason) -> Self {
        ServerMessage::ActionRejected {
            action: action.name().to_string(),
            card: action.card(),
            reason,
        }
    }
}

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
