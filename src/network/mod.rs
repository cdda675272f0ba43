//! Network Layer
//!
//! WebSocket server, room actors and the wire protocol.
//! This layer is **non-deterministic** - all game rules run through `game/`.

pub mod protocol;
pub mod sync;
pub mod room;
pub mod registry;
pub mod server;

pub use protocol::{
    ClientMessage, ServerMessage, RoomSnapshot, RoomSummary, BeginGameInfo, ErrorCode,
};
pub use sync::{SyncTracker, AckOutcome};
pub use room::{
    Room, RoomId, RoomConfig, RoomHandle, RoomActor, CommandOutcome, JoinRejection, StartRejection,
};
pub use registry::{RoomRegistry, RegistryError};
pub use server::{GameServer, ServerConfig, GameServerError};
