//! # Faraway Game Server
//!
//! Session server for the Faraway card game: rooms, draw pools, the phase
//! machine, scoring and the state sync protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    FARAWAY SERVER                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── rng.rs      - Xorshift128+ PRNG, per-game seeds         │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── catalog.rs  - Region and sanctuary definitions          │
//! │  ├── pool.rs     - Draw pools                                │
//! │  ├── player.rs   - Player identity and state                 │
//! │  ├── action.rs   - Actions and rejection codes               │
//! │  ├── state.rs    - Phase machine                             │
//! │  ├── scoring.rs  - End-of-game scoring                       │
//! │  └── events.rs   - Engine events                             │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── sync.rs     - State sequence and ack latency            │
//! │  ├── room.rs     - Per-room actor                            │
//! │  └── registry.rs - Room registry                             │
//! │                                                              │
//! │  diagnostics.rs  - Structured diagnostic records             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given the same run seed, game id, seating and action sequence, a game
//! deals, offers and scores identically.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod diagnostics;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use game::catalog::Catalog;
pub use game::player::{PlayerId, PlayerState};
pub use game::state::{GameState, Phase};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wire protocol version sent in `beginGame` and every snapshot.
pub const PROTOCOL_VERSION: u32 = 1;

/// Play rounds per game (cards played per player).
pub const TOTAL_TURNS: u8 = 8;

/// Turn index of the final play round; no shop follows it.
pub const LAST_TURN: u8 = TOTAL_TURNS - 1;

/// Regions dealt to each player at game start.
pub const HAND_SIZE: usize = 3;

/// Smallest shop offer (before clamping to the pool).
pub const MIN_SHOP_SIZE: usize = 3;

/// Players needed to start a game.
pub const MIN_PLAYERS: usize = 2;

/// Default room capacity.
pub const DEFAULT_MAX_PLAYERS: usize = 6;

/// Delay between `beginGame` and the room being marked started (ms).
pub const START_GRACE_MS: u64 = 300;
