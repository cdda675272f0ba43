//! Game Logic Module
//!
//! The card-game engine. 100% deterministic: no I/O, no clocks, all draws
//! from the game's seeded RNG.
//!
//! ## Module Structure
//!
//! - `catalog`: Region and sanctuary definitions
//! - `pool`: Draw pools for undealt cards
//! - `player`: Player identity and per-player state
//! - `action`: Player actions and rejection codes
//! - `state`: Game state and phase machine
//! - `scoring`: End-of-game scoring
//! - `events`: Engine events for diagnostics

pub mod catalog;
pub mod pool;
pub mod player;
pub mod action;
pub mod state;
pub mod scoring;
pub mod events;

// Re-export key types
pub use catalog::{Catalog, CatalogError, CardDefinition, FameRule, Attribute, RegionId, SanctuaryId};
pub use pool::{DrawPool, PoolError};
pub use player::{PlayerId, PlayerState};
pub use action::{Action, RejectReason};
pub use state::{GameState, Phase};
pub use scoring::{score, ScoreEntry};
pub use events::GameEvent;
