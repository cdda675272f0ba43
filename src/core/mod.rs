//! Core deterministic primitives.
//!
//! Everything the game engine draws from randomness goes through here, so
//! a game can be replayed from its seed.

pub mod rng;

// Re-export core types
pub use rng::{DeterministicRng, derive_game_seed};
