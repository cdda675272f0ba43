//! Player identity and per-player game state.

use std::fmt;
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::game::catalog::{Catalog, RegionId, SanctuaryId};

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier, assigned per connection.
///
/// Implements Ord for deterministic BTreeMap ordering. Serialized as the
/// hyphenated UUID string, so it can key JSON objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Identifier from a fixed integer (tests, replays).
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0.as_bytes()[..4])
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// PLAYER STATE
// =============================================================================

/// State of a single player in a running game.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// Region cards in hand.
    pub hand: Vec<RegionId>,

    /// Region cards played, in play order (append-only).
    pub played_cards: Vec<RegionId>,

    /// Sanctuary tiles kept, in pick order (append-only).
    pub played_sanctuaries: Vec<SanctuaryId>,

    /// Sanctuary candidates offered this sanctuary phase.
    pub sanctuary_choose: Vec<SanctuaryId>,

    /// Player is done for the current phase.
    pub has_played: bool,

    /// Player holds the current pick (shop or sanctuary).
    pub has_to_choose: bool,
}

impl PlayerState {
    /// Empty state at game start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-phase flags and any leftover sanctuary offer.
    pub fn reset_phase(&mut self) {
        self.has_played = false;
        self.has_to_choose = false;
        self.sanctuary_choose.clear();
    }

    /// Most recently played region.
    pub fn last_played(&self) -> Option<RegionId> {
        self.played_cards.last().copied()
    }

    /// Region played the turn before the most recent one.
    pub fn previous_played(&self) -> Option<RegionId> {
        let len = self.played_cards.len();
        if len < 2 {
            return None;
        }
        self.played_cards.get(len - 2).copied()
    }

    /// True when the last played card is worth more than the one before it,
    /// which earns a sanctuary pick.
    pub fn earned_sanctuary(&self) -> bool {
        match (self.last_played(), self.previous_played()) {
            (Some(last), Some(previous)) => last > previous,
            _ => false,
        }
    }

    /// Clues on played regions and kept sanctuaries.
    pub fn count_clues(&self, catalog: &Catalog) -> usize {
        let from_sanctuaries = self.played_sanctuaries
            .iter()
            .filter_map(|id| catalog.sanctuary(*id))
            .filter(|card| card.clue)
            .count();
        let from_regions = self.played_cards
            .iter()
            .filter_map(|id| catalog.region(*id))
            .filter(|card| card.clue)
            .count();
        from_sanctuaries + from_regions
    }
}
