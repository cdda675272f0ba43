//! Game Events
//!
//! Notable engine transitions, queued on the game state and drained by the
//! room after every command to feed the diagnostic sink.

use serde::Serialize;

use crate::game::catalog::SanctuaryId;
use crate::game::player::PlayerId;
use crate::game::scoring::ScoreEntry;
use crate::game::state::Phase;

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GameEvent {
    /// Sanctuary candidates were drawn for a player.
    SanctuaryOffered {
        /// Player who must choose.
        player: PlayerId,
        /// Candidates, in draw order.
        cards: Vec<SanctuaryId>,
    },

    /// Phase changed.
    PhaseChanged {
        /// Phase left.
        from: Phase,
        /// Phase entered.
        to: Phase,
        /// Turn at the moment of the change.
        turn: u8,
    },

    /// Scoring finished. Scores are in seat order.
    GameFinished {
        /// Every player holding the best total.
        winners: Vec<PlayerId>,
        /// Final breakdown per seat.
        scores: Vec<(PlayerId, ScoreEntry)>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = GameEvent::PhaseChanged { from: Phase::Shop, to: Phase::Play, turn: 3 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "phaseChanged");
        assert_eq!(json["from"], "shop");
        assert_eq!(json["to"], "play");
        assert_eq!(json["turn"], 3);
    }
}
