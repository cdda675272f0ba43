//! Player actions and rejection codes.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A game action submitted by a seated player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "card", rename_all = "camelCase")]
pub enum Action {
    /// Play a region from hand.
    PlayCard(u32),
    /// Take a region from the shop offer.
    ShopChooseCard(u32),
    /// Keep one of the offered sanctuaries.
    SanctuaryChoose(u32),
}

impl Action {
    /// Wire name of the action.
    pub fn name(&self) -> &'static str {
        match self {
            Action::PlayCard(_) => "playCard",
            Action::ShopChooseCard(_) => "shopChooseCard",
            Action::SanctuaryChoose(_) => "sanctuaryChoose",
        }
    }

    /// Card (region or sanctuary id) the action refers to.
    pub fn card(&self) -> u32 {
        match self {
            Action::PlayCard(card) | Action::ShopChooseCard(card) | Action::SanctuaryChoose(card) => {
                *card
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.card())
    }
}

/// Why an action was refused. Rejections never mutate game state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    /// Action does not belong to the current phase.
    #[error("action not allowed in the current phase")]
    Phase,

    /// Player already played this sub-turn.
    #[error("player already played this turn")]
    AlreadyPlayed,

    /// Another player holds the shop pick.
    #[error("not this player's turn to pick")]
    NotYourTurn,

    /// Player has no sanctuary choice to make.
    #[error("player is not eligible for a sanctuary")]
    NotEligible,

    /// Card is not among the legal candidates.
    #[error("card not found among the candidates")]
    NotFound,

    /// Player has no seat in the running game.
    #[error("player is not seated in this game")]
    NotSeated,
}

impl RejectReason {
    /// Wire code.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::Phase => "phase",
            RejectReason::AlreadyPlayed => "alreadyPlayed",
            RejectReason::NotYourTurn => "notYourTurn",
            RejectReason::NotEligible => "notEligible",
            RejectReason::NotFound => "notFound",
            RejectReason::NotSeated => "notSeated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_accessors() {
        let action = Action::ShopChooseCard(42);
        assert_eq!(action.name(), "shopChooseCard");
        assert_eq!(action.card(), 42);
        assert_eq!(action.to_string(), "shopChooseCard(42)");
    }

    #[test]
    fn test_reject_reason_codes_match_serde() {
        for reason in [
            RejectReason::Phase,
            RejectReason::AlreadyPlayed,
            RejectReason::NotYourTurn,
            RejectReason::NotEligible,
            RejectReason::NotFound,
            RejectReason::NotSeated,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.code()));
        }
    }
}
