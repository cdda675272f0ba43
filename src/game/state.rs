//! Game State
//!
//! Authoritative state of one running game and its phase machine:
//!
//! ```text
//! play ──(turn 0)──────────────► shop ──► play (turn + 1) ──► ...
//!   └──(turn > 0)──► sanctuary ──┘
//! ```
//!
//! The game ends when the eighth play round completes (shop entry at turn 7)
//! or when the turn counter reaches 8 on shop exit. Completion is re-checked
//! after every accepted action and every seat removal; nothing is polled.
//!
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::action::{Action, RejectReason};
use crate::game::catalog::{Catalog, RegionId, SanctuaryId};
use crate::game::events::GameEvent;
use crate::game::player::{PlayerId, PlayerState};
use crate::game::pool::DrawPool;
use crate::game::scoring::{self, ScoreEntry};
use crate::{HAND_SIZE, LAST_TURN, MIN_SHOP_SIZE, TOTAL_TURNS};

// =============================================================================
// PHASE
// =============================================================================

/// Game phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Every player plays one region from hand.
    Play,
    /// Players who played a higher region than before pick a sanctuary.
    Sanctuary,
    /// Players take turns picking a region from the shop.
    Shop,
    /// Game over, scores final.
    End,
}

impl Phase {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Play => "play",
            Phase::Sanctuary => "sanctuary",
            Phase::Shop => "shop",
            Phase::End => "end",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete state of one game.
#[derive(Clone, Debug)]
pub struct GameState {
    phase: Phase,
    turn: u8,

    /// Seated players in join order.
    seats: Vec<PlayerId>,

    /// Per-player state (BTreeMap for deterministic iteration).
    players: BTreeMap<PlayerId, PlayerState>,

    region_pool: DrawPool,
    sanctuary_pool: DrawPool,

    /// Current shop offer.
    shop: Vec<RegionId>,

    /// Shop pick order, ascending by last played region.
    shop_order: Vec<PlayerId>,

    /// Winners, set once on entering `End`.
    winner: Option<Vec<PlayerId>>,

    /// Scores in seat order, set once on entering `End`.
    score: Option<Vec<ScoreEntry>>,

    rng: DeterministicRng,
    catalog: Arc<Catalog>,

    /// Events since the last drain.
    pending_events: Vec<GameEvent>,
}

impl GameState {
    /// Start a game: fill both pools, deal a hand to every seat in order.
    pub fn new(seats: Vec<PlayerId>, catalog: Arc<Catalog>, mut rng: DeterministicRng) -> Self {
        let mut region_pool = DrawPool::new(catalog.region_ids());
        let sanctuary_pool = DrawPool::new(catalog.sanctuary_ids());

        let mut players = BTreeMap::new();
        for id in &seats {
            let mut state = PlayerState::new();
            state.hand = region_pool.draw_up_to(&mut rng, HAND_SIZE);
            players.insert(*id, state);
        }

        Self {
            phase: Phase::Play,
            turn: 0,
            seats,
            players,
            region_pool,
            sanctuary_pool,
            shop: Vec::new(),
            shop_order: Vec::new(),
            winner: None,
            score: None,
            rng,
            catalog,
            pending_events: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current turn (0..=7, 8 only after the last shop).
    pub fn turn(&self) -> u8 {
        self.turn
    }

    /// Seated players in join order.
    pub fn seats(&self) -> &[PlayerId] {
        &self.seats
    }

    /// All player states.
    pub fn players(&self) -> &BTreeMap<PlayerId, PlayerState> {
        &self.players
    }

    /// One player's state.
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.players.get(id)
    }

    /// Current shop offer.
    pub fn shop(&self) -> &[RegionId] {
        &self.shop
    }

    /// Current shop pick order.
    pub fn shop_order(&self) -> &[PlayerId] {
        &self.shop_order
    }

    /// Undealt regions.
    pub fn region_pool(&self) -> &DrawPool {
        &self.region_pool
    }

    /// Undrawn sanctuaries.
    pub fn sanctuary_pool(&self) -> &DrawPool {
        &self.sanctuary_pool
    }

    /// Winners once the game has ended.
    pub fn winner(&self) -> Option<&[PlayerId]> {
        self.winner.as_deref()
    }

    /// Scores in seat order once the game has ended.
    pub fn score(&self) -> Option<&[ScoreEntry]> {
        self.score.as_deref()
    }

    /// Catalog the game is played with.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Whether the game reached `End`.
    pub fn is_ended(&self) -> bool {
        self.phase == Phase::End
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Actions the player could submit right now without rejection.
    pub fn legal_actions(&self, id: &PlayerId) -> Vec<Action> {
        let Some(state) = self.players.get(id) else {
            return Vec::new();
        };
        match self.phase {
            Phase::Play if !state.has_played => {
                state.hand.iter().map(|card| Action::PlayCard(*card)).collect()
            }
            Phase::Shop if state.has_to_choose => {
                self.shop.iter().map(|card| Action::ShopChooseCard(*card)).collect()
            }
            Phase::Sanctuary if state.has_to_choose => state
                .sanctuary_choose
                .iter()
                .map(|card| Action::SanctuaryChoose(*card))
                .collect(),
            _ => Vec::new(),
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Apply one player action, then advance phases if it completed one.
    ///
    /// A rejected action leaves the state untouched.
    pub fn apply(&mut self, id: PlayerId, action: Action) -> Result<(), RejectReason> {
        match action {
            Action::PlayCard(card) => self.play_card(id, card)?,
            Action::ShopChooseCard(card) => self.shop_choose_card(id, card)?,
            Action::SanctuaryChoose(card) => self.sanctuary_choose(id, card)?,
        }
        self.advance();
        Ok(())
    }

    fn play_card(&mut self, id: PlayerId, card: RegionId) -> Result<(), RejectReason> {
        if self.phase != Phase::Play {
            return Err(RejectReason::Phase);
        }
        let state = self.players.get_mut(&id).ok_or(RejectReason::NotSeated)?;
        if state.has_played {
            return Err(RejectReason::AlreadyPlayed);
        }
        let index = state.hand
            .iter()
            .position(|c| *c == card)
            .ok_or(RejectReason::NotFound)?;

        state.hand.remove(index);
        state.played_cards.push(card);
        state.has_played = true;
        Ok(())
    }

    fn shop_choose_card(&mut self, id: PlayerId, card: RegionId) -> Result<(), RejectReason> {
        if self.phase != Phase::Shop {
            return Err(RejectReason::Phase);
        }
        let state = self.players.get_mut(&id).ok_or(RejectReason::NotSeated)?;
        if !state.has_to_choose {
            return Err(RejectReason::NotYourTurn);
        }
        let index = self.shop
            .iter()
            .position(|c| *c == card)
            .ok_or(RejectReason::NotFound)?;

        self.shop.remove(index);
        state.hand.push(card);
        state.has_to_choose = false;
        state.has_played = true;

        self.grant_next_pick();
        Ok(())
    }

    fn sanctuary_choose(&mut self, id: PlayerId, card: SanctuaryId) -> Result<(), RejectReason> {
        if self.phase != Phase::Sanctuary {
            return Err(RejectReason::Phase);
        }
        let state = self.players.get_mut(&id).ok_or(RejectReason::NotSeated)?;
        if !state.has_to_choose {
            return Err(RejectReason::NotEligible);
        }
        let index = state.sanctuary_choose
            .iter()
            .position(|c| *c == card)
            .ok_or(RejectReason::NotFound)?;

        state.sanctuary_choose.remove(index);
        state.played_sanctuaries.push(card);
        state.has_to_choose = false;
        state.has_played = true;
        Ok(())
    }

    /// Remove a departing player and let the others carry on.
    ///
    /// Returns false if the player had no seat. A finished game is frozen:
    /// seats, tableaux and scores stay as they were scored.
    pub fn remove_player(&mut self, id: &PlayerId) -> bool {
        if self.phase == Phase::End {
            return false;
        }
        let Some(index) = self.seats.iter().position(|seat| seat == id) else {
            return false;
        };
        self.seats.remove(index);
        self.players.remove(id);
        self.shop_order.retain(|seat| seat != id);

        if self.phase == Phase::Shop {
            self.grant_next_pick();
        }
        self.advance();
        true
    }

    // =========================================================================
    // Phase machine
    // =========================================================================

    /// Every seated player is done with the current phase.
    fn all_done(&self) -> bool {
        !self.seats.is_empty()
            && self.seats
                .iter()
                .all(|id| self.players.get(id).is_none_or(|state| state.has_played))
    }

    /// Run transitions until a phase is waiting on a player or the game ended.
    fn advance(&mut self) {
        while self.phase != Phase::End && self.all_done() {
            match self.phase {
                Phase::Play if self.turn == 0 => self.enter_shop(),
                Phase::Play => self.enter_sanctuary(),
                Phase::Sanctuary => self.enter_shop(),
                Phase::Shop => self.leave_shop(),
                Phase::End => break,
            }
        }
    }

    fn set_phase(&mut self, to: Phase) {
        let from = self.phase;
        self.phase = to;
        self.pending_events.push(GameEvent::PhaseChanged { from, to, turn: self.turn });
    }

    fn reset_flags(&mut self) {
        for state in self.players.values_mut() {
            state.reset_phase();
        }
    }

    fn enter_sanctuary(&mut self) {
        self.reset_flags();
        self.set_phase(Phase::Sanctuary);

        for id in &self.seats {
            let Some(state) = self.players.get_mut(id) else {
                continue;
            };
            if !state.earned_sanctuary() {
                state.has_played = true;
                continue;
            }

            let count = state.count_clues(&self.catalog) + 1;
            let offer = self.sanctuary_pool.draw_up_to(&mut self.rng, count);
            if offer.is_empty() {
                state.has_played = true;
                continue;
            }
            state.has_to_choose = true;
            state.sanctuary_choose = offer.clone();
            self.pending_events.push(GameEvent::SanctuaryOffered { player: *id, cards: offer });
        }
    }

    fn enter_shop(&mut self) {
        // The eighth play round has no shop after it.
        if self.turn >= LAST_TURN {
            for state in self.players.values_mut() {
                state.has_played = true;
            }
            self.finish();
            return;
        }

        self.reset_flags();
        self.set_phase(Phase::Shop);

        let size = MIN_SHOP_SIZE.max(self.seats.len() + 1);
        self.shop = self.region_pool.draw_up_to(&mut self.rng, size);

        // Stable sort: ties keep seat order.
        let mut order = self.seats.clone();
        order.sort_by_key(|id| self.players.get(id).and_then(PlayerState::last_played));
        self.shop_order = order;

        self.grant_next_pick();
    }

    /// Hand the shop pick to the first player in order who has not picked.
    ///
    /// With the offer exhausted, everyone still waiting is marked done.
    fn grant_next_pick(&mut self) {
        if self.players.values().any(|state| state.has_to_choose) {
            return;
        }
        for id in &self.shop_order {
            let Some(state) = self.players.get_mut(id) else {
                continue;
            };
            if state.has_played {
                continue;
            }
            if self.shop.is_empty() {
                state.has_played = true;
            } else {
                state.has_to_choose = true;
                return;
            }
        }
    }

    fn leave_shop(&mut self) {
        self.shop.clear();
        self.shop_order.clear();
        self.turn += 1;

        if self.turn >= TOTAL_TURNS {
            self.finish();
            return;
        }
        self.reset_flags();
        self.set_phase(Phase::Play);
    }

    fn finish(&mut self) {
        let scores: Vec<(PlayerId, ScoreEntry)> = self.seats
            .iter()
            .filter_map(|id| {
                self.players
                    .get(id)
                    .map(|state| (*id, scoring::score(state, &self.catalog)))
            })
            .collect();
        let winners = scoring::winners(&scores);

        self.set_phase(Phase::End);
        self.winner = Some(winners.clone());
        self.score = Some(scores.iter().map(|(_, entry)| entry.clone()).collect());
        self.pending_events.push(GameEvent::GameFinished { winners, scores });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const A: PlayerId = PlayerId::from_u128(1);
    const B: PlayerId = PlayerId::from_u128(2);
    const C: PlayerId = PlayerId::from_u128(3);

    fn new_game(seats: &[PlayerId], seed: u64) -> GameState {
        let catalog = Arc::new(Catalog::standard().unwrap());
        GameState::new(seats.to_vec(), catalog, DeterministicRng::new(seed))
    }

    /// Submit the first legal action of whoever can act.
    fn step(game: &mut GameState) -> bool {
        let seats = game.seats().to_vec();
        for id in seats {
            if let Some(action) = game.legal_actions(&id).first().copied() {
                game.apply(id, action).unwrap();
                return true;
            }
        }
        false
    }

    fn play_all(game: &mut GameState) {
        for id in game.seats().to_vec() {
            let card = game.player(&id).unwrap().hand[0];
            game.apply(id, Action::PlayCard(card)).unwrap();
        }
    }

    #[test]
    fn test_new_game_deals_hands() {
        let game = new_game(&[A, B, C], 1);

        assert_eq!(game.phase(), Phase::Play);
        assert_eq!(game.turn(), 0);
        for id in [A, B, C] {
            assert_eq!(game.player(&id).unwrap().hand.len(), HAND_SIZE);
        }
        assert_eq!(game.region_pool().len(), 77 - 9);
        assert_eq!(game.sanctuary_pool().len(), 53);
        assert!(game.shop().is_empty());
    }

    #[test]
    fn test_turn_zero_skips_sanctuary() {
        let mut game = new_game(&[A, B], 7);

        let card = game.player(&A).unwrap().hand[0];
        game.apply(A, Action::PlayCard(card)).unwrap();
        assert_eq!(game.phase(), Phase::Play);

        let card = game.player(&B).unwrap().hand[0];
        game.apply(B, Action::PlayCard(card)).unwrap();

        assert_eq!(game.phase(), Phase::Shop);
        assert_eq!(game.turn(), 0);
        assert_eq!(game.shop().len(), 3);
        assert_eq!(game.region_pool().len(), 77 - 6 - 3);

        // Lowest last-played region picks first.
        let order = game.shop_order();
        let last = |id: &PlayerId| game.player(id).unwrap().last_played();
        assert!(last(&order[0]) <= last(&order[1]));
        assert!(game.player(&order[0]).unwrap().has_to_choose);
        assert!(!game.player(&order[1]).unwrap().has_to_choose);
    }

    #[test]
    fn test_shop_size_scales_with_players() {
        let seats: Vec<PlayerId> = (1..=6).map(PlayerId::from_u128).collect();
        let mut game = new_game(&seats, 3);
        play_all(&mut game);

        assert_eq!(game.phase(), Phase::Shop);
        assert_eq!(game.shop().len(), 7);
    }

    #[test]
    fn test_rejections_leave_state_untouched() {
        let mut game = new_game(&[A, B], 11);
        let card = game.player(&A).unwrap().hand[0];
        game.apply(A, Action::PlayCard(card)).unwrap();
        let before = game.player(&A).unwrap().clone();

        let other = game.player(&A).unwrap().hand[0];
        for _ in 0..2 {
            assert_eq!(game.apply(A, Action::PlayCard(other)), Err(RejectReason::AlreadyPlayed));
        }
        assert_eq!(game.player(&A).unwrap(), &before);

        assert_eq!(game.apply(B, Action::PlayCard(999)), Err(RejectReason::NotFound));
        assert_eq!(game.apply(B, Action::ShopChooseCard(0)), Err(RejectReason::Phase));
        assert_eq!(game.apply(B, Action::SanctuaryChoose(1)), Err(RejectReason::Phase));
        assert_eq!(game.apply(C, Action::PlayCard(0)), Err(RejectReason::NotSeated));
        assert_eq!(game.phase(), Phase::Play);
    }

    #[test]
    fn test_shop_pick_out_of_turn() {
        let mut game = new_game(&[A, B], 5);
        play_all(&mut game);
        assert_eq!(game.phase(), Phase::Shop);

        let second = game.shop_order()[1];
        let shop = game.shop().to_vec();
        let hand = game.player(&second).unwrap().hand.clone();

        let result = game.apply(second, Action::ShopChooseCard(shop[0]));
        assert_eq!(result, Err(RejectReason::NotYourTurn));
        assert_eq!(game.shop(), shop.as_slice());
        assert_eq!(game.player(&second).unwrap().hand, hand);
        assert_eq!(game.turn(), 0);
    }

    #[test]
    fn test_shop_pick_passes_along_then_next_turn() {
        let mut game = new_game(&[A, B], 5);
        play_all(&mut game);

        let first = game.shop_order()[0];
        let second = game.shop_order()[1];
        let card = game.shop()[1];
        game.apply(first, Action::ShopChooseCard(card)).unwrap();

        assert!(game.player(&first).unwrap().hand.contains(&card));
        assert!(!game.shop().contains(&card));
        assert!(game.player(&second).unwrap().has_to_choose);
        assert_eq!(game.apply(first, Action::ShopChooseCard(game.shop()[0])), Err(RejectReason::NotYourTurn));

        let card = game.shop()[0];
        game.apply(second, Action::ShopChooseCard(card)).unwrap();

        assert_eq!(game.phase(), Phase::Play);
        assert_eq!(game.turn(), 1);
        assert!(game.shop().is_empty());
        for id in [A, B] {
            let state = game.player(&id).unwrap();
            assert_eq!(state.hand.len(), HAND_SIZE);
            assert!(!state.has_played && !state.has_to_choose);
        }
    }

    #[test]
    fn test_sanctuary_offer_for_higher_card() {
        let mut game = new_game(&[A, B], 9);
        // Fix the tableaux so A climbs and B drops on turn 1.
        game.turn = 1;
        game.players.get_mut(&A).unwrap().played_cards = vec![10];
        game.players.get_mut(&A).unwrap().hand = vec![50, 60, 70];
        game.players.get_mut(&B).unwrap().played_cards = vec![40];
        game.players.get_mut(&B).unwrap().hand = vec![5, 6, 7];

        game.apply(A, Action::PlayCard(50)).unwrap();
        game.apply(B, Action::PlayCard(5)).unwrap();

        assert_eq!(game.phase(), Phase::Sanctuary);
        let a = game.player(&A).unwrap();
        let expected = a.count_clues(game.catalog()) + 1;
        assert!(a.has_to_choose);
        assert_eq!(a.sanctuary_choose.len(), expected);
        assert!(game.player(&B).unwrap().has_played);

        assert_eq!(game.apply(B, Action::SanctuaryChoose(1)), Err(RejectReason::NotEligible));
        assert_eq!(game.apply(A, Action::SanctuaryChoose(999)), Err(RejectReason::NotFound));

        let pick = game.player(&A).unwrap().sanctuary_choose[0];
        game.apply(A, Action::SanctuaryChoose(pick)).unwrap();

        assert_eq!(game.phase(), Phase::Shop);
        assert_eq!(game.player(&A).unwrap().played_sanctuaries, vec![pick]);
        assert!(game.player(&A).unwrap().sanctuary_choose.is_empty());
        assert_eq!(game.shop_order()[0], B);
    }

    #[test]
    fn test_no_sanctuary_goes_straight_to_shop() {
        let mut game = new_game(&[A, B], 9);
        game.turn = 2;
        for id in [A, B] {
            let state = game.players.get_mut(&id).unwrap();
            state.played_cards = vec![70, 60];
            state.hand = vec![1, 2, 3];
        }
        game.players.get_mut(&B).unwrap().hand = vec![4, 8, 9];

        game.apply(A, Action::PlayCard(1)).unwrap();
        game.apply(B, Action::PlayCard(4)).unwrap();

        assert_eq!(game.phase(), Phase::Shop);
        assert_eq!(game.sanctuary_pool().len(), 53);
    }

    #[test]
    fn test_sanctuary_offer_clamped_to_pool() {
        let mut game = new_game(&[A, B], 9);
        game.turn = 1;
        game.sanctuary_pool = DrawPool::new([3]);
        for (id, hand) in [(A, vec![20, 21, 22]), (B, vec![30, 31, 32])] {
            let state = game.players.get_mut(&id).unwrap();
            state.played_cards = vec![0];
            state.hand = hand;
        }

        game.apply(A, Action::PlayCard(20)).unwrap();
        game.apply(B, Action::PlayCard(30)).unwrap();

        assert_eq!(game.phase(), Phase::Sanctuary);
        // A drew the last tile, B was offered nothing and is done.
        assert_eq!(game.player(&A).unwrap().sanctuary_choose, vec![3]);
        assert!(game.player(&B).unwrap().has_played);
        assert!(!game.player(&B).unwrap().has_to_choose);
    }

    #[test]
    fn test_exhausted_shop_marks_remaining_done() {
        let mut game = new_game(&[A, B, C], 13);
        game.region_pool = DrawPool::new([75, 76]);
        play_all(&mut game);

        assert_eq!(game.phase(), Phase::Shop);
        assert_eq!(game.shop().len(), 2);
        step(&mut game);
        step(&mut game);

        // Third player had nothing to pick.
        assert_eq!(game.phase(), Phase::Play);
        assert_eq!(game.turn(), 1);
    }

    #[test]
    fn test_leave_passes_shop_pick() {
        let mut game = new_game(&[A, B, C], 17);
        play_all(&mut game);

        let first = game.shop_order()[0];
        let second = game.shop_order()[1];
        assert!(game.remove_player(&first));
        assert!(!game.remove_player(&first));

        assert_eq!(game.seats().len(), 2);
        assert!(!game.shop_order().contains(&first));
        assert!(game.player(&second).unwrap().has_to_choose);
    }

    #[test]
    fn test_leave_completes_phase() {
        let mut game = new_game(&[A, B, C], 19);
        for id in [A, B] {
            let card = game.player(&id).unwrap().hand[0];
            game.apply(id, Action::PlayCard(card)).unwrap();
        }
        assert_eq!(game.phase(), Phase::Play);

        game.remove_player(&C);
        assert_eq!(game.phase(), Phase::Shop);
    }

    #[test]
    fn test_full_game_reaches_end_once() {
        let mut game = new_game(&[A, B, C], 23);
        let mut guard = 0;
        while !game.is_ended() {
            assert!(step(&mut game), "game stalled in {:?}", game.phase());
            guard += 1;
            assert!(guard < 1000);
        }

        assert_eq!(game.turn(), LAST_TURN);
        for id in [A, B, C] {
            assert_eq!(game.player(&id).unwrap().played_cards.len(), TOTAL_TURNS as usize);
        }

        let scores = game.score().unwrap();
        let best = scores.iter().map(|entry| entry.total).max().unwrap();
        let expected: Vec<PlayerId> = game.seats()
            .iter()
            .zip(scores)
            .filter(|(_, entry)| entry.total == best)
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(game.winner().unwrap(), expected.as_slice());

        let ends = game.take_events()
            .into_iter()
            .filter(|event| matches!(event, GameEvent::PhaseChanged { to: Phase::End, .. }))
            .count();
        assert_eq!(ends, 1);

        // Terminal phase rejects everything.
        let card = game.player(&A).unwrap().hand.first().copied().unwrap_or(0);
        assert_eq!(game.apply(A, Action::PlayCard(card)), Err(RejectReason::Phase));
    }

    #[test]
    fn test_leave_after_end_keeps_result() {
        let mut game = new_game(&[A, B, C], 37);
        while step(&mut game) {}
        assert!(game.is_ended());

        let scores = game.score().unwrap().to_vec();
        let winners = game.winner().unwrap().to_vec();
        game.take_events();

        assert!(!game.remove_player(&A));
        assert_eq!(game.seats(), &[A, B, C]);
        assert!(game.player(&A).is_some());
        assert_eq!(game.score().unwrap(), scores.as_slice());
        assert_eq!(game.winner().unwrap(), winners.as_slice());
        assert!(game.take_events().is_empty());
    }

    #[test]
    fn test_cards_never_duplicated() {
        let mut game = new_game(&[A, B, C], 29);
        while step(&mut game) {
            let mut seen = BTreeSet::new();
            let pool = game.region_pool().as_slice().iter();
            let shop = game.shop().iter();
            let held = game.players().values().flat_map(|s| s.hand.iter().chain(&s.played_cards));
            for card in pool.chain(shop).chain(held) {
                assert!(seen.insert(*card), "region {card} appears twice");
            }
        }
        assert!(game.is_ended());
    }

    #[test]
    fn test_same_seed_same_game() {
        let mut a = new_game(&[A, B], 31);
        let mut b = new_game(&[A, B], 31);
        while step(&mut a) {
            assert!(step(&mut b));
        }
        assert_eq!(a.players(), b.players());
        assert_eq!(a.score(), b.score());
    }
}
