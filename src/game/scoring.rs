//! Scoring Engine
//!
//! Pure end-of-game scoring. Sanctuaries are folded into the tally first,
//! then played regions are folded one by one from the eighth slot down to
//! the first, and each region's fame is evaluated against the tally as it
//! stands at that moment. A region scanned early (played late) therefore
//! sees fewer attributes than one scanned last.

use serde::{Serialize, Deserialize};

use crate::game::catalog::{Attribute, CardDefinition, Catalog};
use crate::game::player::{PlayerId, PlayerState};
use crate::TOTAL_TURNS;

/// Running attribute counters for one player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    counts: [u32; Attribute::COUNT],
}

impl Tally {
    /// Current count for an attribute.
    #[inline]
    pub fn get(&self, attribute: Attribute) -> u32 {
        self.counts[attribute.index()]
    }

    /// Fold one card into the tally and refresh the composite sets.
    pub fn fold(&mut self, card: &CardDefinition) {
        self.add(Attribute::Stone, card.wonders.stone);
        self.add(Attribute::Chimera, card.wonders.chimera);
        self.add(Attribute::Thistle, card.wonders.thistle);
        if card.clue {
            self.add(Attribute::Clue, 1);
        }
        self.add(card.biome.attribute(), 1);
        if card.night {
            self.add(Attribute::Night, 1);
        }

        self.counts[Attribute::WonderSet.index()] = self
            .get(Attribute::Stone)
            .min(self.get(Attribute::Chimera))
            .min(self.get(Attribute::Thistle));
        self.counts[Attribute::ColorSet.index()] = self
            .get(Attribute::Red)
            .min(self.get(Attribute::Green))
            .min(self.get(Attribute::Blue))
            .min(self.get(Attribute::Yellow));
    }

    /// Whether every quest threshold is met.
    pub fn satisfies(&self, quest: &std::collections::BTreeMap<Attribute, u32>) -> bool {
        quest.iter().all(|(attribute, min)| self.get(*attribute) >= *min)
    }

    fn add(&mut self, attribute: Attribute, amount: u32) {
        self.counts[attribute.index()] += amount;
    }
}

/// Final score of one player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Sum of all round entries.
    pub total: u32,
    /// One entry per region slot (eighth to first), then the sanctuary bonus.
    pub round: Vec<u32>,
}

/// Score a player's tableau.
///
/// Missing slots (a game cut short) score zero and fold nothing.
pub fn score(player: &PlayerState, catalog: &Catalog) -> ScoreEntry {
    let mut tally = Tally::default();

    let sanctuaries: Vec<&CardDefinition> = player.played_sanctuaries
        .iter()
        .filter_map(|id| catalog.sanctuary(*id))
        .collect();
    for sanctuary in &sanctuaries {
        tally.fold(sanctuary);
    }

    let mut round = Vec::with_capacity(TOTAL_TURNS as usize + 1);
    for slot in (0..TOTAL_TURNS as usize).rev() {
        let Some(region) = player.played_cards.get(slot).and_then(|id| catalog.region(*id)) else {
            round.push(0);
            continue;
        };
        tally.fold(region);

        let quest_met = region.quest.as_ref().is_none_or(|quest| tally.satisfies(quest));
        let fame = match &region.fame {
            Some(rule) if quest_met => rule.evaluate(|attribute| tally.get(attribute)),
            _ => 0,
        };
        round.push(fame);
    }

    let bonus = sanctuaries
        .iter()
        .filter_map(|sanctuary| sanctuary.fame.as_ref())
        .map(|rule| rule.evaluate(|attribute| tally.get(attribute)))
        .sum();
    round.push(bonus);

    ScoreEntry {
        total: round.iter().sum(),
        round,
    }
}

/// Every player whose total equals the highest total, in input order.
pub fn winners(scores: &[(PlayerId, ScoreEntry)]) -> Vec<PlayerId> {
    let Some(best) = scores.iter().map(|(_, entry)| entry.total).max() else {
        return Vec::new();
    };
    scores
        .iter()
        .filter(|(_, entry)| entry.total == best)
        .map(|(id, _)| *id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use crate::game::catalog::{Biome, FameRule, Wonders};

    fn region(id: u32, biome: Biome) -> CardDefinition {
        CardDefinition::plain(id, biome)
    }

    /// Eight plain regions plus two sanctuaries; tests overwrite what they need.
    fn base_cards() -> (Vec<CardDefinition>, Vec<CardDefinition>) {
        let biomes = [Biome::Red, Biome::Green, Biome::Blue, Biome::Yellow];
        let regions = (0..8).map(|id| region(id, biomes[id as usize % 4])).collect();
        let sanctuaries = vec![
            CardDefinition::plain(1, Biome::Colorless),
            CardDefinition::plain(2, Biome::Colorless),
        ];
        (regions, sanctuaries)
    }

    fn player(played: &[u32], sanctuaries: &[u32]) -> PlayerState {
        PlayerState {
            played_cards: played.to_vec(),
            played_sanctuaries: sanctuaries.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_flat_fame() {
        let (mut regions, sanctuaries) = base_cards();
        regions[0].fame = Some(FameRule::Flat(4));
        regions[5].fame = Some(FameRule::Flat(2));
        let catalog = Catalog::new(regions, sanctuaries).unwrap();

        let entry = score(&player(&[0, 1, 2, 3, 4, 5, 6, 7], &[]), &catalog);

        // Slot 5 is scanned third, slot 0 last; trailing sanctuary bonus is 0.
        assert_eq!(entry.round, vec![0, 0, 2, 0, 0, 0, 0, 4, 0]);
        assert_eq!(entry.total, 6);
    }

    #[test]
    fn test_reverse_scan_sees_only_later_cards() {
        // Card played first counts red among everything; card played last
        // counts only itself.
        let (mut regions, sanctuaries) = base_cards();
        let per_red = FameRule::PerAttribute { attribute: Attribute::Red, per_unit: 1 };
        regions[0].fame = Some(per_red.clone());
        regions[4].fame = Some(per_red);
        let catalog = Catalog::new(regions, sanctuaries).unwrap();

        // Regions 0 and 4 are red. Play 4 last, 0 first.
        let entry = score(&player(&[0, 1, 2, 3, 5, 6, 7, 4], &[]), &catalog);

        assert_eq!(entry.round[0], 1);
        assert_eq!(entry.round[7], 2);
        assert_eq!(entry.total, 3);
    }

    #[test]
    fn test_quest_gating_uses_tally_so_far() {
        let (mut regions, sanctuaries) = base_cards();
        regions[1].wonders = Wonders { stone: 1, ..Default::default() };
        regions[2].fame = Some(FameRule::Flat(10));
        regions[2].quest = Some(BTreeMap::from([(Attribute::Stone, 1)]));
        let catalog = Catalog::new(regions, sanctuaries).unwrap();

        // Stone card played after the quest card: folded earlier, quest met.
        let met = score(&player(&[0, 2, 3, 4, 5, 6, 1, 7], &[]), &catalog);
        assert_eq!(met.total, 10);

        // Stone card played before the quest card: not yet folded, quest fails.
        let unmet = score(&player(&[1, 2, 0, 3, 4, 5, 6, 7], &[]), &catalog);
        assert_eq!(unmet.total, 0);
    }

    #[test]
    fn test_composite_sets() {
        let (mut regions, mut sanctuaries) = base_cards();
        sanctuaries[0].wonders = Wonders { stone: 2, chimera: 1, thistle: 3 };
        regions[0].fame = Some(FameRule::PerAttributeSet(vec![
            (Attribute::WonderSet, 5),
            (Attribute::ColorSet, 2),
        ]));
        let catalog = Catalog::new(regions, sanctuaries).unwrap();

        // Region 0 is scanned last: all four colors present twice, wonder set 1.
        let entry = score(&player(&[0, 1, 2, 3, 4, 5, 6, 7], &[1]), &catalog);
        assert_eq!(entry.round[7], 5 + 2 * 2);
    }

    #[test]
    fn test_sanctuary_bonus_not_quest_gated() {
        let (regions, mut sanctuaries) = base_cards();
        sanctuaries[1].fame = Some(FameRule::PerAttribute {
            attribute: Attribute::Colorless,
            per_unit: 3,
        });
        let catalog = Catalog::new(regions, sanctuaries).unwrap();

        let entry = score(&player(&[0, 1, 2, 3, 4, 5, 6, 7], &[1, 2]), &catalog);
        assert_eq!(entry.round.len(), 9);
        assert_eq!(entry.round[8], 6);
        assert_eq!(entry.total, 6);
    }

    #[test]
    fn test_missing_slots_score_zero() {
        let (mut regions, sanctuaries) = base_cards();
        regions[0].fame = Some(FameRule::Flat(3));
        let catalog = Catalog::new(regions, sanctuaries).unwrap();

        let entry = score(&player(&[0, 1], &[]), &catalog);
        assert_eq!(entry.round, vec![0, 0, 0, 0, 0, 0, 0, 3, 0]);

        let empty = score(&PlayerState::new(), &catalog);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.round.len(), 9);
    }

    #[test]
    fn test_score_is_deterministic() {
        let catalog = Catalog::standard().unwrap();
        let tableau = player(&[12, 40, 3, 66, 21, 58, 9, 75], &[4, 17, 30]);

        let first = score(&tableau, &catalog);
        for _ in 0..10 {
            assert_eq!(score(&tableau, &catalog), first);
        }
    }

    #[test]
    fn test_winners_include_ties() {
        let a = PlayerId::from_u128(1);
        let b = PlayerId::from_u128(2);
        let c = PlayerId::from_u128(3);
        let entry = |total| ScoreEntry { total, round: vec![total] };

        let scores = vec![(a, entry(20)), (b, entry(31)), (c, entry(31))];
        assert_eq!(winners(&scores), vec![b, c]);

        assert!(winners(&[]).is_empty());
    }
}
