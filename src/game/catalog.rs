//! Card Catalog
//!
//! Static definitions for region cards and sanctuary tiles. Loaded once at
//! startup and shared read-only (`Arc<Catalog>`) by every room.
//!
//! Region ids are 0-based (`regions[id]`), sanctuary ids are 1-based
//! (`sanctuaries[id - 1]`). The offset is part of the wire protocol.

use std::collections::BTreeMap;
use std::path::Path;
use serde::{Serialize, Deserialize};

/// Identifier of a region card (0-based).
pub type RegionId = u32;

/// Identifier of a sanctuary tile (1-based).
pub type SanctuaryId = u32;

/// Embedded standard catalog.
const STANDARD_CATALOG: &str = include_str!("../../data/cards.json");

// =============================================================================
// ATTRIBUTES
// =============================================================================

/// A countable attribute of a player's tableau.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    /// Stone wonders.
    Stone,
    /// Chimera wonders.
    Chimera,
    /// Thistle wonders.
    Thistle,
    /// Clue symbols.
    Clue,
    /// Red cards.
    Red,
    /// Green cards.
    Green,
    /// Blue cards.
    Blue,
    /// Yellow cards.
    Yellow,
    /// Colorless cards.
    Colorless,
    /// Night cards.
    Night,
    /// `min(stone, chimera, thistle)`
    WonderSet,
    /// `min(red, green, blue, yellow)`
    ColorSet,
}

impl Attribute {
    /// Number of attributes.
    pub const COUNT: usize = 12;

    /// Dense index for counter arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Biome (color) of a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Biome {
    /// Red.
    Red,
    /// Green.
    Green,
    /// Blue.
    Blue,
    /// Yellow.
    Yellow,
    /// No biome.
    Colorless,
}

impl Biome {
    /// The tableau counter this biome increments.
    pub fn attribute(self) -> Attribute {
        match self {
            Biome::Red => Attribute::Red,
            Biome::Green => Attribute::Green,
            Biome::Blue => Attribute::Blue,
            Biome::Yellow => Attribute::Yellow,
            Biome::Colorless => Attribute::Colorless,
        }
    }
}

/// Wonder resources yielded by a card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wonders {
    /// Stone count.
    pub stone: u32,
    /// Chimera count.
    pub chimera: u32,
    /// Thistle count.
    pub thistle: u32,
}

// =============================================================================
// FAME RULES
// =============================================================================

/// Scoring formula attached to a card.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawFame")]
pub enum FameRule {
    /// Fixed number of points.
    Flat(u32),
    /// `count[attribute] * per_unit`
    PerAttribute {
        /// Counted attribute.
        attribute: Attribute,
        /// Points per unit.
        per_unit: u32,
    },
    /// Sum of `count[attribute_i] * per_unit_i`.
    PerAttributeSet(Vec<(Attribute, u32)>),
}

impl FameRule {
    /// Evaluate the rule against attribute counts.
    pub fn evaluate(&self, count: impl Fn(Attribute) -> u32) -> u32 {
        match self {
            FameRule::Flat(points) => *points,
            FameRule::PerAttribute { attribute, per_unit } => count(*attribute) * per_unit,
            FameRule::PerAttributeSet(terms) => terms
                .iter()
                .map(|(attribute, per_unit)| count(*attribute) * per_unit)
                .sum(),
        }
    }
}

/// JSON shapes accepted for a fame rule.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFame {
    Flat(u32),
    Per { per: RawPer, score: u32 },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPer {
    One(Attribute),
    Many(Vec<Attribute>),
}

impl TryFrom<RawFame> for FameRule {
    type Error = String;

    fn try_from(raw: RawFame) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawFame::Flat(points) => FameRule::Flat(points),
            RawFame::Per { per: RawPer::One(attribute), score } => FameRule::PerAttribute {
                attribute,
                per_unit: score,
            },
            RawFame::Per { per: RawPer::Many(attributes), score } => {
                if attributes.is_empty() {
                    return Err("fame rule lists no attributes".to_string());
                }
                FameRule::PerAttributeSet(attributes.into_iter().map(|a| (a, score)).collect())
            }
        })
    }
}

// =============================================================================
// CARD DEFINITIONS
// =============================================================================

/// Definition of a region card or sanctuary tile.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CardDefinition {
    /// Card identifier (0-based for regions, 1-based for sanctuaries).
    pub id: u32,
    /// Biome tag.
    pub biome: Biome,
    /// Carries a clue (extra sanctuary choice).
    #[serde(default)]
    pub clue: bool,
    /// Night card.
    #[serde(default)]
    pub night: bool,
    /// Wonder resources.
    #[serde(default)]
    pub wonders: Wonders,
    /// Scoring formula.
    #[serde(default)]
    pub fame: Option<FameRule>,
    /// Minimum attribute counts required for the fame rule to apply.
    #[serde(default)]
    pub quest: Option<BTreeMap<Attribute, u32>>,
}

impl CardDefinition {
    /// A card with no attributes besides its biome.
    pub fn plain(id: u32, biome: Biome) -> Self {
        Self {
            id,
            biome,
            clue: false,
            night: false,
            wonders: Wonders::default(),
            fame: None,
            quest: None,
        }
    }
}

/// Catalog loading errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog JSON is malformed.
    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A card id does not match its position.
    #[error("{kind} at index {index} has id {id}, expected {expected}")]
    IdMismatch {
        /// "region" or "sanctuary".
        kind: &'static str,
        /// Position in the list.
        index: usize,
        /// Id found.
        id: u32,
        /// Id required at that position.
        expected: u32,
    },

    /// Catalog has no regions or no sanctuaries.
    #[error("Catalog must contain at least one region and one sanctuary")]
    Empty,
}

#[derive(Deserialize)]
struct CatalogFile {
    regions: Vec<CardDefinition>,
    sanctuaries: Vec<CardDefinition>,
}

/// Immutable lookup tables for regions and sanctuaries.
#[derive(Clone, Debug)]
pub struct Catalog {
    regions: Vec<CardDefinition>,
    sanctuaries: Vec<CardDefinition>,
}

impl Catalog {
    /// Build a catalog, validating the id offsets.
    pub fn new(
        regions: Vec<CardDefinition>,
        sanctuaries: Vec<CardDefinition>,
    ) -> Result<Self, CatalogError> {
        if regions.is_empty() || sanctuaries.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (index, card) in regions.iter().enumerate() {
            if card.id as usize != index {
                return Err(CatalogError::IdMismatch {
                    kind: "region",
                    index,
                    id: card.id,
                    expected: index as u32,
                });
            }
        }
        for (index, card) in sanctuaries.iter().enumerate() {
            if card.id as usize != index + 1 {
                return Err(CatalogError::IdMismatch {
                    kind: "sanctuary",
                    index,
                    id: card.id,
                    expected: index as u32 + 1,
                });
            }
        }
        Ok(Self { regions, sanctuaries })
    }

    /// The embedded standard catalog.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_json(STANDARD_CATALOG)
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(text)?;
        Self::new(file.regions, file.sanctuaries)
    }

    /// Load a catalog from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Look up a region card.
    #[inline]
    pub fn region(&self, id: RegionId) -> Option<&CardDefinition> {
        self.regions.get(id as usize)
    }

    /// Look up a sanctuary tile (1-based id).
    #[inline]
    pub fn sanctuary(&self, id: SanctuaryId) -> Option<&CardDefinition> {
        let index = (id as usize).checked_sub(1)?;
        self.sanctuaries.get(index)
    }

    /// Number of region cards.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Number of sanctuary tiles.
    pub fn sanctuary_count(&self) -> usize {
        self.sanctuaries.len()
    }

    /// All region ids, ascending.
    pub fn region_ids(&self) -> impl Iterator<Item = RegionId> {
        0..self.regions.len() as RegionId
    }

    /// All sanctuary ids, ascending (starting at 1).
    pub fn sanctuary_ids(&self) -> impl Iterator<Item = SanctuaryId> {
        1..=self.sanctuaries.len() as SanctuaryId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_loads() {
        let catalog = Catalog::standard().unwrap();
        assert_eq!(catalog.region_count(), 77);
        assert_eq!(catalog.sanctuary_count(), 53);
    }

    #[test]
    fn test_id_offsets() {
        let catalog = Catalog::standard().unwrap();

        assert_eq!(catalog.region(0).unwrap().id, 0);
        assert_eq!(catalog.region(76).unwrap().id, 76);
        assert!(catalog.region(77).is_none());

        assert!(catalog.sanctuary(0).is_none());
        assert_eq!(catalog.sanctuary(1).unwrap().id, 1);
        assert_eq!(catalog.sanctuary(53).unwrap().id, 53);
        assert!(catalog.sanctuary(54).is_none());

        assert_eq!(catalog.sanctuary_ids().next(), Some(1));
        assert_eq!(catalog.region_ids().last(), Some(76));
    }

    #[test]
    fn test_fame_rule_shapes() {
        let json = r#"{
            "regions": [
                {"id": 0, "biome": "red", "fame": 3},
                {"id": 1, "biome": "blue", "fame": {"per": "night", "score": 2}},
                {"id": 2, "biome": "green", "fame": {"per": ["red", "blue"], "score": 1},
                 "quest": {"stone": 1}}
            ],
            "sanctuaries": [
                {"id": 1, "biome": "colorless", "clue": true, "wonders": {"chimera": 1}}
            ]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();

        assert_eq!(catalog.region(0).unwrap().fame, Some(FameRule::Flat(3)));
        assert_eq!(
            catalog.region(1).unwrap().fame,
            Some(FameRule::PerAttribute { attribute: Attribute::Night, per_unit: 2 })
        );
        assert_eq!(
            catalog.region(2).unwrap().fame,
            Some(FameRule::PerAttributeSet(vec![(Attribute::Red, 1), (Attribute::Blue, 1)]))
        );
        assert_eq!(catalog.region(2).unwrap().quest.as_ref().unwrap()[&Attribute::Stone], 1);

        let sanctuary = catalog.sanctuary(1).unwrap();
        assert!(sanctuary.clue);
        assert_eq!(sanctuary.wonders.chimera, 1);
        assert_eq!(sanctuary.fame, None);
    }

    #[test]
    fn test_fame_rule_evaluate() {
        let counts = |a: Attribute| match a {
            Attribute::Red => 3,
            Attribute::Blue => 2,
            _ => 0,
        };
        assert_eq!(FameRule::Flat(5).evaluate(counts), 5);
        assert_eq!(
            FameRule::PerAttribute { attribute: Attribute::Red, per_unit: 2 }.evaluate(counts),
            6
        );
        assert_eq!(
            FameRule::PerAttributeSet(vec![(Attribute::Red, 1), (Attribute::Blue, 3)]).evaluate(counts),
            9
        );
    }

    #[test]
    fn test_rejects_zero_based_sanctuaries() {
        let json = r#"{
            "regions": [{"id": 0, "biome": "red"}],
            "sanctuaries": [{"id": 0, "biome": "colorless"}]
        }"#;
        let result = Catalog::from_json(json);
        assert!(matches!(result, Err(CatalogError::IdMismatch { kind: "sanctuary", .. })));
    }

    #[test]
    fn test_rejects_empty_and_malformed() {
        let empty = r#"{"regions": [], "sanctuaries": []}"#;
        assert!(matches!(Catalog::from_json(empty), Err(CatalogError::Empty)));

        let bad_fame = r#"{
            "regions": [{"id": 0, "biome": "red", "fame": {"per": [], "score": 1}}],
            "sanctuaries": [{"id": 1, "biome": "colorless"}]
        }"#;
        assert!(matches!(Catalog::from_json(bad_fame), Err(CatalogError::Json(_))));
    }
}
