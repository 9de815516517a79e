// Scoring configuration: which categories count, how much, and which way.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::record::{Position, PositionGroup, StatCategory};

/// Whether a bigger number is a better number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    /// Flip the sign of lower-is-better values so that every oriented value
    /// reads "bigger is better".
    pub fn orient(&self, value: f64) -> f64 {
        match self {
            Direction::HigherIsBetter => value,
            Direction::LowerIsBetter => -value,
        }
    }

    /// The direction a category reads in when no config says otherwise.
    pub fn natural_for(category: StatCategory) -> Self {
        match category {
            StatCategory::GoalsAgainst
            | StatCategory::GoalsAgainstAverage
            | StatCategory::Losses
            | StatCategory::OvertimeLosses => Direction::LowerIsBetter,
            _ => Direction::HigherIsBetter,
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// One scored category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeight {
    pub category: StatCategory,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub direction: Direction,
    /// Extra multiplier by position, keyed by position abbreviation in any
    /// case (e.g. face-off wins count fully for centers only). Positions not
    /// listed use 1.0.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub position_multipliers: BTreeMap<Position, f64>,
}

impl CategoryWeight {
    pub fn new(category: StatCategory, weight: f64, direction: Direction) -> Self {
        Self {
            category,
            weight,
            direction,
            position_multipliers: BTreeMap::new(),
        }
    }

    pub fn with_multiplier(mut self, position: Position, multiplier: f64) -> Self {
        self.position_multipliers.insert(position, multiplier);
        self
    }

    pub fn multiplier(&self, position: Position) -> f64 {
        self.position_multipliers
            .get(&position)
            .copied()
            .unwrap_or(1.0)
    }
}

/// Category list plus the knobs that shape the ranked population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Treat a missing counting stat as 0. Rate stats are never zero-filled.
    #[serde(default = "default_true")]
    pub zero_fill_counting: bool,
    /// Records with fewer games are left out of the population.
    #[serde(default)]
    pub min_games_played: f64,
    pub categories: Vec<CategoryWeight>,
}

impl ScoringConfig {
    /// All listed categories at weight 1.
    pub fn equal_weight(categories: &[(StatCategory, Direction)]) -> Self {
        Self {
            zero_fill_counting: true,
            min_games_played: 0.0,
            categories: categories
                .iter()
                .map(|(c, d)| CategoryWeight::new(*c, 1.0, *d))
                .collect(),
        }
    }

    /// The categories a standard head-to-head hockey league scores.
    pub fn default_for(group: PositionGroup) -> Self {
        use Direction::*;
        use StatCategory::*;
        match group {
            PositionGroup::Skaters => Self::equal_weight(&[
                (Goals, HigherIsBetter),
                (Assists, HigherIsBetter),
                (PowerPlayPoints, HigherIsBetter),
                (Hits, HigherIsBetter),
                (BlockedShots, HigherIsBetter),
                (FaceOffWins, HigherIsBetter),
                (Shots, HigherIsBetter),
            ]),
            PositionGroup::Goalies => Self::equal_weight(&[
                (Wins, HigherIsBetter),
                (Saves, HigherIsBetter),
                (SavePercentage, HigherIsBetter),
                (GoalsAgainstAverage, LowerIsBetter),
            ]),
        }
    }

    /// Same categories and directions with every weight and multiplier reset to 1.
    pub fn equal_weighted(&self) -> Self {
        Self {
            categories: self
                .categories
                .iter()
                .map(|c| CategoryWeight::new(c.category, 1.0, c.direction))
                .collect(),
            ..self.clone()
        }
    }

    /// Check the configuration against the group it will rank.
    pub fn validate(&self, group: PositionGroup) -> Result<(), ConfigurationError> {
        if self.categories.is_empty() {
            return Err(ConfigurationError::NoCategories { group });
        }

        let mut seen = HashSet::new();
        for entry in &self.categories {
            let category = entry.category;
            if !seen.insert(category) {
                return Err(ConfigurationError::DuplicateCategory { category });
            }
            if !category.applies_to(group) {
                return Err(ConfigurationError::WrongGroup { category, group });
            }
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(ConfigurationError::InvalidWeight {
                    category,
                    weight: entry.weight,
                });
            }
            for (&position, multiplier) in &entry.position_multipliers {
                if position.group() != group {
                    return Err(ConfigurationError::MultiplierOutsideGroup {
                        category,
                        position,
                        group,
                    });
                }
                if !multiplier.is_finite() || *multiplier < 0.0 {
                    return Err(ConfigurationError::InvalidWeight {
                        category,
                        weight: *multiplier,
                    });
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_for_their_group() {
        for group in [PositionGroup::Skaters, PositionGroup::Goalies] {
            ScoringConfig::default_for(group).validate(group).unwrap();
        }
    }

    #[test]
    fn goalie_category_rejected_for_skaters() {
        let cfg = ScoringConfig::default_for(PositionGroup::Goalies);
        assert_eq!(
            cfg.validate(PositionGroup::Skaters),
            Err(ConfigurationError::WrongGroup {
                category: StatCategory::Wins,
                group: PositionGroup::Skaters,
            })
        );
    }

    #[test]
    fn duplicate_and_empty_rejected() {
        let empty = ScoringConfig::equal_weight(&[]);
        assert!(matches!(
            empty.validate(PositionGroup::Skaters),
            Err(ConfigurationError::NoCategories { .. })
        ));

        let dup = ScoringConfig::equal_weight(&[
            (StatCategory::Goals, Direction::HigherIsBetter),
            (StatCategory::Goals, Direction::HigherIsBetter),
        ]);
        assert!(matches!(
            dup.validate(PositionGroup::Skaters),
            Err(ConfigurationError::DuplicateCategory { .. })
        ));
    }

    #[test]
    fn negative_or_nan_weight_rejected() {
        let mut cfg = ScoringConfig::default_for(PositionGroup::Skaters);
        cfg.categories[0].weight = -1.0;
        assert!(matches!(
            cfg.validate(PositionGroup::Skaters),
            Err(ConfigurationError::InvalidWeight { .. })
        ));
        cfg.categories[0].weight = f64::NAN;
        assert!(cfg.validate(PositionGroup::Skaters).is_err());
    }

    #[test]
    fn multiplier_keys_must_be_positions() {
        let text = r#"
[[categories]]
category = "face_off_wins"
position_multipliers = { c = 1.0, f = 0.3 }
"#;
        assert!(toml::from_str::<ScoringConfig>(text).is_err());
    }

    #[test]
    fn lowercase_multiplier_keys_apply() {
        let text = r#"
[[categories]]
category = "face_off_wins"
position_multipliers = { c = 1.0, lw = 0.3, d = 0.1 }
"#;
        let cfg: ScoringConfig = toml::from_str(text).unwrap();
        cfg.validate(PositionGroup::Skaters).unwrap();
        let fow = &cfg.categories[0];
        assert_eq!(fow.multiplier(Position::C), 1.0);
        assert_eq!(fow.multiplier(Position::LW), 0.3);
        assert_eq!(fow.multiplier(Position::D), 0.1);
        assert_eq!(fow.multiplier(Position::RW), 1.0);
    }

    #[test]
    fn goalie_multiplier_on_skater_category_rejected() {
        let mut cfg = ScoringConfig::default_for(PositionGroup::Skaters);
        cfg.categories[0] = cfg.categories[0].clone().with_multiplier(Position::G, 0.5);
        assert_eq!(
            cfg.validate(PositionGroup::Skaters),
            Err(ConfigurationError::MultiplierOutsideGroup {
                category: StatCategory::Goals,
                position: Position::G,
                group: PositionGroup::Skaters,
            })
        );
    }

    #[test]
    fn multiplier_defaults_to_one() {
        let w = CategoryWeight::new(StatCategory::FaceOffWins, 1.0, Direction::HigherIsBetter)
            .with_multiplier(Position::D, 0.1);
        assert_eq!(w.multiplier(Position::D), 0.1);
        assert_eq!(w.multiplier(Position::C), 1.0);
    }

    #[test]
    fn equal_weighted_resets_weights() {
        let mut cfg = ScoringConfig::default_for(PositionGroup::Skaters);
        cfg.categories[0].weight = 3.0;
        cfg.categories[5] = cfg.categories[5].clone().with_multiplier(Position::D, 0.1);
        let eq = cfg.equal_weighted();
        assert!(eq.categories.iter().all(|c| c.weight == 1.0));
        assert!(eq.categories.iter().all(|c| c.position_multipliers.is_empty()));
    }

    #[test]
    fn deserializes_from_toml() {
        let text = r#"
zero_fill_counting = false

[[categories]]
category = "goals_against_average"
direction = "lower_is_better"

[[categories]]
category = "wins"
weight = 2.0
"#;
        let cfg: ScoringConfig = toml::from_str(text).unwrap();
        assert!(!cfg.zero_fill_counting);
        assert_eq!(cfg.categories[0].direction, Direction::LowerIsBetter);
        assert_eq!(cfg.categories[0].weight, 1.0);
        assert_eq!(cfg.categories[1].weight, 2.0);
        assert_eq!(cfg.categories[1].direction, Direction::HigherIsBetter);
    }

    #[test]
    fn natural_direction_of_goalie_against_stats() {
        assert_eq!(Direction::natural_for(StatCategory::GoalsAgainstAverage), Direction::LowerIsBetter);
        assert_eq!(Direction::natural_for(StatCategory::Losses), Direction::LowerIsBetter);
        assert_eq!(Direction::natural_for(StatCategory::Saves), Direction::HigherIsBetter);
    }

    #[test]
    fn unknown_direction_fails_to_parse() {
        let text = r#"
[[categories]]
category = "wins"
direction = "sideways"
"#;
        assert!(toml::from_str::<ScoringConfig>(text).is_err());
    }
}
