// Ranking engine: scoring configs, per-category scales and strategies.

pub mod compare;
pub mod leaders;
pub mod scale;
pub mod scoring;
pub mod strategy;

pub use compare::{compare, Comparison, ComparisonRow};
pub use leaders::{category_leaders, CategoryLeaders, Leader, LeaderQuery, RATE_MIN_GAMES};
pub use scale::{CategoryScale, ScoreMethod};
pub use scoring::{CategoryWeight, Direction, ScoringConfig};
pub use strategy::{RankingError, RankingOutcome, Strategy};

use crate::record::{PlayerSeasonRecord, PositionGroup};

/// Records of one season and one group that meet the config's games floor.
pub fn population(
    records: &[PlayerSeasonRecord],
    season: u16,
    group: PositionGroup,
    config: &ScoringConfig,
) -> Vec<PlayerSeasonRecord> {
    records
        .iter()
        .filter(|r| r.season == season && r.group() == group)
        .filter(|r| r.games_played() >= config.min_games_played)
        .cloned()
        .collect()
}
