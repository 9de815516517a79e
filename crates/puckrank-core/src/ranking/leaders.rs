// Category leaders: the top players in one stat, no composite scoring.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::ConfigurationError;
use crate::record::{PlayerSeasonRecord, Position, PositionGroup, StatCategory, TeamMarker};

use super::scoring::{Direction, ScoringConfig};

/// Games floor applied to rate stats when the caller gives none.
pub const RATE_MIN_GAMES: f64 = 20.0;

/// Which leaderboard to build.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderQuery {
    pub category: StatCategory,
    pub direction: Direction,
    pub position: Option<Position>,
    pub min_games: f64,
    pub top: usize,
}

impl LeaderQuery {
    /// Query with the category's direction from `config` (or its natural
    /// direction when the config does not score it) and the default games
    /// floor for its kind.
    pub fn new(category: StatCategory, config: &ScoringConfig, top: usize) -> Self {
        let direction = config
            .categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.direction)
            .unwrap_or_else(|| Direction::natural_for(category));
        let min_games = if category.is_counting() { 0.0 } else { RATE_MIN_GAMES };
        Self {
            category,
            direction,
            position: None,
            min_games,
            top,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leader {
    pub rank: usize,
    pub name: String,
    pub player_key: String,
    pub position: Position,
    pub team: TeamMarker,
    pub games_played: f64,
    pub value: f64,
}

/// One finished leaderboard, with the query settings that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryLeaders {
    pub category: StatCategory,
    pub direction: Direction,
    pub position: Option<Position>,
    pub min_games: f64,
    /// Records that passed the filters but had no value for the category.
    pub missing: usize,
    pub leaders: Vec<Leader>,
}

/// Top `query.top` records in one category.
///
/// Records without a value are skipped, never treated as zero. Ties fall
/// back to games played, then name, then player key.
pub fn category_leaders(
    records: &[PlayerSeasonRecord],
    group: PositionGroup,
    query: &LeaderQuery,
) -> Result<CategoryLeaders, ConfigurationError> {
    if !query.category.applies_to(group) {
        return Err(ConfigurationError::WrongGroup {
            category: query.category,
            group,
        });
    }
    if let Some(position) = query.position {
        if position.group() != group {
            return Err(ConfigurationError::PositionOutsideGroup { position, group });
        }
    }

    let eligible: Vec<&PlayerSeasonRecord> = records
        .iter()
        .filter(|r| r.group() == group)
        .filter(|r| query.position.map_or(true, |p| r.position == p))
        .filter(|r| r.games_played() >= query.min_games)
        .collect();

    let mut valued: Vec<(&PlayerSeasonRecord, f64)> = eligible
        .iter()
        .filter_map(|r| r.get(query.category).map(|v| (*r, v)))
        .collect();
    let missing = eligible.len() - valued.len();

    valued.sort_by(|a, b| compare_leaders(query.direction, a, b));
    let leaders: Vec<Leader> = valued
        .into_iter()
        .take(query.top)
        .enumerate()
        .map(|(i, (record, value))| Leader {
            rank: i + 1,
            name: record.name.clone(),
            player_key: record.player_key.clone(),
            position: record.position,
            team: record.team.clone(),
            games_played: record.games_played(),
            value,
        })
        .collect();

    debug!(
        "{} leaders: {} listed, {} without a value",
        query.category,
        leaders.len(),
        missing
    );
    Ok(CategoryLeaders {
        category: query.category,
        direction: query.direction,
        position: query.position,
        min_games: query.min_games,
        missing,
        leaders,
    })
}

fn compare_leaders(
    direction: Direction,
    a: &(&PlayerSeasonRecord, f64),
    b: &(&PlayerSeasonRecord, f64),
) -> Ordering {
    direction
        .orient(b.1)
        .total_cmp(&direction.orient(a.1))
        .then_with(|| b.0.games_played().total_cmp(&a.0.games_played()))
        .then_with(|| a.0.name.cmp(&b.0.name))
        .then_with(|| a.0.player_key.cmp(&b.0.player_key))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
