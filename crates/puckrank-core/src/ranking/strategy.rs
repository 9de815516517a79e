// Ranking strategies: one interface, a closed set of variants.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{ConfigurationError, DataQualityWarning, EmptyInputError};
use crate::ranking::scale::{CategoryScale, ScoreMethod};
use crate::ranking::scoring::ScoringConfig;
use crate::record::{CategoryContribution, PlayerSeasonRecord, Position, RankingEntry, StatCategory};

/// Fatal ranking failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankingError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    EmptyInput(#[from] EmptyInputError),
}

/// How a population is turned into a ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Score the whole population at once.
    Base(ScoreMethod),
    /// Fit every scale within each position, then merge.
    PositionAdjusted(ScoreMethod),
    /// Divide counting stats by games played before scoring.
    Efficiency(ScoreMethod),
}

impl Strategy {
    /// Base used by the compound strategies when none is given.
    pub const DEFAULT_BASE: ScoreMethod = ScoreMethod::Percentile;

    /// Every base method plus the two compound strategies over the default base.
    pub fn all() -> Vec<Strategy> {
        let mut all: Vec<Strategy> = ScoreMethod::ALL.iter().map(|m| Strategy::Base(*m)).collect();
        all.push(Strategy::PositionAdjusted(Self::DEFAULT_BASE));
        all.push(Strategy::Efficiency(Self::DEFAULT_BASE));
        all
    }

    /// Parse a strategy name such as `z-score`, `position-adjusted` or
    /// `efficiency:rank-sum`. `base` overrides the compound strategies' method.
    pub fn parse(name: &str, base: Option<ScoreMethod>) -> Option<Self> {
        let name = name.trim().to_lowercase().replace('_', "-");
        let (head, inline_base) = match name.split_once(':') {
            Some((head, tail)) => (head.to_string(), Some(ScoreMethod::from_name(tail)?)),
            None => (name, None),
        };
        let base = base.or(inline_base).unwrap_or(Self::DEFAULT_BASE);
        match head.as_str() {
            "position-adjusted" | "position" => Some(Strategy::PositionAdjusted(base)),
            "efficiency" | "per-game" => Some(Strategy::Efficiency(base)),
            other => ScoreMethod::from_name(other).map(Strategy::Base),
        }
    }

    pub fn method(&self) -> ScoreMethod {
        match self {
            Strategy::Base(m) | Strategy::PositionAdjusted(m) | Strategy::Efficiency(m) => *m,
        }
    }

    fn per_game(&self) -> bool {
        matches!(self, Strategy::Efficiency(_))
    }

    fn by_position(&self) -> bool {
        matches!(self, Strategy::PositionAdjusted(_))
    }

    /// Rank one population (one season, one group) best to worst.
    pub fn rank(
        &self,
        records: &[PlayerSeasonRecord],
        config: &ScoringConfig,
    ) -> Result<RankingOutcome, RankingError> {
        let Some(first) = records.first() else {
            return Err(EmptyInputError::new("no records to rank").into());
        };
        let group = first.group();
        config.validate(group)?;

        for entry in &config.categories {
            if !records.iter().any(|r| r.get(entry.category).is_some()) {
                return Err(ConfigurationError::CategoryNotInInput {
                    category: entry.category,
                }
                .into());
            }
        }

        let method = self.method();
        let mut excluded = Vec::new();
        let mut candidates = Vec::new();

        for (index, record) in records.iter().enumerate() {
            if record.group() != group {
                excluded.push(DataQualityWarning::WrongGroup {
                    player: record.name.clone(),
                    position: record.position,
                    group,
                });
                continue;
            }
            if config.categories.iter().all(|c| record.get(c.category).is_none()) {
                excluded.push(DataQualityWarning::NoScoredCategories {
                    player: record.name.clone(),
                });
                continue;
            }
            let games = match record.get(StatCategory::GamesPlayed) {
                Some(g) if g > 0.0 => Some(g),
                _ => None,
            };
            if self.per_game() && games.is_none() {
                excluded.push(DataQualityWarning::NoGamesPlayed {
                    player: record.name.clone(),
                });
                continue;
            }
            let per_game = if self.per_game() { games } else { None };
            let values = config
                .categories
                .iter()
                .map(|c| scored_value(record, c.category, config.zero_fill_counting, per_game))
                .collect();
            candidates.push(Candidate {
                record,
                index,
                values,
            });
        }

        for w in &excluded {
            warn!("excluded from {} ranking: {w}", self);
        }
        if candidates.is_empty() {
            return Err(EmptyInputError::new(format!(
                "every record was excluded from the {self} ranking"
            ))
            .into());
        }

        // Scales are fitted per partition: one partition unless ranking by position.
        let mut partitions: BTreeMap<Option<Position>, Vec<usize>> = BTreeMap::new();
        for (i, c) in candidates.iter().enumerate() {
            let key = self.by_position().then_some(c.record.position);
            partitions.entry(key).or_default().push(i);
        }

        let mut scored: Vec<Scored> = Vec::with_capacity(candidates.len());
        for (key, members) in &partitions {
            let scales: Vec<CategoryScale> = config
                .categories
                .iter()
                .enumerate()
                .map(|(ci, cw)| {
                    let population: Vec<f64> = members
                        .iter()
                        .filter_map(|&i| candidates[i].values[ci])
                        .map(|v| cw.direction.orient(v))
                        .collect();
                    CategoryScale::fit(method, &population)
                })
                .collect();
            debug!(
                "{}: fitted {} scales over {} records (partition {:?})",
                self,
                scales.len(),
                members.len(),
                key
            );

            for &i in members {
                let candidate = &candidates[i];
                let record = candidate.record;
                let contributions: Vec<CategoryContribution> = config
                    .categories
                    .iter()
                    .zip(&scales)
                    .zip(&candidate.values)
                    .map(|((cw, scale), value)| {
                        let scaled = match value {
                            Some(v) => scale.apply(cw.direction.orient(*v)),
                            None => scale.neutral(),
                        };
                        let weight = if method.uses_weights() {
                            cw.weight * cw.multiplier(record.position)
                        } else {
                            1.0
                        };
                        CategoryContribution {
                            category: cw.category,
                            raw: record.get(cw.category),
                            value: *value,
                            scaled,
                            weighted: scaled * weight,
                        }
                    })
                    .collect();
                // + 0.0 folds -0.0 into 0.0 so equal scores compare equal
                let score = contributions.iter().map(|c| c.weighted).sum::<f64>() + 0.0;
                scored.push(Scored {
                    index: candidate.index,
                    score,
                    entry: RankingEntry {
                        name: record.name.clone(),
                        player_key: record.player_key.clone(),
                        season: record.season,
                        position: record.position,
                        team: record.team.clone(),
                        games_played: record.games_played(),
                        score,
                        rank: 0,
                        contributions,
                    },
                });
            }
        }

        scored.sort_by(compare_scored);
        let entries: Vec<RankingEntry> = scored
            .into_iter()
            .enumerate()
            .map(|(i, s)| RankingEntry {
                rank: i + 1,
                ..s.entry
            })
            .collect();

        info!(
            "{} ranking: {} players ranked, {} excluded",
            self,
            entries.len(),
            excluded.len()
        );
        Ok(RankingOutcome {
            strategy: *self,
            entries,
            excluded,
        })
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Base(m) => write!(f, "{}", m.name()),
            Strategy::PositionAdjusted(m) => write!(f, "position-adjusted:{}", m.name()),
            Strategy::Efficiency(m) => write!(f, "efficiency:{}", m.name()),
        }
    }
}

/// Result of one ranking run.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingOutcome {
    pub strategy: Strategy,
    /// Best first; `rank` runs 1..=n.
    pub entries: Vec<RankingEntry>,
    /// Records left out, with the reason.
    pub excluded: Vec<DataQualityWarning>,
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct Candidate<'a> {
    record: &'a PlayerSeasonRecord,
    index: usize,
    /// Value scored for each configured category, in config order.
    values: Vec<Option<f64>>,
}

struct Scored {
    index: usize,
    score: f64,
    entry: RankingEntry,
}

/// The value a category is scored on: zero-filled if allowed, divided by
/// games for per-game rankings.
fn scored_value(
    record: &PlayerSeasonRecord,
    category: StatCategory,
    zero_fill: bool,
    per_game: Option<f64>,
) -> Option<f64> {
    let value = record
        .get(category)
        .or_else(|| (zero_fill && category.is_counting()).then_some(0.0))?;
    match per_game {
        Some(games) if category.is_counting() && category != StatCategory::GamesPlayed => {
            Some(value / games)
        }
        _ => Some(value),
    }
}

/// Score descending, then games played descending, name, key, input order.
fn compare_scored(a: &Scored, b: &Scored) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.entry.games_played.total_cmp(&a.entry.games_played))
        .then_with(|| a.entry.name.cmp(&b.entry.name))
        .then_with(|| a.entry.player_key.cmp(&b.entry.player_key))
        .then_with(|| a.index.cmp(&b.index))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
