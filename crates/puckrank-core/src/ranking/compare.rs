// Side-by-side comparison of several strategies over one population.

use std::collections::HashMap;

use crate::ranking::scoring::ScoringConfig;
use crate::ranking::strategy::{RankingError, RankingOutcome, Strategy};
use crate::record::{PlayerSeasonRecord, Position};

/// One player's rank under each compared strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub name: String,
    pub player_key: String,
    pub position: Position,
    /// Rank per strategy, in `Comparison::strategies` order. `None` when the
    /// strategy excluded the player.
    pub ranks: Vec<Option<usize>>,
}

impl ComparisonRow {
    /// Mean of the ranks the player received.
    pub fn mean_rank(&self) -> f64 {
        let present: Vec<f64> = self.ranks.iter().flatten().map(|r| *r as f64).collect();
        if present.is_empty() {
            return f64::INFINITY;
        }
        present.iter().sum::<f64>() / present.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub strategies: Vec<Strategy>,
    /// Union of every strategy's top players, best mean rank first.
    pub rows: Vec<ComparisonRow>,
    pub outcomes: Vec<RankingOutcome>,
}

/// Run each strategy and tabulate the union of their top `top` players.
pub fn compare(
    records: &[PlayerSeasonRecord],
    config: &ScoringConfig,
    strategies: &[Strategy],
    top: usize,
) -> Result<Comparison, RankingError> {
    let outcomes = strategies
        .iter()
        .map(|s| s.rank(records, config))
        .collect::<Result<Vec<_>, _>>()?;

    let lookups: Vec<HashMap<&str, usize>> = outcomes
        .iter()
        .map(|o| {
            o.entries
                .iter()
                .map(|e| (e.player_key.as_str(), e.rank))
                .collect()
        })
        .collect();

    let mut rows: Vec<ComparisonRow> = Vec::new();
    for outcome in &outcomes {
        for entry in outcome.entries.iter().take(top) {
            if rows.iter().any(|r| r.player_key == entry.player_key) {
                continue;
            }
            rows.push(ComparisonRow {
                name: entry.name.clone(),
                player_key: entry.player_key.clone(),
                position: entry.position,
                ranks: lookups
                    .iter()
                    .map(|l| l.get(entry.player_key.as_str()).copied())
                    .collect(),
            });
        }
    }

    rows.sort_by(|a, b| {
        a.mean_rank()
            .total_cmp(&b.mean_rank())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.player_key.cmp(&b.player_key))
    });

    Ok(Comparison {
        strategies: strategies.to_vec(),
        rows,
        outcomes,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
