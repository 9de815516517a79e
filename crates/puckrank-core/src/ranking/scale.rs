// Per-category scales: turn a population of oriented values into comparable scores.
//
// Every value handed to a scale is already oriented so that bigger is better.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pool statistics
// ---------------------------------------------------------------------------

/// Mean and standard deviation for a single category across the population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub mean: f64,
    pub stdev: f64,
}

/// Threshold below which standard deviation is treated as zero.
const STDEV_EPSILON: f64 = 1e-9;

/// Mean and population standard deviation (N denominator) of `values`.
///
/// Returns zeros for an empty slice.
pub fn compute_pool_stats(values: &[f64]) -> PoolStats {
    if values.is_empty() {
        return PoolStats {
            mean: 0.0,
            stdev: 0.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    PoolStats {
        mean,
        stdev: variance.sqrt(),
    }
}

/// Z-score of `value`, or 0.0 when the population has no spread.
pub fn compute_zscore(value: f64, stats: &PoolStats) -> f64 {
    if stats.stdev < STDEV_EPSILON {
        return 0.0;
    }
    (value - stats.mean) / stats.stdev
}

// ---------------------------------------------------------------------------
// Score methods
// ---------------------------------------------------------------------------

/// How raw category values become per-category scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMethod {
    /// Sum of raw values, every category at weight 1.
    RawSum,
    /// Sum of raw values times configured weights.
    WeightedSum,
    /// Percentile rank (0-100], ties share the average rank.
    Percentile,
    /// Standard score against the population.
    ZScore,
    /// Min-max scaled to [0, 1].
    Normalized,
    /// Dense rank, best value first.
    RankSum,
}

impl ScoreMethod {
    pub const ALL: [ScoreMethod; 6] = [
        ScoreMethod::RawSum,
        ScoreMethod::WeightedSum,
        ScoreMethod::Percentile,
        ScoreMethod::ZScore,
        ScoreMethod::Normalized,
        ScoreMethod::RankSum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScoreMethod::RawSum => "raw-sum",
            ScoreMethod::WeightedSum => "weighted",
            ScoreMethod::Percentile => "percentile",
            ScoreMethod::ZScore => "z-score",
            ScoreMethod::Normalized => "normalized",
            ScoreMethod::RankSum => "rank-sum",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "raw-sum" | "raw" => Some(ScoreMethod::RawSum),
            "weighted" | "weighted-sum" => Some(ScoreMethod::WeightedSum),
            "percentile" => Some(ScoreMethod::Percentile),
            "z-score" | "zscore" => Some(ScoreMethod::ZScore),
            "normalized" | "min-max" => Some(ScoreMethod::Normalized),
            "rank-sum" | "rank" => Some(ScoreMethod::RankSum),
            _ => None,
        }
    }

    /// Whether configured weights and position multipliers apply.
    pub fn uses_weights(&self) -> bool {
        !matches!(self, ScoreMethod::RawSum)
    }
}

// ---------------------------------------------------------------------------
// Category scale
// ---------------------------------------------------------------------------

/// A scale fitted to one category's population.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryScale {
    Identity,
    Percentile { sorted: Vec<f64> },
    ZScore(PoolStats),
    MinMax { min: f64, max: f64 },
    /// Distinct values, best first. Ranks are centred on the middle rank so
    /// that a missing value sits between the best and the worst.
    DenseRank { distinct: Vec<f64> },
}

impl CategoryScale {
    /// Fit a scale for `method` to the present (already oriented) values.
    pub fn fit(method: ScoreMethod, values: &[f64]) -> Self {
        match method {
            ScoreMethod::RawSum | ScoreMethod::WeightedSum => CategoryScale::Identity,
            ScoreMethod::Percentile => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                CategoryScale::Percentile { sorted }
            }
            ScoreMethod::ZScore => CategoryScale::ZScore(compute_pool_stats(values)),
            ScoreMethod::Normalized => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                CategoryScale::MinMax { min, max }
            }
            ScoreMethod::RankSum => {
                let mut distinct = values.to_vec();
                distinct.sort_by(|a, b| b.total_cmp(a));
                distinct.dedup();
                CategoryScale::DenseRank { distinct }
            }
        }
    }

    /// Score of an oriented value that belongs to the fitted population.
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            CategoryScale::Identity => value,
            CategoryScale::Percentile { sorted } => {
                if sorted.is_empty() {
                    return self.neutral();
                }
                let below = sorted.partition_point(|v| *v < value);
                let through = sorted.partition_point(|v| *v <= value);
                let equal = (through - below) as f64;
                let avg_rank = below as f64 + (equal + 1.0) / 2.0;
                avg_rank / sorted.len() as f64 * 100.0
            }
            CategoryScale::ZScore(stats) => compute_zscore(value, stats),
            CategoryScale::MinMax { min, max } => {
                let span = max - min;
                if !span.is_finite() || span < STDEV_EPSILON {
                    return self.neutral();
                }
                (value - min) / span
            }
            CategoryScale::DenseRank { distinct } => {
                let rank = distinct.partition_point(|v| *v > value) as f64 + 1.0;
                let middle = (distinct.len() as f64 + 1.0) / 2.0;
                middle - rank
            }
        }
    }

    /// Score given to a missing value: neither the best nor the worst.
    pub fn neutral(&self) -> f64 {
        match self {
            CategoryScale::Identity | CategoryScale::ZScore(_) | CategoryScale::DenseRank { .. } => 0.0,
            CategoryScale::Percentile { .. } => 50.0,
            CategoryScale::MinMax { .. } => 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn pool_stats_basic() {
        let stats = compute_pool_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!(approx_eq(stats.mean, 5.0, 1e-10));
        assert!(approx_eq(stats.stdev, 2.0, 1e-10));
    }

    #[test]
    fn pool_stats_empty() {
        let stats = compute_pool_stats(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.stdev, 0.0);
    }

    #[test]
    fn zscore_zero_stdev_returns_zero() {
        let stats = compute_pool_stats(&[4.0, 4.0, 4.0]);
        assert_eq!(compute_zscore(4.0, &stats), 0.0);
    }

    #[test]
    fn zscore_above_mean_is_positive() {
        let stats = PoolStats { mean: 10.0, stdev: 2.0 };
        assert!(approx_eq(compute_zscore(14.0, &stats), 2.0, 1e-10));
        assert!(approx_eq(compute_zscore(8.0, &stats), -1.0, 1e-10));
    }

    #[test]
    fn percentile_averages_ties() {
        let scale = CategoryScale::fit(ScoreMethod::Percentile, &[10.0, 20.0, 20.0, 40.0]);
        assert!(approx_eq(scale.apply(10.0), 25.0, 1e-10));
        // ranks 2 and 3 share 2.5
        assert!(approx_eq(scale.apply(20.0), 62.5, 1e-10));
        assert!(approx_eq(scale.apply(40.0), 100.0, 1e-10));
    }

    #[test]
    fn percentile_of_constant_population_is_shared() {
        let scale = CategoryScale::fit(ScoreMethod::Percentile, &[3.0, 3.0, 3.0]);
        assert!(approx_eq(scale.apply(3.0), 66.666_666_666, 1e-6));
    }

    #[test]
    fn min_max_spans_zero_to_one() {
        let scale = CategoryScale::fit(ScoreMethod::Normalized, &[5.0, 10.0, 15.0]);
        assert_eq!(scale.apply(5.0), 0.0);
        assert_eq!(scale.apply(10.0), 0.5);
        assert_eq!(scale.apply(15.0), 1.0);
    }

    #[test]
    fn min_max_without_spread_is_neutral() {
        let scale = CategoryScale::fit(ScoreMethod::Normalized, &[7.0, 7.0]);
        assert_eq!(scale.apply(7.0), 0.5);
    }

    #[test]
    fn dense_rank_is_centred_and_best_first() {
        let scale = CategoryScale::fit(ScoreMethod::RankSum, &[30.0, 10.0, 30.0, 20.0]);
        // distinct: 30, 20, 10 -> ranks 1, 2, 3, middle 2
        assert_eq!(scale.apply(30.0), 1.0);
        assert_eq!(scale.apply(20.0), 0.0);
        assert_eq!(scale.apply(10.0), -1.0);
    }

    #[test]
    fn identity_keeps_value() {
        let scale = CategoryScale::fit(ScoreMethod::WeightedSum, &[1.0]);
        assert_eq!(scale.apply(-3.5), -3.5);
        assert_eq!(scale.neutral(), 0.0);
    }

    #[test]
    fn method_names_round_trip() {
        for method in ScoreMethod::ALL {
            assert_eq!(ScoreMethod::from_name(method.name()), Some(method));
        }
        assert_eq!(ScoreMethod::from_name("z_score"), Some(ScoreMethod::ZScore));
        assert_eq!(ScoreMethod::from_name("vibes"), None);
    }
}
