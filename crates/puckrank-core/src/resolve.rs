// Duplicate resolution for traded players.
//
// A player traded mid-season appears once per team plus once on a combined
// "NTM" row carrying the season totals. Only the combined row survives.

use std::collections::HashMap;

use tracing::{error, info, warn};

use crate::error::{DataQualityWarning, EmptyInputError, IntegrityError};
use crate::record::PlayerSeasonRecord;

/// The surviving record for one (player, season) group.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub record: PlayerSeasonRecord,
    /// Rows of the group that were dropped.
    pub discarded: usize,
    /// Set when the group had more rows than the source data allows.
    pub integrity: Option<IntegrityError>,
    /// True when the dropped rows disagreed with the kept row's position.
    pub position_conflict: bool,
    pub warnings: Vec<DataQualityWarning>,
}

/// Summary of resolving a whole table.
#[derive(Debug, Clone, Default)]
pub struct ResolveReport {
    pub records: Vec<PlayerSeasonRecord>,
    pub input_rows: usize,
    pub duplicates_removed: usize,
    /// Player-seasons that had a combined row.
    pub traded_player_seasons: usize,
    pub integrity_errors: Vec<IntegrityError>,
    pub position_conflicts: usize,
    pub warnings: Vec<DataQualityWarning>,
}

/// Index of the row with the most games played among `candidates`.
/// The first candidate wins a tie.
fn most_games(rows: &[PlayerSeasonRecord], candidates: &[usize]) -> usize {
    let mut best = candidates[0];
    for &i in &candidates[1..] {
        if rows[i].games_played() > rows[best].games_played() {
            best = i;
        }
    }
    best
}

/// Pick the single record that represents one player-season.
///
/// `rows` must all belong to the same (player, season). An empty group is a
/// caller error.
pub fn resolve_group(rows: Vec<PlayerSeasonRecord>) -> Result<Resolution, EmptyInputError> {
    if rows.is_empty() {
        return Err(EmptyInputError::new("duplicate resolution received an empty group"));
    }

    let combined: Vec<usize> = (0..rows.len()).filter(|&i| rows[i].is_combined()).collect();
    let (candidates, is_combined) = if combined.is_empty() {
        ((0..rows.len()).collect::<Vec<_>>(), false)
    } else {
        (combined, true)
    };

    let keep = most_games(&rows, &candidates);
    let integrity = (candidates.len() > 1).then(|| IntegrityError {
        player: rows[keep].name.clone(),
        season: rows[keep].season,
        competing_rows: candidates.len(),
        combined: is_combined,
        kept_games_played: rows[keep].games_played(),
    });

    let position_conflict = rows.iter().any(|r| r.position != rows[keep].position);

    // A combined row should carry every category its team rows report.
    let mut warnings = Vec::new();
    if is_combined {
        let kept = &rows[keep];
        let mut missing: Vec<_> = rows
            .iter()
            .filter(|r| !r.is_combined())
            .flat_map(|r| r.stats.keys().copied())
            .filter(|c| kept.get(*c).is_none())
            .collect();
        missing.sort();
        missing.dedup();
        warnings.extend(missing.into_iter().map(|category| {
            DataQualityWarning::MissingCombinedCategory {
                player: kept.name.clone(),
                season: kept.season,
                category,
            }
        }));
    }

    let discarded = rows.len() - 1;
    let record = rows.into_iter().nth(keep).ok_or_else(|| {
        EmptyInputError::new("duplicate resolution lost the kept row")
    })?;

    Ok(Resolution {
        record,
        discarded,
        integrity,
        position_conflict,
        warnings,
    })
}

/// Resolve every (player, season) group in a table.
///
/// Output keeps the order in which each player-season first appeared.
pub fn resolve_table(records: Vec<PlayerSeasonRecord>) -> Result<ResolveReport, EmptyInputError> {
    if records.is_empty() {
        return Err(EmptyInputError::new("no records to resolve"));
    }

    let input_rows = records.len();
    let mut order: Vec<(String, u16)> = Vec::new();
    let mut groups: HashMap<(String, u16), Vec<PlayerSeasonRecord>> = HashMap::new();
    for record in records {
        let key = (record.player_key.clone(), record.season);
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(record);
    }

    let mut report = ResolveReport {
        input_rows,
        ..Default::default()
    };

    for key in order {
        let Some(rows) = groups.remove(&key) else {
            continue;
        };
        let traded = rows.iter().any(|r| r.is_combined());
        let resolution = resolve_group(rows)?;

        if traded {
            report.traded_player_seasons += 1;
        }
        if let Some(integrity) = resolution.integrity {
            error!("integrity error: {integrity}");
            report.integrity_errors.push(integrity);
        }
        if resolution.position_conflict {
            warn!(
                "{} ({}): positions differ across team rows, keeping {}",
                resolution.record.name, resolution.record.season, resolution.record.position
            );
            report.position_conflicts += 1;
        }
        for w in &resolution.warnings {
            warn!("data quality: {w}");
        }
        report.warnings.extend(resolution.warnings);
        report.duplicates_removed += resolution.discarded;
        report.records.push(resolution.record);
    }

    info!(
        "resolved {} rows into {} player-seasons ({} duplicates removed, {} traded, {} integrity errors)",
        report.input_rows,
        report.records.len(),
        report.duplicates_removed,
        report.traded_player_seasons,
        report.integrity_errors.len()
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
