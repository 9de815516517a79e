// Plain-text reports printed after each command.

use std::fmt::Write;

use puckrank_core::ranking::{CategoryLeaders, Comparison, Direction};

use crate::pipeline::{CleanSummary, CollectSummary, RankSummary};

pub fn collect_report(summaries: &[CollectSummary]) -> String {
    let mut out = String::new();
    for s in summaries {
        let _ = writeln!(
            out,
            "{}: {} of {} seasons collected {:?}",
            s.group,
            s.seasons_collected.len(),
            s.seasons_requested.len(),
            s.seasons_collected
        );
        let _ = writeln!(
            out,
            "  {} rows scraped, {} rejected, {} with missing categories, {} warnings",
            s.raw_rows, s.rejected_rows, s.rows_with_missing_categories, s.warnings
        );
        let _ = writeln!(
            out,
            "  {} duplicates removed, {} integrity errors, {} position conflicts",
            s.duplicates_removed, s.integrity_errors, s.position_conflicts
        );
        match &s.csv_path {
            Some(path) => {
                let _ = writeln!(out, "  {} player-seasons saved to {}", s.records, path.display());
            }
            None => {
                let _ = writeln!(out, "  nothing saved");
            }
        }
        if let Some(backup) = &s.backup {
            let _ = writeln!(out, "  previous file backed up to {}", backup.display());
        }
    }
    out
}

pub fn clean_report(summary: &CleanSummary) -> String {
    let mut out = String::new();
    let r = &summary.resolve;
    let _ = writeln!(
        out,
        "{} rows read, {} rejected, {} with missing categories",
        summary.rows_read, summary.rejected_rows, summary.rows_with_missing_categories
    );
    let _ = writeln!(
        out,
        "{} duplicates removed across {} traded player-seasons",
        r.duplicates_removed, r.traded_player_seasons
    );
    if !r.integrity_errors.is_empty() {
        let _ = writeln!(out, "{} integrity errors (see log)", r.integrity_errors.len());
    }
    if r.position_conflicts > 0 {
        let _ = writeln!(out, "{} position conflicts (see log)", r.position_conflicts);
    }
    let _ = writeln!(out, "{} records written to {}", r.records.len(), summary.output.display());
    if let Some(backup) = &summary.backup {
        let _ = writeln!(out, "previous file backed up to {}", backup.display());
    }
    out
}

/// Top `top` entries of a ranking, one line each.
pub fn rank_report(summary: &RankSummary, top: usize) -> String {
    let outcome = &summary.outcome;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} ranked by {} ({} players, {} excluded)",
        summary.season,
        summary.group,
        outcome.strategy,
        outcome.entries.len(),
        outcome.excluded.len()
    );
    let _ = writeln!(out, "{:>4}  {:<26} {:<3} {:<4} {:>4} {:>10}", "Rank", "Player", "Pos", "Team", "GP", "Score");
    for entry in outcome.entries.iter().take(top) {
        let _ = writeln!(
            out,
            "{:>4}  {:<26} {:<3} {:<4} {:>4} {:>10.3}",
            entry.rank,
            entry.name,
            entry.position.to_string(),
            entry.team.to_string(),
            entry.games_played,
            entry.score
        );
    }
    let _ = writeln!(out, "written to {} (run {})", summary.output.display(), summary.run_id);
    out
}

/// Comparison table: one column of ranks per strategy, `-` where the
/// strategy left the player out.
pub fn compare_report(comparison: &Comparison) -> String {
    let names: Vec<String> = comparison.strategies.iter().map(|s| s.to_string()).collect();
    let width = names.iter().map(String::len).max().unwrap_or(4).max(4);

    let mut out = String::new();
    let _ = write!(out, "{:<26}", "Player");
    for name in &names {
        let _ = write!(out, " {name:>width$}");
    }
    let _ = writeln!(out, " {:>width$}", "mean");

    for row in &comparison.rows {
        let _ = write!(out, "{:<26}", row.name);
        for rank in &row.ranks {
            let cell = rank.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
            let _ = write!(out, " {cell:>width$}");
        }
        let _ = writeln!(out, " {:>width$.1}", row.mean_rank());
    }
    out
}

/// One block per category: rank, player, position, team, games and value.
pub fn leaders_report(season: u16, boards: &[CategoryLeaders]) -> String {
    let mut out = String::new();
    for board in boards {
        let order = match board.direction {
            Direction::HigherIsBetter => "highest first",
            Direction::LowerIsBetter => "lowest first",
        };
        let _ = write!(out, "{season} {} leaders ({order}", board.category);
        if let Some(position) = board.position {
            let _ = write!(out, ", {position} only");
        }
        if board.min_games > 0.0 {
            let _ = write!(out, ", min {} GP", board.min_games);
        }
        let _ = writeln!(out, ")");
        for leader in &board.leaders {
            let _ = writeln!(
                out,
                "{:>4}  {:<26} {:<3} {:<4} {:>4} {:>10}",
                leader.rank,
                leader.name,
                leader.position.to_string(),
                leader.team.to_string(),
                leader.games_played,
                leader.value
            );
        }
        if board.missing > 0 {
            let _ = writeln!(out, "  {} players without a value", board.missing);
        }
        let _ = writeln!(out);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use puckrank_core::ranking::{compare, Direction, ScoreMethod, ScoringConfig, Strategy};
    use puckrank_core::record::{PlayerSeasonRecord, Position, PositionGroup, StatCategory, TeamMarker};

    use super::*;

    fn records() -> Vec<PlayerSeasonRecord> {
        vec![
            PlayerSeasonRecord::new("Auston Matthews", 2024, TeamMarker::Team("TOR".into()), Position::C)
                .with_stat(StatCategory::GamesPlayed, 81.0)
                .with_stat(StatCategory::Goals, 69.0),
            PlayerSeasonRecord::new("Sam Reinhart", 2024, TeamMarker::Team("FLA".into()), Position::C)
                .with_stat(StatCategory::GamesPlayed, 82.0)
                .with_stat(StatCategory::Goals, 57.0),
        ]
    }

    fn goals_only() -> ScoringConfig {
        ScoringConfig::equal_weight(&[(StatCategory::Goals, Direction::HigherIsBetter)])
    }

    #[test]
    fn rank_report_lists_top_entries() {
        let outcome = Strategy::Base(ScoreMethod::RawSum).rank(&records(), &goals_only()).unwrap();
        let summary = RankSummary {
            season: 2024,
            group: PositionGroup::Skaters,
            outcome,
            output: PathBuf::from("data/skaters_2024_raw-sum_rankings.csv"),
            run_id: 7,
        };
        let text = rank_report(&summary, 1);
        assert!(text.starts_with("2024 skaters ranked by raw-sum (2 players, 0 excluded)"));
        assert!(text.contains("Auston Matthews"));
        assert!(!text.contains("Sam Reinhart"));
        assert!(text.contains("69.000"));
        assert!(text.contains("(run 7)"));
    }

    #[test]
    fn collect_report_shows_missing_categories_and_conflicts() {
        let summary = CollectSummary {
            group: PositionGroup::Skaters,
            seasons_requested: vec![2023, 2024],
            seasons_collected: vec![2024],
            raw_rows: 40,
            rejected_rows: 1,
            rows_with_missing_categories: 7,
            warnings: 3,
            duplicates_removed: 4,
            integrity_errors: 1,
            position_conflicts: 2,
            records: 35,
            csv_path: Some(PathBuf::from("data/skater_data_2024_2024.csv")),
            backup: None,
        };
        let text = collect_report(&[summary]);
        assert!(text.contains("40 rows scraped, 1 rejected, 7 with missing categories, 3 warnings"));
        assert!(text.contains("4 duplicates removed, 1 integrity errors, 2 position conflicts"));
        assert!(text.contains("35 player-seasons saved to data/skater_data_2024_2024.csv"));
    }

    #[test]
    fn clean_report_mentions_conflicts_only_when_present() {
        let resolve = puckrank_core::resolve::resolve_table(records()).unwrap();
        let mut summary = CleanSummary {
            rows_read: 2,
            rejected_rows: 0,
            rows_with_missing_categories: 1,
            resolve,
            output: PathBuf::from("out.csv"),
            backup: None,
        };
        let text = clean_report(&summary);
        assert!(text.starts_with("2 rows read, 0 rejected, 1 with missing categories"));
        assert!(!text.contains("position conflicts"));

        summary.resolve.position_conflicts = 1;
        assert!(clean_report(&summary).contains("1 position conflicts (see log)"));
    }

    #[test]
    fn leaders_report_names_order_and_filters() {
        let cfg = goals_only();
        let mut query = puckrank_core::ranking::LeaderQuery::new(StatCategory::Goals, &cfg, 1);
        query.position = Some(Position::C);
        let board =
            puckrank_core::ranking::category_leaders(&records(), PositionGroup::Skaters, &query).unwrap();
        let text = leaders_report(2024, &[board]);
        assert!(text.starts_with("2024 goals leaders (highest first, C only)"));
        assert!(text.contains("Auston Matthews"));
        assert!(!text.contains("Sam Reinhart"));
    }

    #[test]
    fn compare_report_has_a_column_per_strategy() {
        let strategies = [Strategy::Base(ScoreMethod::RawSum), Strategy::Efficiency(ScoreMethod::RawSum)];
        let cmp = compare(&records(), &goals_only(), &strategies, 2).unwrap();
        let text = compare_report(&cmp);
        let header = text.lines().next().unwrap();
        assert!(header.contains("raw-sum"));
        assert!(header.contains("efficiency:raw-sum"));
        assert!(header.ends_with("mean"));
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(1).unwrap().starts_with("Auston Matthews"));
    }
}
