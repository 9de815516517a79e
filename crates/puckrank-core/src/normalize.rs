// Row normalization: loosely-typed scraped rows in, typed records out.
//
// This is the only place string cells are interpreted. Downstream stages
// work on `PlayerSeasonRecord` and never look at raw cells again.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::DataQualityWarning;
use crate::record::{PlayerSeasonRecord, Position, PositionGroup, StatCategory, TeamMarker};

/// A scraped or file-loaded row: column label to cell text.
pub type RawRow = HashMap<String, String>;

const NAME_COLUMNS: &[&str] = &["name", "name_display", "player"];
const TEAM_COLUMNS: &[&str] = &["team", "team_name_abbr", "team_id"];
const POSITION_COLUMNS: &[&str] = &["position", "pos"];
const AGE_COLUMNS: &[&str] = &["age"];

/// Result of normalizing a single row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// A usable record. `missing` lists the categories whose column was
    /// present but blank or unparsable.
    Record {
        record: PlayerSeasonRecord,
        warnings: Vec<DataQualityWarning>,
        missing: Vec<StatCategory>,
    },
    /// Not a data row (blank, repeated header, league-average line).
    Skipped,
    /// A data row that cannot become a record.
    Rejected(DataQualityWarning),
}

/// Summary of a whole table pass.
#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub records: Vec<PlayerSeasonRecord>,
    pub warnings: Vec<DataQualityWarning>,
    pub skipped: usize,
    pub rejected: usize,
    /// Accepted records with at least one blank or unparsable category cell.
    pub rows_with_missing_categories: usize,
}

impl NormalizeReport {
    /// Fold one row outcome into the report, logging any warnings.
    pub fn push(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Record {
                record,
                warnings,
                missing,
            } => {
                for w in &warnings {
                    warn!("data quality: {w}");
                }
                if !missing.is_empty() {
                    debug!("{}: {} categories missing", record.name, missing.len());
                    self.rows_with_missing_categories += 1;
                }
                self.warnings.extend(warnings);
                self.records.push(record);
            }
            RowOutcome::Skipped => {
                debug!("skipping non-data row");
                self.skipped += 1;
            }
            RowOutcome::Rejected(w) => {
                warn!("rejected row: {w}");
                self.warnings.push(w);
                self.rejected += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

/// First non-blank cell among `columns`.
fn cell<'a>(row: &'a RawRow, columns: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .filter_map(|c| row.get(*c))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

/// Parse a numeric cell.
///
/// Accepts a leading `+` (plus/minus), a trailing `%`, thousands separators,
/// bare decimals like `.915`, and `MM:SS` clock values (returned in minutes).
/// Returns `Err(())` for text that is none of these.
pub fn parse_number(text: &str) -> Result<f64, ()> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('+')
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    if let Some((minutes, seconds)) = cleaned.split_once(':') {
        let m: f64 = minutes.trim().parse().map_err(|_| ())?;
        let s: f64 = seconds.trim().parse().map_err(|_| ())?;
        if !(0.0..60.0).contains(&s) {
            return Err(());
        }
        return Ok(m + s / 60.0);
    }

    let value: f64 = cleaned.parse().map_err(|_| ())?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(())
    }
}

// ---------------------------------------------------------------------------
// Row normalization
// ---------------------------------------------------------------------------

/// Normalize one row for the given season and group.
///
/// Blank or unparsable numeric cells become missing values; a bad cell
/// never rejects the whole row. Unknown positions and missing teams do.
pub fn normalize_row(row: &RawRow, season: u16, group: PositionGroup) -> RowOutcome {
    let Some(name) = cell(row, NAME_COLUMNS) else {
        return RowOutcome::Skipped;
    };
    if name.eq_ignore_ascii_case("player") || name.starts_with("League Average") {
        return RowOutcome::Skipped;
    }

    let Some(team) = cell(row, TEAM_COLUMNS).and_then(TeamMarker::parse) else {
        return RowOutcome::Rejected(DataQualityWarning::MissingTeam {
            player: name.to_string(),
        });
    };

    let position = match (cell(row, POSITION_COLUMNS), group) {
        // Goalie tables carry no position column.
        (None, PositionGroup::Goalies) => Position::G,
        (None, PositionGroup::Skaters) => {
            return RowOutcome::Rejected(DataQualityWarning::UnknownPosition {
                player: name.to_string(),
                code: String::new(),
            });
        }
        (Some(code), _) => match Position::from_str_pos(code) {
            Some(p) => p,
            None => {
                return RowOutcome::Rejected(DataQualityWarning::UnknownPosition {
                    player: name.to_string(),
                    code: code.to_string(),
                });
            }
        },
    };
    if position.group() != group {
        return RowOutcome::Rejected(DataQualityWarning::WrongGroup {
            player: name.to_string(),
            position,
            group,
        });
    }

    let mut record = PlayerSeasonRecord::new(name, season, team, position);
    let mut warnings = Vec::new();
    let mut unfilled = Vec::new();

    record.age = cell(row, AGE_COLUMNS).and_then(|a| a.parse().ok());

    for &category in group.categories() {
        let cells: Vec<(&str, &str)> = category
            .aliases()
            .iter()
            .filter_map(|c| row.get(*c).map(|v| (*c, v.trim())))
            .collect();
        if cells.is_empty() {
            // The table has no column for this category at all.
            continue;
        }
        let Some(&(column, text)) = cells.iter().find(|(_, v)| !v.is_empty()) else {
            unfilled.push(category);
            continue;
        };
        match parse_number(text) {
            Ok(value) => {
                record.stats.insert(category, value);
            }
            Err(()) => {
                warnings.push(DataQualityWarning::UnparsableNumber {
                    player: record.name.clone(),
                    column: column.to_string(),
                    value: text.to_string(),
                });
                unfilled.push(category);
            }
        }
    }

    if group == PositionGroup::Skaters {
        derive_special_teams_points(row, &mut record);
    }

    let missing = unfilled
        .into_iter()
        .filter(|c| record.get(*c).is_none())
        .collect();
    RowOutcome::Record {
        record,
        warnings,
        missing,
    }
}

/// Hockey-Reference splits special-teams scoring into goals and assists.
/// Fill power-play and short-handed points from those when the table has no
/// points column of its own.
fn derive_special_teams_points(row: &RawRow, record: &mut PlayerSeasonRecord) {
    let pairs = [
        (StatCategory::PowerPlayPoints, StatCategory::PowerPlayGoals, "assists_pp"),
        (StatCategory::ShortHandedPoints, StatCategory::ShortHandedGoals, "assists_sh"),
    ];
    for (points, goals, assists_column) in pairs {
        if record.get(points).is_some() {
            continue;
        }
        let assists = cell(row, &[assists_column]).and_then(|a| parse_number(a).ok());
        if let (Some(g), Some(a)) = (record.get(goals), assists) {
            record.stats.insert(points, g + a);
        }
    }
}

/// Normalize a whole table, collecting warnings instead of stopping on them.
pub fn normalize_table(rows: &[RawRow], season: u16, group: PositionGroup) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    for row in rows {
        report.push(normalize_row(row, season, group));
    }

    info!(
        "normalized {} {} rows for {}: {} records ({} with missing categories), {} rejected, {} skipped",
        rows.len(),
        group,
        season,
        report.records.len(),
        report.rows_with_missing_categories,
        report.rejected,
        report.skipped
    );
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn expect_record(outcome: RowOutcome) -> (PlayerSeasonRecord, Vec<DataQualityWarning>) {
        match outcome {
            RowOutcome::Record { record, warnings, .. } => (record, warnings),
            other => panic!("expected a record, got {other:?}"),
        }
    }

    fn missing_of(outcome: RowOutcome) -> Vec<StatCategory> {
        match outcome {
            RowOutcome::Record { missing, .. } => missing,
            other => panic!("expected a record, got {other:?}"),
        }
    }

    // ---- parse_number ----

    #[test]
    fn parses_plain_and_decorated_numbers() {
        assert_eq!(parse_number("25"), Ok(25.0));
        assert_eq!(parse_number("+12"), Ok(12.0));
        assert_eq!(parse_number("-7"), Ok(-7.0));
        assert_eq!(parse_number(".915"), Ok(0.915));
        assert_eq!(parse_number("54.3%"), Ok(54.3));
        assert_eq!(parse_number("1,234"), Ok(1234.0));
    }

    #[test]
    fn parses_clock_values_as_minutes() {
        assert_eq!(parse_number("18:30"), Ok(18.5));
        assert_eq!(parse_number("0:45"), Ok(0.75));
        assert!(parse_number("18:75").is_err());
    }

    #[test]
    fn rejects_text_and_non_finite() {
        assert!(parse_number("abc").is_err());
        assert!(parse_number("inf").is_err());
        assert!(parse_number("NaN").is_err());
    }

    // ---- normalize_row ----

    #[test]
    fn skater_row_from_scraped_labels() {
        let r = row(&[
            ("name_display", "Bo Horvat"),
            ("age", "27"),
            ("team_name_abbr", "2TM"),
            ("pos", "C"),
            ("games", "69"),
            ("goals", "31"),
            ("assists", "39"),
            ("points", "70"),
            ("plus_minus", "-9"),
            ("blocks", "38"),
        ]);
        let (rec, warnings) = expect_record(normalize_row(&r, 2023, PositionGroup::Skaters));
        assert!(warnings.is_empty());
        assert_eq!(rec.name, "Bo Horvat");
        assert_eq!(rec.season, 2023);
        assert!(rec.is_combined());
        assert_eq!(rec.position, Position::C);
        assert_eq!(rec.age, Some(27));
        assert_eq!(rec.get(StatCategory::GamesPlayed), Some(69.0));
        assert_eq!(rec.get(StatCategory::Goals), Some(31.0));
        assert_eq!(rec.get(StatCategory::PlusMinus), Some(-9.0));
        assert_eq!(rec.get(StatCategory::BlockedShots), Some(38.0));
    }

    #[test]
    fn skater_row_from_csv_labels() {
        let r = row(&[
            ("name", "Quinn Hughes"),
            ("team", "VAN"),
            ("position", "D"),
            ("games_played", "82"),
            ("blocked_shots", "90"),
            ("shooting_percentage", "5.2"),
        ]);
        let (rec, _) = expect_record(normalize_row(&r, 2024, PositionGroup::Skaters));
        assert_eq!(rec.team, TeamMarker::Team("VAN".into()));
        assert!(!rec.is_combined());
        assert_eq!(rec.get(StatCategory::BlockedShots), Some(90.0));
        assert_eq!(rec.get(StatCategory::ShootingPercentage), Some(5.2));
    }

    #[test]
    fn blank_cells_become_missing_without_warning() {
        let r = row(&[
            ("name", "Depth Guy"),
            ("team", "SJS"),
            ("position", "RW"),
            ("games_played", "3"),
            ("shooting_percentage", ""),
            ("hits", "  "),
        ]);
        let (rec, warnings) = expect_record(normalize_row(&r, 2024, PositionGroup::Skaters));
        assert!(warnings.is_empty());
        assert_eq!(rec.get(StatCategory::ShootingPercentage), None);
        assert_eq!(rec.get(StatCategory::Hits), None);
    }

    #[test]
    fn unparsable_cell_is_missing_and_warned() {
        let r = row(&[
            ("name", "Typo Player"),
            ("team", "BOS"),
            ("position", "LW"),
            ("goals", "1O"),
            ("assists", "12"),
        ]);
        let (rec, warnings) = expect_record(normalize_row(&r, 2024, PositionGroup::Skaters));
        assert_eq!(rec.get(StatCategory::Goals), None);
        assert_eq!(rec.get(StatCategory::Assists), Some(12.0));
        assert_eq!(
            warnings,
            vec![DataQualityWarning::UnparsableNumber {
                player: "Typo Player".into(),
                column: "goals".into(),
                value: "1O".into(),
            }]
        );
    }

    #[test]
    fn unknown_position_rejects_row() {
        let r = row(&[("name", "Mystery"), ("team", "TOR"), ("position", "F")]);
        assert_eq!(
            normalize_row(&r, 2024, PositionGroup::Skaters),
            RowOutcome::Rejected(DataQualityWarning::UnknownPosition {
                player: "Mystery".into(),
                code: "F".into(),
            })
        );
    }

    #[test]
    fn goalie_in_skater_table_rejected() {
        let r = row(&[("name", "Backup"), ("team", "TOR"), ("position", "G")]);
        assert!(matches!(
            normalize_row(&r, 2024, PositionGroup::Skaters),
            RowOutcome::Rejected(DataQualityWarning::WrongGroup { .. })
        ));
    }

    #[test]
    fn goalie_rows_default_to_g() {
        let r = row(&[
            ("player", "Connor Hellebuyck"),
            ("team_id", "WPG"),
            ("games_goalie", "60"),
            ("wins_goalie", "47"),
            ("save_pct", ".925"),
            ("goals_against_avg", "2.00"),
        ]);
        let (rec, _) = expect_record(normalize_row(&r, 2025, PositionGroup::Goalies));
        assert_eq!(rec.position, Position::G);
        assert_eq!(rec.get(StatCategory::GamesPlayed), Some(60.0));
        assert_eq!(rec.get(StatCategory::Wins), Some(47.0));
        assert_eq!(rec.get(StatCategory::SavePercentage), Some(0.925));
        assert_eq!(rec.get(StatCategory::GoalsAgainstAverage), Some(2.0));
        // Skater columns are not read for goalies.
        assert_eq!(rec.get(StatCategory::Goals), None);
    }

    #[test]
    fn header_and_blank_rows_are_skipped() {
        let header = row(&[("name_display", "Player"), ("team_name_abbr", "Team")]);
        assert_eq!(normalize_row(&header, 2024, PositionGroup::Skaters), RowOutcome::Skipped);
        assert_eq!(normalize_row(&RawRow::new(), 2024, PositionGroup::Skaters), RowOutcome::Skipped);
    }

    #[test]
    fn missing_team_rejects_row() {
        let r = row(&[("name", "Nobody"), ("position", "C")]);
        assert!(matches!(
            normalize_row(&r, 2024, PositionGroup::Skaters),
            RowOutcome::Rejected(DataQualityWarning::MissingTeam { .. })
        ));
    }

    #[test]
    fn special_teams_points_derived_from_split_columns() {
        let r = row(&[
            ("name", "PP Specialist"),
            ("team", "EDM"),
            ("pos", "C"),
            ("goals_pp", "15"),
            ("assists_pp", "30"),
            ("goals_sh", "1"),
        ]);
        let (rec, _) = expect_record(normalize_row(&r, 2024, PositionGroup::Skaters));
        assert_eq!(rec.get(StatCategory::PowerPlayPoints), Some(45.0));
        // No short-handed assists column: stays missing.
        assert_eq!(rec.get(StatCategory::ShortHandedPoints), None);
    }

    #[test]
    fn average_toi_read_as_minutes() {
        let r = row(&[
            ("name", "Workhorse"),
            ("team", "CAR"),
            ("pos", "D"),
            ("time_on_ice", "1850"),
            ("time_on_ice_avg", "24:15"),
        ]);
        let (rec, _) = expect_record(normalize_row(&r, 2024, PositionGroup::Skaters));
        assert_eq!(rec.get(StatCategory::TimeOnIce), Some(24.25));
    }

    #[test]
    fn season_total_toi_is_not_stored_as_average() {
        let r = row(&[
            ("name", "Workhorse"),
            ("team", "CAR"),
            ("pos", "D"),
            ("time_on_ice", "1850"),
        ]);
        let (rec, _) = expect_record(normalize_row(&r, 2024, PositionGroup::Skaters));
        assert_eq!(rec.get(StatCategory::TimeOnIce), None);
    }

    #[test]
    fn blank_and_unparsable_cells_are_listed_as_missing() {
        let r = row(&[
            ("name", "Half Line"),
            ("team", "MIN"),
            ("pos", "RW"),
            ("goals", "12"),
            ("assists", ""),
            ("hits", "n/a"),
        ]);
        let missing = missing_of(normalize_row(&r, 2024, PositionGroup::Skaters));
        assert_eq!(missing, vec![StatCategory::Assists, StatCategory::Hits]);
    }

    #[test]
    fn absent_columns_and_derived_points_are_not_missing() {
        let r = row(&[
            ("name", "PP Specialist"),
            ("team", "EDM"),
            ("pos", "C"),
            ("points_pp", ""),
            ("goals_pp", "15"),
            ("assists_pp", "30"),
        ]);
        assert!(missing_of(normalize_row(&r, 2024, PositionGroup::Skaters)).is_empty());
    }

    // ---- normalize_table ----

    #[test]
    fn table_pass_isolates_bad_rows() {
        let rows = vec![
            row(&[("name", "A"), ("team", "VAN"), ("position", "C"), ("goals", "10")]),
            row(&[("name", "Player"), ("team", "Tm")]),
            row(&[("name", "B"), ("team", "VAN"), ("position", "X")]),
            row(&[("name", "C"), ("team", "VAN"), ("position", "D"), ("goals", "??")]),
        ];
        let report = normalize_table(&rows, 2024, PositionGroup::Skaters);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.rows_with_missing_categories, 1);
    }

    #[test]
    fn missing_categories_counted_per_row_not_per_player() {
        let rows = vec![
            row(&[("name", "Traded Guy"), ("team", "2TM"), ("position", "C"), ("goals", ""), ("hits", "5")]),
            row(&[("name", "Traded Guy"), ("team", "CHI"), ("position", "C"), ("goals", "3"), ("hits", "x")]),
            row(&[("name", "Traded Guy"), ("team", "DAL"), ("position", "C"), ("goals", "2"), ("hits", "?")]),
            row(&[("name", "Other Guy"), ("team", "CHI"), ("position", "D"), ("goals", ""), ("hits", "40")]),
            row(&[("name", "Complete"), ("team", "CHI"), ("position", "D"), ("goals", "1"), ("hits", "40")]),
        ];
        let report = normalize_table(&rows, 2024, PositionGroup::Skaters);
        assert_eq!(report.records.len(), 5);
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.rows_with_missing_categories, 4);
    }
}
