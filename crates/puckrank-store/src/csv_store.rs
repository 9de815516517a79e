// CSV files: cleaned player-season tables and ranking outputs.
//
// Records are written with a fixed column order per group and read back as
// raw rows that go through the row normalizer again, so a file edited by hand
// is validated the same way a scraped page is.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use puckrank_core::normalize::{normalize_row, NormalizeReport, RawRow};
use puckrank_core::record::{PlayerSeasonRecord, PositionGroup, RankingEntry, StatCategory};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> StoreError + '_ {
    move |source| StoreError::Csv {
        path: path.display().to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Columns and file names
// ---------------------------------------------------------------------------

/// Header of a cleaned records file. Goalie files carry no position column.
pub fn record_columns(group: PositionGroup) -> Vec<&'static str> {
    let mut columns = vec!["season", "name", "age", "team"];
    if group == PositionGroup::Skaters {
        columns.push("position");
    }
    columns.extend(group.categories().iter().map(|c| c.key()));
    columns
}

/// Header of a ranking file for the given scored categories.
pub fn ranking_columns(categories: &[StatCategory]) -> Vec<String> {
    let mut columns: Vec<String> = ["rank", "name", "position", "season", "team", "games_played", "score"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    for c in categories {
        columns.push(c.key().to_string());
        columns.push(format!("{}_score", c.key()));
    }
    columns
}

/// `skater_data_2023_2025.csv` style name for a multi-season records file.
pub fn records_file_name(group: PositionGroup, seasons: &[u16]) -> String {
    match (seasons.iter().min(), seasons.iter().max()) {
        (Some(first), Some(last)) => format!("{}_data_{first}_{last}.csv", group.singular()),
        _ => format!("{}_data.csv", group.singular()),
    }
}

/// `goalie_rankings_2025_z-score.csv` style name for a ranking file.
pub fn ranking_file_name(group: PositionGroup, season: u16, strategy: &str) -> String {
    format!(
        "{}_rankings_{season}_{}.csv",
        group.singular(),
        strategy.replace(':', "_")
    )
}

/// Shortest text that parses back to the same f64.
pub fn format_value(value: f64) -> String {
    format!("{value}")
}

// ---------------------------------------------------------------------------
// Writer-based functions (enable testing without temp files)
// ---------------------------------------------------------------------------

/// Write records of `group` with the group's fixed column order. Missing
/// values become empty cells. Records of the other group are skipped.
pub fn write_records_to_writer<W: Write>(
    w: W,
    records: &[PlayerSeasonRecord],
    group: PositionGroup,
) -> Result<usize, csv::Error> {
    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(record_columns(group))?;

    let mut written = 0;
    for record in records {
        if record.group() != group {
            warn!(
                "not writing {} ({}) to the {group} file",
                record.name, record.position
            );
            continue;
        }
        let mut row = vec![
            record.season.to_string(),
            record.name.clone(),
            record.age.map(|a| a.to_string()).unwrap_or_default(),
            record.team.to_string(),
        ];
        if group == PositionGroup::Skaters {
            row.push(record.position.to_string());
        }
        row.extend(
            group
                .categories()
                .iter()
                .map(|c| record.get(*c).map(format_value).unwrap_or_default()),
        );
        writer.write_record(&row)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Write a ranking table, best first.
pub fn write_rankings_to_writer<W: Write>(w: W, entries: &[RankingEntry]) -> Result<(), csv::Error> {
    let categories: Vec<StatCategory> = entries
        .first()
        .map(|e| e.contributions.iter().map(|c| c.category).collect())
        .unwrap_or_default();

    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(ranking_columns(&categories))?;
    for entry in entries {
        let mut row = vec![
            entry.rank.to_string(),
            entry.name.clone(),
            entry.position.to_string(),
            entry.season.to_string(),
            entry.team.to_string(),
            format_value(entry.games_played),
            format_value(entry.score),
        ];
        for contribution in &entry.contributions {
            row.push(contribution.value.map(format_value).unwrap_or_default());
            row.push(format_value(contribution.weighted));
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reader-based loaders
// ---------------------------------------------------------------------------

/// Read a CSV into raw rows keyed by trimmed header text. Malformed rows are
/// logged and skipped.
pub fn read_raw_rows_from_reader<R: Read>(rdr: R) -> Result<Vec<RawRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => rows.push(
                headers
                    .iter()
                    .cloned()
                    .zip(record.iter().map(str::to_string))
                    .collect(),
            ),
            Err(e) => warn!("skipping malformed CSV row: {e}"),
        }
    }
    Ok(rows)
}

/// Read a records file and normalize every row under its own `season` cell.
///
/// Rows without a readable season are rejected and logged.
pub fn read_records_from_reader<R: Read>(
    rdr: R,
    group: PositionGroup,
) -> Result<NormalizeReport, csv::Error> {
    let rows = read_raw_rows_from_reader(rdr)?;
    let mut report = NormalizeReport::default();

    for row in &rows {
        let season = row.get("season").and_then(|s| s.trim().parse::<u16>().ok());
        let Some(season) = season else {
            warn!(
                "rejecting row without a valid season: {:?}",
                row.get("name").map(String::as_str).unwrap_or("<no name>")
            );
            report.rejected += 1;
            continue;
        };
        report.push(normalize_row(row, season, group));
    }

    info!(
        "read {} {group} rows: {} records, {} rejected, {} skipped",
        rows.len(),
        report.records.len(),
        report.rejected,
        report.skipped
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Public path-based functions
// ---------------------------------------------------------------------------

/// Copy `path` to `{stem}_backup_{YYYYmmdd_HHMMSS}.{ext}` beside it.
/// Returns `None` when there is nothing to back up.
pub fn backup_existing(path: &Path) -> Result<Option<PathBuf>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let file_name = match path.extension() {
        Some(ext) => format!("{stem}_backup_{stamp}.{}", ext.to_string_lossy()),
        None => format!("{stem}_backup_{stamp}"),
    };
    let backup = path.with_file_name(file_name);
    std::fs::copy(path, &backup).map_err(io_error(path))?;
    info!("backup created: {}", backup.display());
    Ok(Some(backup))
}

fn create_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(io_error(parent))
        }
        _ => Ok(()),
    }
}

/// Write a records file, backing up any file already at `path`.
/// Returns the backup path, if one was made.
pub fn write_records(
    path: &Path,
    records: &[PlayerSeasonRecord],
    group: PositionGroup,
) -> Result<Option<PathBuf>, StoreError> {
    create_parent(path)?;
    let backup = backup_existing(path)?;
    let file = File::create(path).map_err(io_error(path))?;
    let written = write_records_to_writer(file, records, group).map_err(csv_error(path))?;
    info!("wrote {written} {group} records to {}", path.display());
    Ok(backup)
}

/// Read and normalize a records file.
pub fn read_records(path: &Path, group: PositionGroup) -> Result<NormalizeReport, StoreError> {
    let file = File::open(path).map_err(io_error(path))?;
    read_records_from_reader(file, group).map_err(csv_error(path))
}

/// Write a ranking table to `path`, replacing any previous file.
pub fn write_rankings(path: &Path, entries: &[RankingEntry]) -> Result<(), StoreError> {
    create_parent(path)?;
    let file = File::create(path).map_err(io_error(path))?;
    write_rankings_to_writer(file, entries).map_err(csv_error(path))?;
    info!("wrote {} ranking rows to {}", entries.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
