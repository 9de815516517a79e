// Command implementations: collect, clean, rank, compare and leaders.
//
// Each step returns a summary for the caller to print; nothing here writes to
// stdout.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use puckrank_core::normalize::normalize_table;
use puckrank_core::ranking::{
    category_leaders, compare, population, CategoryLeaders, Comparison, LeaderQuery, RankingOutcome,
    ScoringConfig, Strategy,
};
use puckrank_core::record::{PlayerSeasonRecord, Position, PositionGroup, StatCategory};
use puckrank_core::resolve::{resolve_table, ResolveReport};
use puckrank_scrape::{Collector, PageSource};
use puckrank_store::{csv_store, Database};

use crate::workspace::Workspace;

// ---------------------------------------------------------------------------
// collect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CollectSummary {
    pub group: PositionGroup,
    pub seasons_requested: Vec<u16>,
    pub seasons_collected: Vec<u16>,
    pub raw_rows: usize,
    pub rejected_rows: usize,
    pub rows_with_missing_categories: usize,
    pub warnings: usize,
    pub duplicates_removed: usize,
    pub integrity_errors: usize,
    pub position_conflicts: usize,
    pub records: usize,
    pub csv_path: Option<PathBuf>,
    pub backup: Option<PathBuf>,
}

/// Scrape, normalize and resolve each group, then store the result as CSV
/// and in the database.
pub async fn collect<S: PageSource>(
    ws: &Workspace,
    db: &Database,
    source: S,
    seasons: &[u16],
    groups: &[PositionGroup],
) -> Result<Vec<CollectSummary>> {
    let collector = Collector::new(source, ws.config.scraper.base_url.as_str());
    let mut summaries = Vec::with_capacity(groups.len());

    for &group in groups {
        let tables = collector.collect(seasons, group).await;

        let mut summary = CollectSummary {
            group,
            seasons_requested: seasons.to_vec(),
            seasons_collected: tables.iter().map(|t| t.season).collect(),
            raw_rows: 0,
            rejected_rows: 0,
            rows_with_missing_categories: 0,
            warnings: 0,
            duplicates_removed: 0,
            integrity_errors: 0,
            position_conflicts: 0,
            records: 0,
            csv_path: None,
            backup: None,
        };

        let mut records = Vec::new();
        for table in &tables {
            let report = normalize_table(&table.rows, table.season, table.group);
            summary.raw_rows += table.rows.len();
            summary.rejected_rows += report.rejected;
            summary.rows_with_missing_categories += report.rows_with_missing_categories;
            summary.warnings += report.warnings.len();
            records.extend(report.records);
        }

        if records.is_empty() {
            warn!("no {group} records collected for seasons {seasons:?}");
            summaries.push(summary);
            continue;
        }

        let resolved = resolve_table(records).context("duplicate resolution failed")?;
        summary.warnings += resolved.warnings.len();
        summary.duplicates_removed = resolved.duplicates_removed;
        summary.integrity_errors = resolved.integrity_errors.len();
        summary.position_conflicts = resolved.position_conflicts;
        summary.records = resolved.records.len();

        let path = ws
            .data_dir()
            .join(csv_store::records_file_name(group, &summary.seasons_collected));
        summary.backup = csv_store::write_records(&path, &resolved.records, group)
            .with_context(|| format!("failed to write {}", path.display()))?;
        summary.csv_path = Some(path);

        db.save_records(&resolved.records)
            .context("failed to store collected records")?;
        info!("collected {} {group} player-seasons", summary.records);
        summaries.push(summary);
    }

    Ok(summaries)
}

// ---------------------------------------------------------------------------
// clean
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CleanSummary {
    pub rows_read: usize,
    pub rejected_rows: usize,
    pub rows_with_missing_categories: usize,
    pub resolve: ResolveReport,
    pub output: PathBuf,
    pub backup: Option<PathBuf>,
}

/// Re-clean a stored CSV: normalize every row again, drop traded-player
/// duplicates and write the result (backing up whatever it replaces).
pub fn clean(input: &Path, output: &Path, group: PositionGroup) -> Result<CleanSummary> {
    let normalized = csv_store::read_records(input, group)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let rows_read = normalized.records.len() + normalized.rejected + normalized.skipped;
    let rows_with_missing_categories = normalized.rows_with_missing_categories;
    if normalized.records.is_empty() {
        bail!("{} has no usable {group} rows", input.display());
    }

    let resolve = resolve_table(normalized.records).context("duplicate resolution failed")?;
    let backup = csv_store::write_records(output, &resolve.records, group)
        .with_context(|| format!("failed to write {}", output.display()))?;

    Ok(CleanSummary {
        rows_read,
        rejected_rows: normalized.rejected,
        rows_with_missing_categories,
        resolve,
        output: output.to_path_buf(),
        backup,
    })
}

// ---------------------------------------------------------------------------
// rank / compare
// ---------------------------------------------------------------------------

/// The scoring config a run uses.
pub fn scoring_for(ws: &Workspace, group: PositionGroup, equal_weights: bool) -> ScoringConfig {
    let config = ws.config.scoring.for_group(group);
    if equal_weights {
        config.equal_weighted()
    } else {
        config.clone()
    }
}

/// Records to rank: from a CSV when given, otherwise from the database,
/// filtered to one season and group and the config's games floor.
pub fn load_population(
    db: &Database,
    input: Option<&Path>,
    season: u16,
    group: PositionGroup,
    config: &ScoringConfig,
) -> Result<Vec<PlayerSeasonRecord>> {
    let records = match input {
        Some(path) => {
            let normalized = csv_store::read_records(path, group)
                .with_context(|| format!("failed to read {}", path.display()))?;
            if normalized.records.is_empty() {
                Vec::new()
            } else {
                resolve_table(normalized.records)
                    .context("duplicate resolution failed")?
                    .records
            }
        }
        None => db
            .load_records(group, Some(season))
            .context("failed to load records from database")?,
    };

    let pool = population(&records, season, group, config);
    if pool.is_empty() {
        bail!("no {group} records for season {season}; run `puckrank collect` first");
    }
    info!("ranking population: {} {group} for {season}", pool.len());
    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct RankSummary {
    pub season: u16,
    pub group: PositionGroup,
    pub outcome: RankingOutcome,
    pub output: PathBuf,
    pub run_id: i64,
}

pub struct RankRequest<'a> {
    pub season: u16,
    pub group: PositionGroup,
    pub strategy: Strategy,
    pub input: Option<&'a Path>,
    pub output: Option<&'a Path>,
    pub equal_weights: bool,
}

/// Rank one season, write the ranking CSV and record the run.
pub fn rank(ws: &Workspace, db: &Database, request: &RankRequest<'_>) -> Result<RankSummary> {
    let config = scoring_for(ws, request.group, request.equal_weights);
    let pool = load_population(db, request.input, request.season, request.group, &config)?;

    let outcome = request
        .strategy
        .rank(&pool, &config)
        .with_context(|| format!("{} ranking failed", request.strategy))?;
    for excluded in &outcome.excluded {
        warn!("excluded from ranking: {excluded}");
    }

    let strategy_name = request.strategy.to_string();
    let output = match request.output {
        Some(path) => path.to_path_buf(),
        None => ws
            .data_dir()
            .join(csv_store::ranking_file_name(request.group, request.season, &strategy_name)),
    };
    csv_store::write_rankings(&output, &outcome.entries)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let run_id = db
        .save_ranking_run(request.season, request.group, &strategy_name, &config, &outcome.entries)
        .context("failed to record ranking run")?;

    Ok(RankSummary {
        season: request.season,
        group: request.group,
        outcome,
        output,
        run_id,
    })
}

/// Rank one season with every strategy and tabulate the top players.
pub fn compare_all(
    ws: &Workspace,
    db: &Database,
    season: u16,
    group: PositionGroup,
    input: Option<&Path>,
    equal_weights: bool,
    top: usize,
) -> Result<Comparison> {
    let config = scoring_for(ws, group, equal_weights);
    let pool = load_population(db, input, season, group, &config)?;
    compare(&pool, &config, &Strategy::all(), top).context("strategy comparison failed")
}

// ---------------------------------------------------------------------------
// leaders
// ---------------------------------------------------------------------------

pub struct LeadersRequest<'a> {
    pub season: u16,
    pub group: PositionGroup,
    /// Empty means every category the group's scoring config lists.
    pub categories: Vec<StatCategory>,
    pub position: Option<Position>,
    pub min_games: Option<f64>,
    pub top: usize,
    pub input: Option<&'a Path>,
}

/// One leaderboard per requested category.
pub fn leaders(ws: &Workspace, db: &Database, request: &LeadersRequest<'_>) -> Result<Vec<CategoryLeaders>> {
    let config = scoring_for(ws, request.group, false);
    let pool = load_population(db, request.input, request.season, request.group, &config)?;

    let categories = if request.categories.is_empty() {
        config.categories.iter().map(|c| c.category).collect()
    } else {
        request.categories.clone()
    };

    categories
        .into_iter()
        .map(|category| {
            let mut query = LeaderQuery::new(category, &config, request.top);
            query.position = request.position;
            if let Some(min_games) = request.min_games {
                query.min_games = min_games;
            }
            category_leaders(&pool, request.group, &query)
                .with_context(|| format!("cannot list {category} leaders"))
        })
        .collect()
}
