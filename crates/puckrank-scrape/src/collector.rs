// Per-season collection of league stat tables.

use thiserror::Error;
use tracing::{error, info};

use puckrank_core::normalize::RawRow;
use puckrank_core::record::PositionGroup;

use crate::source::{FetchError, PageSource};
use crate::table::extract_rows;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("table '{table_id}' not found at {url}")]
    TableNotFound { table_id: &'static str, url: String },
}

/// The raw rows of one season's table for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub season: u16,
    pub group: PositionGroup,
    pub rows: Vec<RawRow>,
}

/// Page name segment for a group (`NHL_2024_skaters.html`).
pub fn page_suffix(group: PositionGroup) -> &'static str {
    match group {
        PositionGroup::Skaters => "skaters",
        PositionGroup::Goalies => "goalies",
    }
}

/// `id` of the stats table on a group's page.
pub fn table_id(group: PositionGroup) -> &'static str {
    match group {
        PositionGroup::Skaters => "player_stats",
        PositionGroup::Goalies => "goalie_stats",
    }
}

pub struct Collector<S> {
    source: S,
    base_url: String,
}

impl<S: PageSource> Collector<S> {
    pub fn new(source: S, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            source,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// League page URL; `season` is the year the season ended.
    pub fn url_for(&self, season: u16, group: PositionGroup) -> String {
        format!("{}/leagues/NHL_{season}_{}.html", self.base_url, page_suffix(group))
    }

    /// Fetch and extract one season's table.
    pub async fn collect_season(&self, season: u16, group: PositionGroup) -> Result<RawTable, ScrapeError> {
        let url = self.url_for(season, group);
        info!("collecting {group} for {season} from {url}");

        let html = self.source.fetch(&url).await?;
        let table_id = table_id(group);
        let rows = extract_rows(&html, table_id).ok_or(ScrapeError::TableNotFound { table_id, url })?;

        info!("extracted {} {group} rows for {season}", rows.len());
        Ok(RawTable { season, group, rows })
    }

    /// Collect every season in order. A season that fails is logged and
    /// left out; the rest still come back.
    pub async fn collect(&self, seasons: &[u16], group: PositionGroup) -> Vec<RawTable> {
        let mut tables = Vec::with_capacity(seasons.len());
        for &season in seasons {
            match self.collect_season(season, group).await {
                Ok(table) => tables.push(table),
                Err(e) => error!("skipping {group} {season}: {e}"),
            }
        }
        tables
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
