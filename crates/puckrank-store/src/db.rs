// SQLite persistence for player-seasons, their stats and ranking runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};
use tracing::{info, warn};

use puckrank_core::ranking::ScoringConfig;
use puckrank_core::record::{
    CategoryContribution, PlayerSeasonRecord, Position, PositionGroup, RankingEntry, StatCategory,
    TeamMarker,
};

/// A stored ranking run with its entries, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingRun {
    pub id: i64,
    pub season: u16,
    pub group: PositionGroup,
    pub strategy: String,
    pub created_at: String,
    pub entries: Vec<RankingEntry>,
}

/// SQLite-backed store. Stats are kept in long format, one row per
/// (player, season, stat), so new categories need no schema change.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure all tables exist.
    /// Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                player_key TEXT NOT NULL UNIQUE,
                name       TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS player_seasons (
                player_id      INTEGER NOT NULL REFERENCES players(id),
                season         INTEGER NOT NULL,
                team           TEXT NOT NULL,
                position       TEXT NOT NULL,
                position_group TEXT NOT NULL,
                age            INTEGER,
                PRIMARY KEY (player_id, season)
            );

            CREATE TABLE IF NOT EXISTS season_stats (
                player_id INTEGER NOT NULL,
                season    INTEGER NOT NULL,
                stat_name TEXT NOT NULL,
                value     REAL NOT NULL,
                PRIMARY KEY (player_id, season, stat_name),
                FOREIGN KEY (player_id, season) REFERENCES player_seasons(player_id, season)
            );

            CREATE TABLE IF NOT EXISTS ranking_runs (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                season         INTEGER NOT NULL,
                position_group TEXT NOT NULL,
                strategy       TEXT NOT NULL,
                config         TEXT NOT NULL,
                created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS ranking_entries (
                run_id        INTEGER NOT NULL REFERENCES ranking_runs(id),
                rank          INTEGER NOT NULL,
                player_key    TEXT NOT NULL,
                name          TEXT NOT NULL,
                position      TEXT NOT NULL,
                team          TEXT NOT NULL,
                games_played  REAL NOT NULL,
                score         REAL NOT NULL,
                contributions TEXT NOT NULL,
                PRIMARY KEY (run_id, rank)
            );

            CREATE INDEX IF NOT EXISTS idx_player_seasons_group
                ON player_seasons(position_group, season);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Insert a player or refresh their display name. Returns the row id.
    pub fn upsert_player(&self, name: &str, player_key: &str) -> Result<i64> {
        let conn = self.conn();
        upsert_player_on(&conn, name, player_key)
    }

    /// Store records, replacing any existing row and stats for the same
    /// player-season. Runs in one transaction.
    pub fn save_records(&self, records: &[PlayerSeasonRecord]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin save transaction")?;

        for record in records {
            let player_id = upsert_player_on(&tx, &record.name, &record.player_key)?;

            tx.execute(
                "DELETE FROM season_stats WHERE player_id = ?1 AND season = ?2",
                params![player_id, record.season],
            )
            .context("failed to clear previous season stats")?;

            tx.execute(
                "INSERT INTO player_seasons (player_id, season, team, position, position_group, age)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(player_id, season) DO UPDATE SET
                    team           = excluded.team,
                    position       = excluded.position,
                    position_group = excluded.position_group,
                    age            = excluded.age",
                params![
                    player_id,
                    record.season,
                    record.team.to_string(),
                    record.position.display_str(),
                    record.group().display_str(),
                    record.age,
                ],
            )
            .context("failed to upsert player season")?;

            for (category, value) in &record.stats {
                tx.execute(
                    "INSERT INTO season_stats (player_id, season, stat_name, value)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![player_id, record.season, category.key(), value],
                )
                .context("failed to insert season stat")?;
            }
        }

        tx.commit().context("failed to commit saved records")?;
        info!("saved {} player-season records", records.len());
        Ok(records.len())
    }

    /// Load the records of one group, optionally limited to one season.
    /// Ordered by season, then player key.
    pub fn load_records(&self, group: PositionGroup, season: Option<u16>) -> Result<Vec<PlayerSeasonRecord>> {
        let conn = self.conn();

        let mut stmt = conn
            .prepare(
                "SELECT ps.player_id, ps.season, p.name, ps.team, ps.position, ps.age
                 FROM player_seasons ps JOIN players p ON p.id = ps.player_id
                 WHERE ps.position_group = ?1 AND (?2 IS NULL OR ps.season = ?2)
                 ORDER BY ps.season, p.player_key",
            )
            .context("failed to prepare load_records query")?;

        let rows = stmt
            .query_map(params![group.display_str(), season], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, u16>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<u32>>(5)?,
                ))
            })
            .context("failed to query player seasons")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player season rows")?;

        let mut stats_stmt = conn
            .prepare(
                "SELECT s.player_id, s.season, s.stat_name, s.value
                 FROM season_stats s
                 JOIN player_seasons ps ON ps.player_id = s.player_id AND ps.season = s.season
                 WHERE ps.position_group = ?1 AND (?2 IS NULL OR ps.season = ?2)",
            )
            .context("failed to prepare season_stats query")?;

        let mut stats: HashMap<(i64, u16), BTreeMap<StatCategory, f64>> = HashMap::new();
        let stat_rows = stats_stmt
            .query_map(params![group.display_str(), season], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, u16>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })
            .context("failed to query season stats")?;
        for stat_row in stat_rows {
            let (player_id, row_season, stat_name, value) =
                stat_row.context("failed to read season stat row")?;
            match StatCategory::from_key(&stat_name) {
                Some(category) => {
                    stats.entry((player_id, row_season)).or_default().insert(category, value);
                }
                None => warn!("ignoring unknown stat '{stat_name}' in database"),
            }
        }

        let mut records = Vec::with_capacity(rows.len());
        for (player_id, row_season, name, team, position, age) in rows {
            let team = TeamMarker::parse(&team)
                .ok_or_else(|| anyhow!("stored team for {name} ({row_season}) is blank"))?;
            let position = Position::from_str_pos(&position)
                .ok_or_else(|| anyhow!("stored position '{position}' for {name} is unknown"))?;
            let mut record = PlayerSeasonRecord::new(&name, row_season, team, position);
            record.age = age;
            record.stats = stats.remove(&(player_id, row_season)).unwrap_or_default();
            records.push(record);
        }
        Ok(records)
    }

    /// Seasons stored for a group, ascending.
    pub fn list_seasons(&self, group: PositionGroup) -> Result<Vec<u16>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT season FROM player_seasons
                 WHERE position_group = ?1 ORDER BY season",
            )
            .context("failed to prepare list_seasons query")?;
        let seasons = stmt
            .query_map(params![group.display_str()], |row| row.get(0))
            .context("failed to query seasons")?
            .collect::<std::result::Result<Vec<u16>, _>>()
            .context("failed to map season rows")?;
        Ok(seasons)
    }

    /// Record a ranking run and its entries. Returns the run id.
    pub fn save_ranking_run(
        &self,
        season: u16,
        group: PositionGroup,
        strategy: &str,
        config: &ScoringConfig,
        entries: &[RankingEntry],
    ) -> Result<i64> {
        let config_json = serde_json::to_string(config).context("failed to serialize scoring config")?;

        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin ranking transaction")?;
        let run_id: i64 = tx
            .query_row(
                "INSERT INTO ranking_runs (season, position_group, strategy, config)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id",
                params![season, group.display_str(), strategy, config_json],
                |row| row.get(0),
            )
            .context("failed to insert ranking run")?;

        for entry in entries {
            let contributions =
                serde_json::to_string(&entry.contributions).context("failed to serialize contributions")?;
            tx.execute(
                "INSERT INTO ranking_entries
                    (run_id, rank, player_key, name, position, team, games_played, score, contributions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    run_id,
                    entry.rank as i64,
                    entry.player_key,
                    entry.name,
                    entry.position.display_str(),
                    entry.team.to_string(),
                    entry.games_played,
                    entry.score,
                    contributions,
                ],
            )
            .context("failed to insert ranking entry")?;
        }

        tx.commit().context("failed to commit ranking run")?;
        info!("saved ranking run {run_id} ({strategy}, {} entries)", entries.len());
        Ok(run_id)
    }

    /// Load a ranking run by id. Returns `None` if it does not exist.
    pub fn load_ranking_run(&self, run_id: i64) -> Result<Option<RankingRun>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT season, position_group, strategy, created_at
                 FROM ranking_runs WHERE id = ?1",
            )
            .context("failed to prepare load_ranking_run query")?;
        let mut rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, u16>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .context("failed to query ranking run")?;

        let Some(head) = rows.next() else {
            return Ok(None);
        };
        let (season, group, strategy, created_at) = head.context("failed to read ranking run row")?;
        let group = PositionGroup::from_str_group(&group)
            .ok_or_else(|| anyhow!("ranking run {run_id} has unknown group '{group}'"))?;

        let mut entry_stmt = conn
            .prepare(
                "SELECT rank, player_key, name, position, team, games_played, score, contributions
                 FROM ranking_entries WHERE run_id = ?1 ORDER BY rank",
            )
            .context("failed to prepare ranking_entries query")?;
        let raw_entries = entry_stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })
            .context("failed to query ranking entries")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map ranking entry rows")?;

        let mut entries = Vec::with_capacity(raw_entries.len());
        for (rank, player_key, name, position, team, games_played, score, contributions) in raw_entries {
            let contributions: Vec<CategoryContribution> =
                serde_json::from_str(&contributions).context("failed to deserialize contributions")?;
            entries.push(RankingEntry {
                position: Position::from_str_pos(&position)
                    .ok_or_else(|| anyhow!("stored position '{position}' for {name} is unknown"))?,
                team: TeamMarker::parse(&team)
                    .ok_or_else(|| anyhow!("stored team for {name} is blank"))?,
                name,
                player_key,
                season,
                games_played,
                score,
                rank: usize::try_from(rank).context("stored rank is negative")?,
                contributions,
            });
        }

        Ok(Some(RankingRun {
            id: run_id,
            season,
            group,
            strategy,
            created_at,
            entries,
        }))
    }

    /// Id of the most recent run for a season, group and strategy.
    pub fn latest_ranking_run_id(
        &self,
        season: u16,
        group: PositionGroup,
        strategy: &str,
    ) -> Result<Option<i64>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id FROM ranking_runs
                 WHERE season = ?1 AND position_group = ?2 AND strategy = ?3
                 ORDER BY id DESC LIMIT 1",
            )
            .context("failed to prepare latest run query")?;
        let mut rows = stmt
            .query_map(params![season, group.display_str(), strategy], |row| row.get(0))
            .context("failed to query latest run")?;
        let id = match rows.next() {
            Some(id) => Some(id.context("failed to read run id")?),
            None => None,
        };
        Ok(id)
    }
}

fn upsert_player_on(conn: &Connection, name: &str, player_key: &str) -> Result<i64> {
    let id: i64 = conn
        .query_row(
            "INSERT INTO players (player_key, name)
             VALUES (?1, ?2)
             ON CONFLICT(player_key) DO UPDATE SET name = excluded.name
             RETURNING id",
            params![player_key, name],
            |row| row.get(0),
        )
        .context("failed to upsert player")?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use puckrank_core::ranking::{ScoreMethod, Strategy};

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn skater(name: &str, season: u16, team: &str, gp: f64, goals: f64) -> PlayerSeasonRecord {
        PlayerSeasonRecord::new(name, season, TeamMarker::parse(team).unwrap(), Position::C)
            .with_stat(StatCategory::GamesPlayed, gp)
            .with_stat(StatCategory::Goals, goals)
    }

    fn goalie(name: &str, season: u16) -> PlayerSeasonRecord {
        PlayerSeasonRecord::new(name, season, TeamMarker::Team("WPG".into()), Position::G)
            .with_stat(StatCategory::GamesPlayed, 60.0)
            .with_stat(StatCategory::SavePercentage, 0.921)
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in ["players", "player_seasons", "season_stats", "ranking_runs", "ranking_entries"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn upsert_player_returns_same_id_for_same_key() {
        let db = test_db();
        let a = db.upsert_player("Bo Horvat", "bo horvat").unwrap();
        let b = db.upsert_player("Bo Horvat", "bo horvat").unwrap();
        let c = db.upsert_player("Quinn Hughes", "quinn hughes").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn save_and_load_records_round_trip() {
        let db = test_db();
        let mut horvat = skater("Bo Horvat", 2023, "2TM", 79.0, 38.0);
        horvat.age = Some(27);
        let records = vec![horvat.clone(), skater("Quinn Hughes", 2023, "VAN", 82.0, 7.0)];
        assert_eq!(db.save_records(&records).unwrap(), 2);

        let loaded = db.load_records(PositionGroup::Skaters, Some(2023)).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], horvat);
        assert_eq!(loaded[1].name, "Quinn Hughes");
    }

    #[test]
    fn saving_again_replaces_the_player_season() {
        let db = test_db();
        let first = skater("Bo Horvat", 2023, "VAN", 49.0, 25.0).with_stat(StatCategory::Hits, 20.0);
        db.save_records(&[first]).unwrap();
        db.save_records(&[skater("Bo Horvat", 2023, "2TM", 79.0, 38.0)]).unwrap();

        let loaded = db.load_records(PositionGroup::Skaters, None).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].is_combined());
        assert_eq!(loaded[0].games_played(), 79.0);
        assert_eq!(loaded[0].get(StatCategory::Hits), None);
    }

    #[test]
    fn load_filters_by_group_and_season() {
        let db = test_db();
        db.save_records(&[
            skater("A", 2023, "TOR", 10.0, 1.0),
            skater("A", 2024, "TOR", 10.0, 2.0),
            goalie("G", 2024),
        ])
        .unwrap();

        assert_eq!(db.load_records(PositionGroup::Skaters, None).unwrap().len(), 2);
        let only_2024 = db.load_records(PositionGroup::Skaters, Some(2024)).unwrap();
        assert_eq!(only_2024.len(), 1);
        assert_eq!(only_2024[0].get(StatCategory::Goals), Some(2.0));
        let goalies = db.load_records(PositionGroup::Goalies, Some(2024)).unwrap();
        assert_eq!(goalies.len(), 1);
        assert_eq!(goalies[0].get(StatCategory::SavePercentage), Some(0.921));
    }

    #[test]
    fn list_seasons_is_sorted_per_group() {
        let db = test_db();
        db.save_records(&[
            skater("A", 2025, "TOR", 10.0, 1.0),
            skater("B", 2023, "TOR", 10.0, 1.0),
            goalie("G", 2024),
        ])
        .unwrap();
        assert_eq!(db.list_seasons(PositionGroup::Skaters).unwrap(), vec![2023, 2025]);
        assert_eq!(db.list_seasons(PositionGroup::Goalies).unwrap(), vec![2024]);
    }

    #[test]
    fn ranking_run_round_trip() {
        let db = test_db();
        let records = vec![
            skater("A", 2024, "TOR", 80.0, 40.0),
            skater("B", 2024, "MTL", 70.0, 20.0),
        ];
        let mut config = ScoringConfig::default_for(PositionGroup::Skaters);
        config.categories.retain(|c| c.category == StatCategory::Goals);
        let strategy = Strategy::Base(ScoreMethod::ZScore);
        let outcome = strategy.rank(&records, &config).unwrap();

        let run_id = db
            .save_ranking_run(2024, PositionGroup::Skaters, &strategy.to_string(), &config, &outcome.entries)
            .unwrap();
        let run = db.load_ranking_run(run_id).unwrap().expect("run should exist");
        assert_eq!(run.season, 2024);
        assert_eq!(run.group, PositionGroup::Skaters);
        assert_eq!(run.strategy, "z-score");
        assert_eq!(run.entries.len(), 2);
        for (stored, ranked) in run.entries.iter().zip(&outcome.entries) {
            assert_eq!(stored.rank, ranked.rank);
            assert_eq!(stored.player_key, ranked.player_key);
            assert_eq!(stored.team, ranked.team);
            assert_eq!(stored.score, ranked.score);
            assert_eq!(stored.contributions.len(), 1);
            assert_eq!(stored.contributions[0].category, StatCategory::Goals);
            assert_eq!(stored.contributions[0].raw, ranked.contributions[0].raw);
        }

        assert_eq!(
            db.latest_ranking_run_id(2024, PositionGroup::Skaters, "z-score").unwrap(),
            Some(run_id)
        );
    }

    #[test]
    fn missing_ranking_run_is_none() {
        let db = test_db();
        assert!(db.load_ranking_run(42).unwrap().is_none());
        assert!(db
            .latest_ranking_run_id(2024, PositionGroup::Goalies, "percentile")
            .unwrap()
            .is_none());
    }

    #[test]
    fn foreign_keys_enforced() {
        let db = test_db();
        let conn = db.conn();
        let result = conn.execute(
            "INSERT INTO season_stats (player_id, season, stat_name, value) VALUES (999, 2024, 'goals', 1.0)",
            [],
        );
        assert!(result.is_err());
    }
}
