// Configuration loading and parsing (collector.toml, scoring.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::ranking::ScoringConfig;
use crate::record::PositionGroup;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub collection: CollectionConfig,
    pub storage: StorageConfig,
    pub scoring: ScoringConfigs,
}

// ---------------------------------------------------------------------------
// collector.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for collector.toml.
#[derive(Debug, Clone, Deserialize)]
struct CollectorFile {
    scraper: ScraperConfig,
    collection: CollectionConfig,
    storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    pub base_url: String,
    /// Pause before every request.
    pub rate_limit_delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl ScraperConfig {
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    /// Season end years (2024 is the 2023-24 season).
    pub seasons: Vec<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// scoring.toml structs
// ---------------------------------------------------------------------------

/// One scoring config per position group.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfigs {
    pub skaters: ScoringConfig,
    pub goalies: ScoringConfig,
}

impl ScoringConfigs {
    pub fn for_group(&self, group: PositionGroup) -> &ScoringConfig {
        match group {
            PositionGroup::Skaters => &self.skaters,
            PositionGroup::Goalies => &self.goalies,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Longest pause between requests the collector accepts.
pub const MAX_RATE_LIMIT_DELAY_MS: u64 = 60_000;

/// Seasons the collector accepts (first NHL season through a sane horizon).
pub const SEASON_RANGE: std::ops::RangeInclusive<u16> = 1918..=2100;

/// Load and validate `config/collector.toml` and `config/scoring.toml`
/// relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let collector_path = config_dir.join("collector.toml");
    let collector_text = read_file(&collector_path)?;
    let collector: CollectorFile =
        toml::from_str(&collector_text).map_err(|e| ConfigError::ParseError {
            path: collector_path.clone(),
            source: e,
        })?;

    let scoring_path = config_dir.join("scoring.toml");
    let scoring_text = read_file(&scoring_path)?;
    let scoring: ScoringConfigs =
        toml::from_str(&scoring_text).map_err(|e| ConfigError::ParseError {
            path: scoring_path.clone(),
            source: e,
        })?;

    let config = Config {
        scraper: collector.scraper,
        collection: collector.collection,
        storage: collector.storage,
        scoring,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy any config file missing from `config/` out of `defaults/`.
/// Returns the files copied. `.example` templates are skipped.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Copy defaults into `base_dir/config` if needed, then load.
pub fn load_config_in(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

/// `load_config_in` for the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_config_in(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let scraper = &config.scraper;
    if !(scraper.base_url.starts_with("http://") || scraper.base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "scraper.base_url".into(),
            message: format!("must be an http(s) URL, got '{}'", scraper.base_url),
        });
    }
    if scraper.rate_limit_delay_ms > MAX_RATE_LIMIT_DELAY_MS {
        return Err(ConfigError::ValidationError {
            field: "scraper.rate_limit_delay_ms".into(),
            message: format!(
                "must be at most {MAX_RATE_LIMIT_DELAY_MS}, got {}",
                scraper.rate_limit_delay_ms
            ),
        });
    }
    if scraper.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "scraper.timeout_secs".into(),
            message: "must be > 0".into(),
        });
    }

    let seasons = &config.collection.seasons;
    if seasons.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "collection.seasons".into(),
            message: "must list at least one season".into(),
        });
    }
    if let Some(bad) = seasons.iter().find(|s| !SEASON_RANGE.contains(*s)) {
        return Err(ConfigError::ValidationError {
            field: "collection.seasons".into(),
            message: format!(
                "season {bad} outside {}..={}",
                SEASON_RANGE.start(),
                SEASON_RANGE.end()
            ),
        });
    }

    let storage_fields: &[(&str, &str)] = &[
        ("storage.data_dir", config.storage.data_dir.as_str()),
        ("storage.db_path", config.storage.db_path.as_str()),
    ];
    for (name, val) in storage_fields {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    for group in [PositionGroup::Skaters, PositionGroup::Goalies] {
        config
            .scoring
            .for_group(group)
            .validate(group)
            .map_err(|e| ConfigError::ValidationError {
                field: format!("scoring.{group}"),
                message: e.to_string(),
            })?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
