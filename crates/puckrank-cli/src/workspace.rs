// The directory a run works in: config, data files, database and logs.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use tracing::info;

use puckrank_core::config::{load_config_in, Config};
use puckrank_store::Database;

/// Shipped defaults, written into a fresh per-user directory.
const BUNDLED_DEFAULTS: &[(&str, &str)] = &[
    ("collector.toml", include_str!("../../../defaults/collector.toml")),
    ("scoring.toml", include_str!("../../../defaults/scoring.toml")),
];

/// Pick the base directory: explicit flag, then the current directory if it
/// looks like a puckrank checkout, then the per-user data directory.
pub fn resolve_base_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    if cwd.join("defaults").is_dir() || cwd.join("config").is_dir() {
        return Ok(cwd);
    }
    let dirs = ProjectDirs::from("", "", "puckrank")
        .ok_or_else(|| anyhow!("no home directory found; pass --base-dir"))?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Write the bundled defaults into `base_dir/defaults` when there is neither
/// a defaults/ nor a config/ directory yet. Returns the files written.
pub fn seed_defaults(base_dir: &Path) -> Result<Vec<PathBuf>> {
    let defaults_dir = base_dir.join("defaults");
    if defaults_dir.exists() || base_dir.join("config").exists() {
        return Ok(vec![]);
    }
    std::fs::create_dir_all(&defaults_dir)
        .with_context(|| format!("failed to create {}", defaults_dir.display()))?;

    let mut written = Vec::new();
    for (name, contents) in BUNDLED_DEFAULTS {
        let path = defaults_dir.join(name);
        std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    info!("seeded defaults in {}", defaults_dir.display());
    Ok(written)
}

pub struct Workspace {
    pub base_dir: PathBuf,
    pub config: Config,
}

impl Workspace {
    /// Seed and copy defaults as needed, then load and validate config.
    pub fn load(base_dir: &Path) -> Result<Self> {
        seed_defaults(base_dir)?;
        let config = load_config_in(base_dir).context("failed to load configuration")?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            config,
        })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.config.storage.data_dir)
    }

    pub fn db_path(&self) -> PathBuf {
        self.resolve(&self.config.storage.db_path)
    }

    pub fn open_db(&self) -> Result<Database> {
        let path = self.db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("database path {} is not valid UTF-8", path.display()))?;
        Database::open(path_str).context("failed to open database")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
