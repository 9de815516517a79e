// Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use puckrank_core::ranking::{ScoreMethod, Strategy};
use puckrank_core::record::{Position, PositionGroup, StatCategory};

#[derive(Debug, Parser)]
#[command(name = "puckrank")]
#[command(about = "Collect NHL season stats and rank players for fantasy hockey", version)]
pub struct Cli {
    /// Directory holding defaults/, config/, data/ and logs/. Defaults to the
    /// current directory when it has defaults/ or config/, otherwise the
    /// per-user data directory.
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scrape seasons from Hockey-Reference, clean them and store them
    Collect {
        /// Season end years, comma separated (defaults to config)
        #[arg(long, value_delimiter = ',')]
        seasons: Vec<u16>,

        #[arg(long, value_enum, default_value_t = GroupSelection::All)]
        group: GroupSelection,
    },
    /// Re-run normalization and duplicate resolution over a stored CSV
    Clean {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, value_enum)]
        group: GroupArg,

        /// Where to write the cleaned table (defaults to overwriting the input)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Rank one season with one strategy
    Rank(RankArgs),
    /// Rank one season with every strategy and compare the results
    Compare {
        #[arg(long)]
        season: u16,

        #[arg(long, value_enum)]
        group: GroupArg,

        /// Players taken from each strategy's top list
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Read records from this CSV instead of the database
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long)]
        equal_weights: bool,
    },
    /// List the top players in single categories
    Leaders(LeadersArgs),
}

#[derive(Debug, Args)]
pub struct LeadersArgs {
    #[arg(long)]
    pub season: u16,

    #[arg(long, value_enum)]
    pub group: GroupArg,

    /// Categories to list, comma separated (defaults to the scored ones)
    #[arg(long, value_delimiter = ',', value_parser = parse_category)]
    pub category: Vec<StatCategory>,

    /// Only players at this position (C, LW, RW, D or G)
    #[arg(long, value_parser = parse_position)]
    pub position: Option<Position>,

    /// Games floor (defaults to 0 for counting stats, 20 for rate stats)
    #[arg(long)]
    pub min_games: Option<f64>,

    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Read records from this CSV instead of the database
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RankArgs {
    #[arg(long)]
    pub season: u16,

    #[arg(long, value_enum)]
    pub group: GroupArg,

    /// raw-sum, weighted, percentile, z-score, normalized, rank-sum,
    /// position-adjusted or efficiency (optionally `name:base`)
    #[arg(long, default_value = "percentile", value_parser = parse_strategy_name)]
    pub strategy: String,

    /// Base method for position-adjusted and efficiency
    #[arg(long, value_parser = parse_method)]
    pub base: Option<ScoreMethod>,

    /// Read records from this CSV instead of the database
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Ranking CSV to write (defaults to the data directory)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Rows printed to the terminal
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    /// Ignore configured weights and multipliers
    #[arg(long)]
    pub equal_weights: bool,
}

impl RankArgs {
    pub fn strategy(&self) -> Option<Strategy> {
        Strategy::parse(&self.strategy, self.base)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupArg {
    Skaters,
    Goalies,
}

impl From<GroupArg> for PositionGroup {
    fn from(arg: GroupArg) -> Self {
        match arg {
            GroupArg::Skaters => PositionGroup::Skaters,
            GroupArg::Goalies => PositionGroup::Goalies,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupSelection {
    Skaters,
    Goalies,
    All,
}

impl GroupSelection {
    pub fn groups(self) -> Vec<PositionGroup> {
        match self {
            GroupSelection::Skaters => vec![PositionGroup::Skaters],
            GroupSelection::Goalies => vec![PositionGroup::Goalies],
            GroupSelection::All => vec![PositionGroup::Skaters, PositionGroup::Goalies],
        }
    }
}

fn parse_strategy_name(s: &str) -> Result<String, String> {
    Strategy::parse(s, None)
        .map(|_| s.to_string())
        .ok_or_else(|| format!("unknown strategy '{s}'"))
}

fn parse_category(s: &str) -> Result<StatCategory, String> {
    StatCategory::from_key(s).ok_or_else(|| format!("unknown category '{s}'"))
}

fn parse_position(s: &str) -> Result<Position, String> {
    Position::from_str_pos(s).ok_or_else(|| format!("unknown position '{s}'"))
}

fn parse_method(s: &str) -> Result<ScoreMethod, String> {
    ScoreMethod::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = ScoreMethod::ALL.iter().map(|m| m.name()).collect();
        format!("unknown method '{s}' (expected one of {})", names.join(", "))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rank_with_base() {
        let cli = Cli::try_parse_from([
            "puckrank", "rank", "--season", "2024", "--group", "skaters", "--strategy",
            "efficiency", "--base", "z-score",
        ])
        .unwrap();
        let Commands::Rank(args) = cli.command else {
            panic!("expected rank");
        };
        assert_eq!(args.season, 2024);
        assert_eq!(args.group, GroupArg::Skaters);
        assert_eq!(args.strategy(), Some(Strategy::Efficiency(ScoreMethod::ZScore)));
        assert_eq!(args.top, 20);
    }

    #[test]
    fn rank_defaults_to_percentile() {
        let cli = Cli::try_parse_from(["puckrank", "rank", "--season", "2025", "--group", "goalies"]).unwrap();
        let Commands::Rank(args) = cli.command else {
            panic!("expected rank");
        };
        assert_eq!(args.strategy(), Some(Strategy::Base(ScoreMethod::Percentile)));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result = Cli::try_parse_from([
            "puckrank", "rank", "--season", "2024", "--group", "skaters", "--strategy", "vibes",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn collect_takes_comma_separated_seasons() {
        let cli = Cli::try_parse_from(["puckrank", "collect", "--seasons", "2023,2024"]).unwrap();
        match cli.command {
            Commands::Collect { seasons, group } => {
                assert_eq!(seasons, vec![2023, 2024]);
                assert_eq!(group.groups().len(), 2);
            }
            other => panic!("expected collect, got {other:?}"),
        }
    }

    #[test]
    fn leaders_takes_categories_and_position() {
        let cli = Cli::try_parse_from([
            "puckrank", "leaders", "--season", "2024", "--group", "goalies", "--category",
            "save_percentage,goals_against_average", "--position", "g", "--min-games", "25",
        ])
        .unwrap();
        let Commands::Leaders(args) = cli.command else {
            panic!("expected leaders");
        };
        assert_eq!(
            args.category,
            vec![StatCategory::SavePercentage, StatCategory::GoalsAgainstAverage]
        );
        assert_eq!(args.position, Some(Position::G));
        assert_eq!(args.min_games, Some(25.0));
        assert_eq!(args.top, 10);
    }

    #[test]
    fn leaders_rejects_unknown_category() {
        let result = Cli::try_parse_from([
            "puckrank", "leaders", "--season", "2024", "--group", "skaters", "--category", "vibes",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn base_dir_is_global() {
        let cli = Cli::try_parse_from([
            "puckrank", "compare", "--season", "2024", "--group", "goalies", "--base-dir", "/tmp/pr",
        ])
        .unwrap();
        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/pr")));
    }
}
