// puckrank entry point.
//
// 1. Parse arguments and pick the base directory
// 2. Initialize tracing (log to file, terminal is for reports)
// 3. Load config, open the database
// 4. Run the command and print its report

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::info;

use puckrank_cli::cli::{Cli, Commands};
use puckrank_cli::pipeline::{self, LeadersRequest, RankRequest};
use puckrank_cli::report;
use puckrank_cli::workspace::{resolve_base_dir, Workspace};
use puckrank_scrape::HttpPageSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base_dir = resolve_base_dir(cli.base_dir.clone())?;
    std::fs::create_dir_all(&base_dir)
        .with_context(|| format!("failed to create {}", base_dir.display()))?;

    init_tracing(&base_dir)?;
    info!("puckrank starting in {}", base_dir.display());

    let ws = Workspace::load(&base_dir)?;
    let db = ws.open_db()?;

    match cli.command {
        Commands::Collect { seasons, group } => {
            let seasons = if seasons.is_empty() {
                ws.config.collection.seasons.clone()
            } else {
                seasons
            };
            let source = HttpPageSource::new(&ws.config.scraper).context("failed to build HTTP client")?;
            let summaries = pipeline::collect(&ws, &db, source, &seasons, &group.groups()).await?;
            print!("{}", report::collect_report(&summaries));
            if summaries.iter().all(|s| s.records == 0) {
                return Err(anyhow!("no data collected for seasons {seasons:?}"));
            }
        }
        Commands::Clean { input, group, output } => {
            let output = output.unwrap_or_else(|| input.clone());
            let summary = pipeline::clean(&input, &output, group.into())?;
            print!("{}", report::clean_report(&summary));
        }
        Commands::Rank(args) => {
            let strategy = args
                .strategy()
                .ok_or_else(|| anyhow!("unknown strategy '{}'", args.strategy))?;
            let request = RankRequest {
                season: args.season,
                group: args.group.into(),
                strategy,
                input: args.input.as_deref(),
                output: args.output.as_deref(),
                equal_weights: args.equal_weights,
            };
            let summary = pipeline::rank(&ws, &db, &request)?;
            print!("{}", report::rank_report(&summary, args.top));
        }
        Commands::Compare {
            season,
            group,
            top,
            input,
            equal_weights,
        } => {
            let comparison =
                pipeline::compare_all(&ws, &db, season, group.into(), input.as_deref(), equal_weights, top)?;
            print!("{}", report::compare_report(&comparison));
        }
        Commands::Leaders(args) => {
            let request = LeadersRequest {
                season: args.season,
                group: args.group.into(),
                categories: args.category,
                position: args.position,
                min_games: args.min_games,
                top: args.top,
                input: args.input.as_deref(),
            };
            let boards = pipeline::leaders(&ws, &db, &request)?;
            print!("{}", report::leaders_report(args.season, &boards));
        }
    }

    info!("puckrank finished");
    Ok(())
}

/// Initialize tracing to log to `logs/puckrank.log` under the base directory.
fn init_tracing(base_dir: &std::path::Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("puckrank.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("puckrank=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    Ok(())
}
