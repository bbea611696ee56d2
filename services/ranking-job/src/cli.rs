use crate::report::render_summary;
use crate::runner::run_once;
use crate::server;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use mpi_ranking::config::AppConfig;
use mpi_ranking::error::AppError;
use mpi_ranking::ranking::DataDirectory;
use mpi_ranking::telemetry;
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "mpi-ranking-job",
    about = "Nightly athlete performance ranking: run the job, inspect policy or serve the admin API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the admin HTTP service (default command)
    Serve(ServeArgs),
    /// Run the nightly ranking job once against a data directory
    Run(RunArgs),
    /// Print the effective ranking policy as JSON
    Policy,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Data directory holding settings.csv, sessions.csv, flags.csv and snapshots.json
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Calculation date (YYYY-MM-DD). Defaults to today in UTC.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Compute and report without writing anything back to the data directory
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Print the run summary as JSON instead of text
    #[arg(long)]
    pub(crate) summary_json: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Run(args) => run_job(args).await,
        Command::Policy => print_policy(),
    }
}

async fn run_job(args: RunArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let data_dir = DataDirectory::new(args.data_dir.unwrap_or(config.ranking.data_dir));
    let calculation_date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let summary = run_once(
        &data_dir,
        &config.ranking.policy,
        calculation_date,
        !args.dry_run,
    )
    .await?;

    if !summary.is_clean() {
        warn!(
            failures = summary.failure_count(),
            conflicts = summary.conflict_count(),
            "ranking run finished with problems"
        );
    }

    if args.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary, args.dry_run));
    }
    Ok(())
}

fn print_policy() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    println!("{}", serde_json::to_string_pretty(&config.ranking.policy)?);
    Ok(())
}
