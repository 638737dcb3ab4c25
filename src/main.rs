use chrono::{DateTime, Months, NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use circleci_releases::models::RepoTarget;
use circleci_releases::{
    AthenianClient, CircleClient, Config, DryRunSink, Error, ExportConfig, ExportPipeline,
    ReleaseSink,
};

/// Flags go before the repositories: everything from the first repository on
/// is taken as a repository name, so a trailing flag is reported rather than
/// silently applied. `-dry-run` is accepted as a spelling of `--dry-run`.
#[derive(Parser, Debug)]
#[command(name = "circleci-releases")]
#[command(version = "0.1.0")]
#[command(about = "Send CircleCI pipelines to Athenian as release notifications")]
struct Args {
    /// Repositories to load, as owner/repo or owner/repo@branch
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    repos: Vec<String>,

    /// Load pipelines started after this date (YYYY-MM-DD)
    #[arg(short, long)]
    since: Option<String>,

    /// Print release notifications instead of sending
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("circleci_releases=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse CLI arguments; usage errors exit with 1, help and version with 0
    let args = match parse_args(std::env::args()) {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(usage_exit_code(&e));
        }
    };

    // Load configuration
    let config = Config::from_env()?;
    let targets = parse_targets(&args.repos)?;
    let since = parse_since(args.since.as_deref())?;

    // Initialize clients
    let source = CircleClient::with_base_url(&config.circleci_token, &config.circleci_api_url)?;
    let sink: Box<dyn ReleaseSink> = if args.dry_run {
        Box::new(DryRunSink::stdout())
    } else {
        Box::new(AthenianClient::with_base_url(
            &config.athenian_token,
            &config.athenian_api_url,
        )?)
    };

    // Run export
    let pipeline = ExportPipeline::new(&source, sink.as_ref(), ExportConfig::from(&config));
    let summary = pipeline.run(&targets, since).await?;

    // Report results
    tracing::info!(
        "Delivered {} of {} releases",
        summary.delivered,
        summary.collected
    );
    if !summary.failed_repositories.is_empty() {
        tracing::warn!(
            "Could not load pipelines for: {}",
            summary.failed_repositories.join(", ")
        );
    }
    summary.into_result()?;

    Ok(())
}

fn parse_args<I>(args: I) -> Result<Args, clap::Error>
where
    I: IntoIterator<Item = String>,
{
    Args::try_parse_from(args.into_iter().map(|arg| {
        if arg == "-dry-run" {
            "--dry-run".to_string()
        } else {
            arg
        }
    }))
}

fn usage_exit_code(e: &clap::Error) -> i32 {
    if e.use_stderr() {
        1
    } else {
        0
    }
}

fn parse_targets(repos: &[String]) -> Result<Vec<RepoTarget>, Error> {
    repos.iter().map(|repo| repo.parse::<RepoTarget>()).collect()
}

/// Midnight UTC of the given date, or of today minus 15 months.
fn parse_since(value: Option<&str>) -> Result<DateTime<Utc>, Error> {
    let date = match value {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
            Error::Config(format!("Invalid date: {} (must be YYYY-MM-DD)", value))
        })?,
        None => {
            let today = Utc::now().date_naive();
            today.checked_sub_months(Months::new(15)).unwrap_or(today)
        }
    };

    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}
