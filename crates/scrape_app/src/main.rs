mod console;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use scrape_core::{FailureReason, JobCandidate, JobStatus};
use scrape_logging::{scrape_info, scrape_warn};

use console::config::{self, AppConfig};

/// Launches a LinkedIn company-people scrape and reports its progress.
#[derive(Debug, Parser)]
#[command(name = "profile-scraper", version)]
struct Args {
    /// Company people page, e.g. https://www.linkedin.com/company/acme/people/
    #[arg(long, required_unless_present = "write_config")]
    url: Option<String>,

    /// Number of profiles to scrape (1-100).
    #[arg(long, default_value_t = 10)]
    limit: u32,

    /// Seconds to wait between profiles (3-15).
    #[arg(long, default_value_t = 5)]
    delay: u32,

    /// RON configuration file.
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// NDJSON event log the worker appends progress to. Overrides the config.
    #[arg(long)]
    events: Option<PathBuf>,

    /// Ask the worker to open the artifact once results are in.
    #[arg(long)]
    open_when_done: bool,

    /// Save the effective configuration to `--config`.
    #[arg(long)]
    write_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (mut config, load_error) = match config::load(&args.config) {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    if let Some(events) = args.events {
        config.event_log = events;
    }

    console::logging::initialize(config.log_destination);
    if let Some(err) = &load_error {
        scrape_warn!("{}; using defaults", err);
    }

    if args.write_config {
        let written = config::save_unless_broken(&args.config, &config, load_error.as_ref())
            .with_context(|| format!("writing {}", args.config.display()))?;
        if written {
            scrape_info!("Wrote configuration to {:?}", args.config);
        } else {
            scrape_warn!("Not overwriting {:?}; fix or remove it first", args.config);
        }
    }
    let Some(url) = args.url else {
        return Ok(());
    };

    let candidate = JobCandidate::new(url, args.limit, args.delay);
    let status = console::run(&config, candidate, args.open_when_done)?;
    match status {
        JobStatus::Failed(FailureReason::UserCancelled) | JobStatus::Completed => Ok(()),
        JobStatus::Failed(reason) => bail!("scrape failed: {reason}"),
        JobStatus::Idle | JobStatus::Running => Ok(()),
    }
}
