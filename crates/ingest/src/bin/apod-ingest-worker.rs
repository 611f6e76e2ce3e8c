//! apod-ingest-worker: runs the APOD pipeline on a daily cron schedule.
//!
//! With `--once` it performs a single run and exits non-zero if the run
//! failed, which lets an external scheduler own the cadence instead.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use apod_core::config::{self, Config};
use apod_ingest::{DailyTrigger, PgStore, PipelineRunner, ReqwestFetcher};

// ── CLI ─────────────────────────────────────────────────────────────

/// APOD ingest worker: fetch, normalize, and store the daily APOD entry.
#[derive(Parser, Debug)]
#[command(name = "apod-ingest-worker", version, about)]
struct Cli {
    /// Run the pipeline once and exit.
    #[arg(long, env = "APOD_RUN_ONCE")]
    once: bool,

    /// Cron expression overriding the profiled APOD_SCHEDULE_CRON.
    #[arg(long, env = "APOD_CRON")]
    cron: Option<String>,

    /// Config profile (keys are looked up as {PROFILE}_{KEY} first).
    #[arg(long, env = "APOD_PROFILE")]
    profile: Option<String>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before the subscriber, so RUST_LOG from .env applies.
    config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    if let Some(cron) = cli.cron {
        config.schedule.cron = cron;
    }
    config.log_summary();

    let fetcher = Arc::new(ReqwestFetcher::new(Duration::from_secs(
        config.source.timeout_secs,
    ))?);
    let store = Arc::new(PgStore::connect_lazy(&config.postgres)?);
    let runner = PipelineRunner::from_config(&config, fetcher, store);

    if cli.once {
        let report = runner.run().await;
        info!(
            report = %serde_json::to_string(&report)?,
            config = %config.redacted_summary(),
            "run finished"
        );
        report.into_result()?;
        return Ok(());
    }

    let trigger = DailyTrigger::new(&config.schedule.cron)?;
    trigger
        .run_until(&runner, async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await;

    info!("apod-ingest-worker exited cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cron_flag_falls_back_to_env() {
        std::env::set_var("APOD_CRON", "15 3 * * *");
        let cli = Cli::try_parse_from(["apod-ingest-worker", "--once"]).unwrap();
        std::env::remove_var("APOD_CRON");

        assert!(cli.once);
        assert_eq!(cli.cron.as_deref(), Some("15 3 * * *"));
    }

    #[test]
    fn cron_flag_wins_over_env() {
        let cli = Cli::try_parse_from(["apod-ingest-worker", "--cron", "0 6 * * *"]).unwrap();
        assert_eq!(cli.cron.as_deref(), Some("0 6 * * *"));
    }
}
