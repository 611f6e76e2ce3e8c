//! Cron-driven trigger that invokes the pipeline once per period.
//!
//! The next fire time is always computed from the current instant after the
//! previous run has finished, so runs never overlap and missed periods are
//! not backfilled.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tracing::{info, warn};

use crate::runner::PipelineRunner;

/// Parse a cron expression, auto-prepending "0 " for 5-field expressions.
///
/// The `cron` crate requires 6 fields (sec min hr dom mon dow), but the
/// usual daily schedule is written with 5 (min hr dom mon dow).
pub fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        Schedule::from_str(&format!("0 {}", trimmed))
    } else {
        Schedule::from_str(trimmed)
    }
}

pub struct DailyTrigger {
    expression: String,
    schedule: Schedule,
}

impl DailyTrigger {
    pub fn new(expression: &str) -> Result<Self, cron::error::Error> {
        Ok(Self {
            expression: expression.trim().to_string(),
            schedule: parse_cron(expression)?,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `now`.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&now).next()
    }

    /// Next fire time, never at or before the previous one.
    ///
    /// `sleep` follows the monotonic clock while `now` is wall time, so a
    /// backwards clock step can wake the loop just short of `last`.
    pub fn next_tick(
        &self,
        now: DateTime<Utc>,
        last: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        let from = last.map_or(now, |last| now.max(last));
        self.next_fire_after(from)
    }

    /// Run the pipeline on every tick until `shutdown` resolves.
    ///
    /// A failed run is logged and the loop waits for the next tick.
    pub async fn run_until<F>(&self, runner: &PipelineRunner, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(cron = %self.expression, "APOD trigger started");

        let mut last = None;
        loop {
            let now = Utc::now();
            let Some(next) = self.next_tick(now, last) else {
                warn!(cron = %self.expression, "schedule has no future fire times, stopping");
                return;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next_run = %next, wait_secs = wait.as_secs(), "waiting for next run");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = &mut shutdown => {
                    info!("APOD trigger shutting down");
                    return;
                }
            }

            last = Some(next);
            let report = runner.run().await;
            match &report.failure {
                None => info!(run_id = %report.run_id, row_id = ?report.loaded_row_id, "scheduled run completed"),
                Some(failure) => warn!(
                    run_id = %report.run_id,
                    stage = %failure.stage,
                    retryable = failure.error.is_retryable(),
                    "scheduled run failed, waiting for next period"
                ),
            }
        }
    }
}
