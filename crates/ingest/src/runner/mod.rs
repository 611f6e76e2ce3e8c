//! [`PipelineRunner`]: one run of initialize → extract → transform → load.
//!
//! Stages are plain sequential calls. Each stage's return value is the next
//! stage's only input, and the extract call is reachable only after schema
//! initialization returned `Ok`. The first error ends the run in
//! [`RunState::Failed`]; nothing is retried or undone.

mod state;


use std::sync::Arc;

use tracing::{error, info, Instrument};

use apod_core::{Config, IngestError};

use crate::extract::Extractor;
use crate::load::Loader;
use crate::schema::SchemaInitializer;
use crate::source::HttpFetcher;
use crate::store::ApodStore;
use crate::transform;

pub use self::state::{RunReport, RunState, Stage, StageFailure};

pub struct PipelineRunner {
    initializer: SchemaInitializer,
    extractor: Extractor,
    loader: Loader,
}

impl PipelineRunner {
    pub fn new(initializer: SchemaInitializer, extractor: Extractor, loader: Loader) -> Self {
        Self {
            initializer,
            extractor,
            loader,
        }
    }

    /// Wire all stages from config against the given transport and sink.
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn HttpFetcher>,
        store: Arc<dyn ApodStore>,
    ) -> Self {
        Self::new(
            SchemaInitializer::new(store.clone()),
            Extractor::from_config(fetcher, &config.source),
            Loader::with_verify_limit(store, config.schedule.verify_limit),
        )
    }

    /// Execute one complete run. Never panics on stage errors; inspect the
    /// returned report for the outcome.
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::start();
        let span = tracing::info_span!("apod_run", run_id = %report.run_id);

        async {
            info!("pipeline run started");
            if let Err(failure) = self.execute(&mut report).await {
                error!(
                    stage = %failure.stage,
                    kind = %failure.kind(),
                    error = %failure.error,
                    "pipeline run failed"
                );
                report.failure = Some(failure);
                report.enter(RunState::Failed);
            } else {
                info!(row_id = ?report.loaded_row_id, "pipeline run completed");
            }
            report
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, report: &mut RunReport) -> Result<(), StageFailure> {
        report.enter(Stage::SchemaInitializer.state());
        self.initializer
            .ensure_schema()
            .await
            .map_err(at(Stage::SchemaInitializer))?;

        report.enter(Stage::Extractor.state());
        let raw = self
            .extractor
            .fetch_today()
            .await
            .map_err(at(Stage::Extractor))?;

        report.enter(Stage::Transformer.state());
        let record = transform::normalize(raw);
        info!(date = %record.date, media_type = %record.media_type, "record normalized");

        report.enter(Stage::Loader.state());
        let loaded = self.loader.load(record).await.map_err(at(Stage::Loader))?;

        report.loaded_row_id = Some(loaded.row_id);
        report.recent_rows = loaded.recent;
        report.enter(RunState::Completed);
        Ok(())
    }
}

fn at(stage: Stage) -> impl FnOnce(IngestError) -> StageFailure {
    move |error| StageFailure { stage, error }
}
