//! Run lifecycle types: states, stages, failures and the final report.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use apod_core::{ErrorKind, IngestError, PersistedRow};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Initializing,
    Extracting,
    Transforming,
    Loading,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Forward steps follow the stage order; any non-terminal state may fail.
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Pending, Initializing)
            | (Initializing, Extracting)
            | (Extracting, Transforming)
            | (Transforming, Loading)
            | (Loading, Completed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SchemaInitializer,
    Extractor,
    Transformer,
    Loader,
}

impl Stage {
    /// State the run is in while this stage executes.
    pub fn state(self) -> RunState {
        match self {
            Self::SchemaInitializer => RunState::Initializing,
            Self::Extractor => RunState::Extracting,
            Self::Transformer => RunState::Transforming,
            Self::Loader => RunState::Loading,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SchemaInitializer => "schema_initializer",
            Self::Extractor => "extractor",
            Self::Transformer => "transformer",
            Self::Loader => "loader",
        };
        f.write_str(s)
    }
}

/// The error that ended a run, with the stage that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{stage} failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    pub error: IngestError,
}

impl StageFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Everything an invoker learns about one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub state: RunState,
    /// Every state entered, in order, starting with `Pending`.
    pub transitions: Vec<RunState>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub loaded_row_id: Option<i32>,
    pub recent_rows: Vec<PersistedRow>,
    pub failure: Option<StageFailure>,
}

impl RunReport {
    pub(crate) fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: RunState::Pending,
            transitions: vec![RunState::Pending],
            started_at: Utc::now(),
            finished_at: None,
            loaded_row_id: None,
            recent_rows: Vec::new(),
            failure: None,
        }
    }

    pub(crate) fn enter(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal run transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
        self.transitions.push(next);
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    /// Convert into a `Result` for callers that only care about success.
    pub fn into_result(self) -> Result<Self, StageFailure> {
        match self.failure.clone() {
            Some(failure) => Err(failure),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [RunState; 7] = [
        RunState::Pending,
        RunState::Initializing,
        RunState::Extracting,
        RunState::Transforming,
        RunState::Loading,
        RunState::Completed,
        RunState::Failed,
    ];

    #[test]
    fn happy_path_transitions_are_legal() {
        let path = [
            RunState::Pending,
            RunState::Initializing,
            RunState::Extracting,
            RunState::Transforming,
            RunState::Loading,
            RunState::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn stages_cannot_be_skipped_or_reordered() {
        assert!(!RunState::Pending.can_transition_to(RunState::Extracting));
        assert!(!RunState::Initializing.can_transition_to(RunState::Transforming));
        assert!(!RunState::Extracting.can_transition_to(RunState::Loading));
        assert!(!RunState::Loading.can_transition_to(RunState::Extracting));
    }

    #[test]
    fn failed_reachable_only_from_non_terminal() {
        for state in ALL {
            assert_eq!(
                state.can_transition_to(RunState::Failed),
                !state.is_terminal(),
                "{state:?}"
            );
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [RunState::Completed, RunState::Failed] {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn stage_failure_display_names_stage_and_kind() {
        let failure = StageFailure {
            stage: Stage::Extractor,
            error: IngestError::Permanent("request rejected 403: forbidden".into()),
        };
        assert_eq!(
            failure.to_string(),
            "extractor failed: permanent error: request rejected 403: forbidden"
        );
        assert_eq!(failure.kind(), ErrorKind::Permanent);
    }

    #[test]
    fn report_serializes_states_snake_case() {
        let mut report = RunReport::start();
        report.enter(RunState::Initializing);
        report.enter(RunState::Failed);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(
            json["transitions"],
            serde_json::json!(["pending", "initializing", "failed"])
        );
        assert!(report.finished_at.is_some());
    }
}
