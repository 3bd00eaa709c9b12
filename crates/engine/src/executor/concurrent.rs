//! Fan-out execution with index-stable aggregation.
//!
//! Every case runs as its own blocking task. Results are written to a slot
//! owned by the case index, so the flattened output follows definition order
//! no matter which task finishes first.

use std::{collections::HashMap, sync::Arc};

use pipecheck_types::CaseFailure;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, info, warn};

use super::runner::{CaseRunner, run_case};
use crate::{error::ExecutionError, provider::ProcessorsProvider};

type TaskOutput = (usize, Result<Vec<CaseFailure>, ExecutionError>);

/// Run every case concurrently against an already warmed provider.
///
/// Tasks that are already running are never cancelled. Once a fatal error has
/// been observed no further tasks are spawned, the running ones are drained,
/// and only the first observed error is returned.
pub(crate) async fn run_concurrent<C>(
    cases: Arc<[C]>,
    runner: Arc<dyn CaseRunner<C>>,
    provider: Arc<dyn ProcessorsProvider>,
) -> Result<Vec<CaseFailure>, ExecutionError>
where
    C: Send + Sync + 'static,
{
    let mut aggregator = SlotAggregator::new(cases.len());
    let mut tasks: JoinSet<TaskOutput> = JoinSet::new();

    for index in 0..cases.len() {
        while let Some(joined) = tasks.try_join_next_with_id() {
            aggregator.record(joined);
        }
        if aggregator.has_error() {
            info!(
                launched = index,
                skipped = cases.len() - index,
                "fatal error observed; not launching remaining cases"
            );
            break;
        }

        let task_cases = Arc::clone(&cases);
        let task_runner = Arc::clone(&runner);
        let task_provider = Arc::clone(&provider);
        let handle = tasks.spawn_blocking(move || {
            let outcome = run_case(index, &task_cases[index], task_runner.as_ref(), task_provider.as_ref());
            (index, outcome)
        });
        aggregator.track(handle.id(), index);
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        aggregator.record(joined);
    }

    aggregator.finish()
}

/// Pre-sized per-case result slots plus the first fatal error seen.
#[derive(Debug)]
pub(crate) struct SlotAggregator {
    slots: Vec<Option<Vec<CaseFailure>>>,
    task_indexes: HashMap<task::Id, usize>,
    first_error: Option<ExecutionError>,
}

impl SlotAggregator {
    pub(crate) fn new(case_count: usize) -> Self {
        Self {
            slots: (0..case_count).map(|_| None).collect(),
            task_indexes: HashMap::with_capacity(case_count),
            first_error: None,
        }
    }

    pub(crate) fn track(&mut self, id: task::Id, index: usize) {
        self.task_indexes.insert(id, index);
    }

    pub(crate) fn has_error(&self) -> bool {
        self.first_error.is_some()
    }

    pub(crate) fn record(&mut self, joined: Result<(task::Id, TaskOutput), JoinError>) {
        match joined {
            Ok((_, (index, Ok(failures)))) => self.fill(index, failures),
            Ok((_, (_, Err(error)))) => self.fail(error),
            Err(join_error) => {
                let index = match self.task_indexes.get(&join_error.id()) {
                    Some(index) => *index,
                    None => {
                        warn!(task_id = %join_error.id(), "aborted task was never tracked; attributing it to case 0");
                        0
                    }
                };
                self.fail(ExecutionError::CaseAborted {
                    index,
                    reason: describe_join_error(join_error),
                });
            }
        }
    }

    pub(crate) fn fill(&mut self, index: usize, failures: Vec<CaseFailure>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(failures);
        }
    }

    pub(crate) fn fail(&mut self, error: ExecutionError) {
        if self.first_error.is_some() {
            debug!(error = %error, "dropping fatal error observed after the first");
            return;
        }
        self.first_error = Some(error);
    }

    /// Flatten the slots in index order, or return the first fatal error.
    pub(crate) fn finish(self) -> Result<Vec<CaseFailure>, ExecutionError> {
        if let Some(error) = self.first_error {
            return Err(error);
        }
        Ok(self.slots.into_iter().flatten().flatten().collect())
    }
}

/// Human readable reason for a task that did not return normally.
pub(crate) fn describe_join_error(join_error: JoinError) -> String {
    if !join_error.is_panic() {
        return "task was cancelled".to_string();
    }
    let payload = join_error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("panicked: {message}")
}
