use std::time::Instant;

use anyhow::{Context, Result};
use pipecheck_types::{CaseFailure, CaseScope};
use tracing::{debug, warn};

use crate::{error::ExecutionError, provider::ProcessorsProvider};

/// Evaluate a single test case.
///
/// Evaluators can run pipelines, compare outputs, or anything else a case
/// describes. They must treat the provider as read-only and may block on I/O;
/// the executor always calls them on a blocking thread.
///
/// Return the failed expectations as data. Return `Err` only when the case
/// could not be evaluated at all, which aborts the whole run.
pub trait CaseRunner<C>: Send + Sync {
    fn run(&self, case: &C, provider: &dyn ProcessorsProvider) -> Result<Vec<CaseFailure>>;
}

/// A runner that only checks a case's processors can be resolved.
///
/// Reports no failures of its own. Useful for validating a definition against
/// a target config before wiring a real evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOnlyRunner;

impl<C: CaseScope> CaseRunner<C> for ResolveOnlyRunner {
    fn run(&self, case: &C, provider: &dyn ProcessorsProvider) -> Result<Vec<CaseFailure>> {
        let resolved = provider
            .resolve(case.target_processors(), case.environment())
            .with_context(|| format!("resolving processors '{}'", case.target_processors()))?;
        debug!(targets = %case.target_processors(), processor_count = resolved.len(), "resolve-only case passed");
        Ok(Vec::new())
    }
}

/// Run one case and attribute a fatal error to its index.
pub(crate) fn run_case<C>(
    index: usize,
    case: &C,
    runner: &dyn CaseRunner<C>,
    provider: &dyn ProcessorsProvider,
) -> Result<Vec<CaseFailure>, ExecutionError> {
    debug!(case_index = index, "case execution started");
    let started_at = Instant::now();
    let outcome = runner.run(case, provider);
    let duration_ms = started_at.elapsed().as_millis().try_into().unwrap_or(u64::MAX);

    match outcome {
        Ok(failures) => {
            debug!(case_index = index, failure_count = failures.len(), duration_ms, "case execution finished");
            Ok(failures)
        }
        Err(source) => {
            warn!(case_index = index, duration_ms, error = %source, "case execution failed");
            Err(ExecutionError::CaseFatal { index, source })
        }
    }
}
