//! Definition execution.
//!
//! A run goes through an explicit phase sequence: parallel runs first warm the
//! processors cache one case at a time, then fan out; sequential runs go
//! straight to executing cases in order. Either way the caller gets the
//! failures of every case in case order, or the first fatal error.

mod concurrent;
mod phase;
mod runner;
mod sequential;
mod types;
mod warmup;

#[cfg(test)]
mod tests;

use std::{path::Path, sync::Arc, time::Instant};

use pipecheck_types::{CaseFailure, CaseScope, Definition};
use tracing::{info, warn};

use crate::{
    error::ExecutionError,
    provider::{ProvidersFactory, TargetConfigFactory},
};

pub use phase::RunPhase;
pub use runner::{CaseRunner, ResolveOnlyRunner};
pub use types::{ExecutionMode, Verdict};

use concurrent::run_concurrent;
use phase::PhaseTracker;
use sequential::run_sequential;
use warmup::warm_cache;

/// Runs definitions against a target config.
///
/// A fresh processors provider is created for every call to [`execute`], so
/// nothing is cached across runs.
///
/// [`execute`]: DefinitionExecutor::execute
pub struct DefinitionExecutor<C> {
    factory: Arc<dyn ProvidersFactory>,
    runner: Arc<dyn CaseRunner<C>>,
    parallel_override: Option<bool>,
}

impl<C> DefinitionExecutor<C>
where
    C: CaseScope + Send + Sync + 'static,
{
    pub fn new(factory: Arc<dyn ProvidersFactory>, runner: Arc<dyn CaseRunner<C>>) -> Self {
        Self {
            factory,
            runner,
            parallel_override: None,
        }
    }

    /// Executor that resolves processors from target config files on disk.
    pub fn with_target_configs(runner: Arc<dyn CaseRunner<C>>) -> Self {
        Self::new(Arc::new(TargetConfigFactory), runner)
    }

    /// Force parallel (`Some(true)`) or sequential (`Some(false)`) execution,
    /// ignoring each definition's own flag. `None` restores the default.
    pub fn parallel_override(mut self, parallel: Option<bool>) -> Self {
        self.parallel_override = parallel;
        self
    }

    pub fn mode_for(&self, definition: &Definition<C>) -> ExecutionMode {
        ExecutionMode::from_parallel_flag(self.parallel_override.unwrap_or(definition.parallel))
    }

    /// Run every case of `definition` against `target`.
    ///
    /// # Returns
    /// The failures of all cases, flattened in case order (empty when every
    /// case passed).
    ///
    /// # Errors
    /// - [`ExecutionError::ProviderSetup`] when no provider can be created for `target`
    /// - [`ExecutionError::CacheResolution`] when a parallel warm-up fails; no case runs
    /// - [`ExecutionError::CaseFatal`] / [`ExecutionError::CaseAborted`] for the first
    ///   case that could not be evaluated
    pub async fn execute(&self, definition: &Definition<C>, target: &Path) -> Result<Vec<CaseFailure>, ExecutionError> {
        let mode = self.mode_for(definition);
        let case_count = definition.len();
        let started_at = Instant::now();
        let mut phases = PhaseTracker::new();
        info!(target_config = %target.display(), mode = mode.as_str(), case_count, "definition execution started");

        let provider = match self.factory.create(target) {
            Ok(provider) => provider,
            Err(source) => {
                phases.advance(RunPhase::Failed);
                warn!(target_config = %target.display(), error = %source, "processors provider setup failed");
                return Err(ExecutionError::ProviderSetup(source));
            }
        };

        if mode == ExecutionMode::Parallel {
            phases.advance(RunPhase::WarmingCache);
            if let Err(error) = warm_cache(&definition.cases, provider.as_ref()) {
                phases.advance(RunPhase::Failed);
                return Err(error);
            }
        }

        phases.advance(RunPhase::Running);
        let cases = Arc::clone(&definition.cases);
        let runner = Arc::clone(&self.runner);
        let result = match mode {
            ExecutionMode::Parallel => run_concurrent(cases, runner, provider).await,
            ExecutionMode::Sequential => run_sequential(cases, runner, provider).await,
        };

        let duration_ms: u64 = started_at.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        match &result {
            Ok(failures) => {
                phases.advance(RunPhase::Completed);
                info!(
                    phase = %phases.current(),
                    mode = mode.as_str(),
                    case_count,
                    failure_count = failures.len(),
                    duration_ms,
                    "definition execution finished"
                );
            }
            Err(error) => {
                phases.advance(RunPhase::Failed);
                warn!(
                    phase = %phases.current(),
                    mode = mode.as_str(),
                    case_index = ?error.index(),
                    duration_ms,
                    error = %error,
                    "definition execution aborted"
                );
            }
        }
        result
    }
}
