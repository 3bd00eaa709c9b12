//! One-case-at-a-time execution.

use std::sync::Arc;

use pipecheck_types::CaseFailure;
use tokio::task;
use tracing::info;

use super::{concurrent::describe_join_error, runner::CaseRunner, runner::run_case};
use crate::{error::ExecutionError, provider::ProcessorsProvider};

/// Run cases in definition order, stopping at the first fatal error.
///
/// Each case still runs on the blocking pool so a slow evaluator never stalls
/// the async caller, but the next case is only started once the previous one
/// has returned.
pub(crate) async fn run_sequential<C>(
    cases: Arc<[C]>,
    runner: Arc<dyn CaseRunner<C>>,
    provider: Arc<dyn ProcessorsProvider>,
) -> Result<Vec<CaseFailure>, ExecutionError>
where
    C: Send + Sync + 'static,
{
    let mut failures = Vec::new();

    for index in 0..cases.len() {
        let task_cases = Arc::clone(&cases);
        let task_runner = Arc::clone(&runner);
        let task_provider = Arc::clone(&provider);

        let outcome = task::spawn_blocking(move || run_case(index, &task_cases[index], task_runner.as_ref(), task_provider.as_ref()))
            .await
            .map_err(|join_error| ExecutionError::CaseAborted {
                index,
                reason: describe_join_error(join_error),
            })?;

        match outcome {
            Ok(case_failures) => failures.extend(case_failures),
            Err(error) => {
                info!(case_index = index, remaining = cases.len() - index - 1, "stopping sequential run after fatal error");
                return Err(error);
            }
        }
    }

    Ok(failures)
}
