//! Cache warm-up ahead of concurrent execution.

use pipecheck_types::CaseScope;
use tracing::{debug, warn};

use crate::{error::ExecutionError, provider::ProcessorsProvider};

/// Resolve every case's processors, one case at a time, in case order.
///
/// After this returns `Ok` every key the cases will ask for is cached, so
/// concurrent cases only ever read from the provider. The first resolution
/// error aborts the pass.
pub(crate) fn warm_cache<C: CaseScope>(cases: &[C], provider: &dyn ProcessorsProvider) -> Result<(), ExecutionError> {
    for (index, case) in cases.iter().enumerate() {
        match provider.resolve(case.target_processors(), case.environment()) {
            Ok(resolved) => debug!(
                case_index = index,
                targets = %case.target_processors(),
                processor_count = resolved.len(),
                "warmed processors cache"
            ),
            Err(source) => {
                warn!(case_index = index, targets = %case.target_processors(), error = %source, "processors cache warm-up failed");
                return Err(ExecutionError::CacheResolution { index, source });
            }
        }
    }
    Ok(())
}
