//! Errors that abort a definition run.

use thiserror::Error;

use crate::provider::ProviderError;

/// A fatal error for a whole run.
///
/// Assertion failures are never reported through this type; they are returned
/// as data. Every variant raised by a case carries the index of that case.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to create processors provider: {0}")]
    ProviderSetup(#[source] ProviderError),

    #[error("test case {index} failed to resolve processors: {source}")]
    CacheResolution {
        index: usize,
        #[source]
        source: ProviderError,
    },

    #[error("test case {index} failed: {source:#}")]
    CaseFatal {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("test case {index} aborted: {reason}")]
    CaseAborted { index: usize, reason: String },
}

impl ExecutionError {
    /// Index of the case the error is attributed to, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::ProviderSetup(_) => None,
            Self::CacheResolution { index, .. } | Self::CaseFatal { index, .. } | Self::CaseAborted { index, .. } => Some(*index),
        }
    }
}
