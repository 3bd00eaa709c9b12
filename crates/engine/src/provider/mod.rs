//! Processors providers and the per-run resolution cache.
//!
//! Modules:
//! - `cache`: Memoizing provider wrapper keyed by targets and environment
//! - `target`: File-backed resolver that reads processors from a target config

mod cache;
mod target;

use std::{path::Path, sync::Arc};

use pipecheck_types::{Environment, ProcessorTargets};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use cache::{CacheKey, CacheStats, CachedProvider};
pub use target::{TargetConfigFactory, TargetConfigResolver};

/// Processor configs selected from a target config, ready to be executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedProcessors {
    /// Processor configs in the order they were selected.
    pub processors: Vec<Value>,
}

impl ResolvedProcessors {
    pub fn new(processors: Vec<Value>) -> Self {
        Self { processors }
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

/// Errors raised while resolving the processors a case targets.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read target config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse target config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("target '{target}' not found in {path}")]
    TargetNotFound { target: String, path: String },

    #[error("processors cache lock poisoned")]
    CachePoisoned,
}

/// Shared, read-mostly source of resolved processors for every case of a run.
///
/// Implementations memoize by `(targets, environment)`; repeated calls with an
/// equal key return the same resolved value.
pub trait ProcessorsProvider: Send + Sync {
    fn resolve(&self, targets: &ProcessorTargets, environment: &Environment) -> Result<Arc<ResolvedProcessors>, ProviderError>;
}

/// Resolution logic without caching. Wrapped by [`CachedProvider`].
pub trait ProcessorResolver: Send + Sync {
    fn resolve_uncached(&self, targets: &ProcessorTargets, environment: &Environment) -> Result<ResolvedProcessors, ProviderError>;
}

/// Builds a fresh provider scoped to one execution against `target`.
pub trait ProvidersFactory: Send + Sync {
    fn create(&self, target: &Path) -> Result<Arc<dyn ProcessorsProvider>, ProviderError>;
}
