//! # pipecheck engine
//!
//! Runs declarative test definitions against a pipeline target config.
//!
//! A [`Definition`] is an ordered list of cases plus a `parallel` flag. The
//! engine resolves the processors each case targets through a shared,
//! memoizing [`ProcessorsProvider`], hands every case to a [`CaseRunner`], and
//! folds the reported [`CaseFailure`]s into one result ordered by case index.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::{path::Path, sync::Arc};
//!
//! use pipecheck_engine::{DefinitionExecutor, ResolveOnlyRunner, Verdict, parse_definition_file};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let definition = parse_definition_file("config_test.yaml")?;
//! let executor = DefinitionExecutor::with_target_configs(Arc::new(ResolveOnlyRunner));
//! let failures = executor.execute(&definition, Path::new("config.yaml")).await?;
//! match Verdict::from_failures(failures) {
//!     Verdict::Passed => println!("all cases passed"),
//!     Verdict::Failed(failures) => println!("{} failures", failures.len()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`provider`**: provider traits, the memoizing cache, and the file-backed resolver
//! - **`executor`**: warm-up, sequential and concurrent execution, run phases
//! - **`error`**: fatal run errors
//! - **`document`**: definition file loading

pub mod document;
pub mod error;
pub mod executor;
pub mod provider;

pub use document::{parse_definition_file, parse_definition_file_as};
pub use error::ExecutionError;
pub use executor::{CaseRunner, DefinitionExecutor, ExecutionMode, ResolveOnlyRunner, RunPhase, Verdict};
pub use pipecheck_types::{CaseFailure, CaseScope, CaseSpec, Definition, Environment, ProcessorTargets, example_definition};
pub use provider::{
    CacheKey, CacheStats, CachedProvider, ProcessorResolver, ProcessorsProvider, ProvidersFactory, ProviderError, ResolvedProcessors,
    TargetConfigFactory, TargetConfigResolver,
};
