//! Shared data model for pipecheck test definitions.
//!
//! These types describe what a test suite *is*: the run-mode flag, the ordered
//! cases, the subset of a target config each case exercises, and the failures a
//! case can report. How a suite is executed lives in `pipecheck-engine`.

mod case;
mod definition;

pub use case::{CaseFailure, CaseScope, CaseSpec, DEFAULT_TARGET_POINTER, Environment, ProcessorTargets};
pub use definition::{Definition, example_definition};
