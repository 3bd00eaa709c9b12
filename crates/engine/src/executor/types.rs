//! Core executor data types.

use pipecheck_types::CaseFailure;
use serde::Serialize;

/// Outcome of a run that finished without a fatal error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "failures", rename_all = "snake_case")]
pub enum Verdict {
    /// Every case ran and reported no failures.
    Passed,
    /// Every case ran; these failures were reported, in case order.
    Failed(Vec<CaseFailure>),
}

impl Verdict {
    pub fn from_failures(failures: Vec<CaseFailure>) -> Self {
        if failures.is_empty() { Self::Passed } else { Self::Failed(failures) }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn failures(&self) -> &[CaseFailure] {
        match self {
            Self::Passed => &[],
            Self::Failed(failures) => failures,
        }
    }
}

/// How the cases of a run are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

impl ExecutionMode {
    pub fn from_parallel_flag(parallel: bool) -> Self {
        if parallel { Self::Parallel } else { Self::Sequential }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}
