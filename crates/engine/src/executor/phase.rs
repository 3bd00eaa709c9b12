//! Lifecycle of a single definition run.

use std::fmt;

use tracing::{debug, warn};

/// Phase of a definition run.
///
/// ```text
/// NotStarted -> WarmingCache (parallel only) -> Running -> Completed
///                     |                            |
///                     +---------> Failed <---------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    /// Sequentially resolving every case's processors before fan-out.
    WarmingCache,
    Running,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::WarmingCache)
                | (Self::NotStarted, Self::Running)
                | (Self::NotStarted, Self::Failed)
                | (Self::WarmingCache, Self::Running)
                | (Self::WarmingCache, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not_started",
            Self::WarmingCache => "warming_cache",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Tracks the phase of one run and logs each transition.
#[derive(Debug)]
pub(crate) struct PhaseTracker {
    current: RunPhase,
}

impl PhaseTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: RunPhase::NotStarted,
        }
    }

    pub(crate) fn current(&self) -> RunPhase {
        self.current
    }

    pub(crate) fn advance(&mut self, next: RunPhase) {
        if !self.current.can_transition_to(next) {
            warn!(from = %self.current, to = %next, "illegal run phase transition");
            debug_assert!(false, "illegal run phase transition {} -> {}", self.current, next);
        }
        debug!(from = %self.current, to = %next, "run phase transition");
        self.current = next;
    }
}
