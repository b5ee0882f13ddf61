use std::time::Instant;

use crate::InvocationOutcome;

/// One discovery pass. Results not refreshed since `started_at` are stale
/// once the session is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSession {
    started_at: Instant,
}

impl ScanSession {
    pub(crate) fn begin() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}

/// Tally of one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// (module, bridge) pairs handed to the safe caller
    pub invoked: usize,
    pub completed: usize,
    pub timed_out: usize,
    pub failed: usize,
    /// Stale results removed when the scan was stopped
    pub retracted: usize,
}

impl ScanSummary {
    pub(crate) fn from_outcomes(outcomes: &[InvocationOutcome]) -> Self {
        let mut summary = Self {
            invoked: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                InvocationOutcome::Completed => summary.completed += 1,
                InvocationOutcome::TimedOut(_) => summary.timed_out += 1,
                InvocationOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}
