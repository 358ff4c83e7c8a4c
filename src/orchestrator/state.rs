//! Run lifecycle states, outcomes and the events sent to observers.

use std::fmt;

use crate::api::FetchEnd;
use crate::progress::ProgressSnapshot;

/// Lifecycle state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Constructed, not started.
    #[default]
    Idle,
    /// Checking credentials.
    Authenticating,
    /// Paging through search results.
    Fetching,
    /// Turning results into download tasks.
    Building,
    /// Working through the task list.
    Downloading,
    /// Finished normally (individual tasks may still have failed).
    Completed,
    /// Stopped by an authentication or unrecoverable error.
    Aborted,
    /// Stopped at the caller's request.
    Cancelled,
}

impl RunState {
    /// Whether the run has ended.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal lifecycle step.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use RunState::{
            Aborted, Authenticating, Building, Cancelled, Completed, Downloading, Fetching, Idle,
        };
        matches!(
            (self, next),
            (Idle, Authenticating)
                | (Authenticating | Fetching | Building | Downloading, Aborted | Cancelled)
                | (Authenticating, Fetching)
                | (Fetching, Building | Completed)
                | (Building, Downloading)
                | (Downloading, Completed)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Authenticating => "authenticating",
            Self::Fetching => "fetching",
            Self::Building => "building",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Totals for a finished or cancelled run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Tasks that ended with the file on disk.
    pub completed: usize,
    /// Tasks that failed after retries.
    pub failed: usize,
    /// Tasks in the run.
    pub total: usize,
    /// Search results that produced no task.
    pub skipped_items: usize,
    /// Why fetching stopped; `None` if the run never fetched.
    pub fetch_end: Option<FetchEnd>,
}

impl RunSummary {
    /// Tasks never attempted (only non-zero for cancelled runs).
    #[must_use]
    pub fn not_attempted(&self) -> usize {
        self.total.saturating_sub(self.completed + self.failed)
    }

    /// Whether the result list may be incomplete because a page failed.
    #[must_use]
    pub fn fetch_failed(&self) -> bool {
        self.fetch_end.as_ref().is_some_and(FetchEnd::is_failure)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed, {} failed, {} total",
            self.completed, self.failed, self.total
        )?;
        if self.skipped_items > 0 {
            write!(f, ", {} skipped", self.skipped_items)?;
        }
        Ok(())
    }
}

/// Terminal result of [`Orchestrator::run`](super::Orchestrator::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run reached the end of its task list.
    Completed(RunSummary),
    /// The run stopped early; the reason is human readable.
    Aborted(String),
    /// The caller cancelled; outcomes recorded so far are kept.
    Cancelled(RunSummary),
}

impl RunOutcome {
    /// Terminal state matching this outcome.
    #[must_use]
    pub fn state(&self) -> RunState {
        match self {
            Self::Completed(_) => RunState::Completed,
            Self::Aborted(_) => RunState::Aborted,
            Self::Cancelled(_) => RunState::Cancelled,
        }
    }

    /// Summary, when the run got far enough to produce one.
    #[must_use]
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::Completed(summary) | Self::Cancelled(summary) => Some(summary),
            Self::Aborted(_) => None,
        }
    }
}

/// Notification sent to the observer while a run progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Human-readable status line.
    Log(String),
    /// Counters after a task outcome.
    Progress(ProgressSnapshot),
    /// The run completed.
    Completed(RunSummary),
    /// The run aborted.
    Error(String),
}
