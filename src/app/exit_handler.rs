//! Exit code logic for the downloader process.
//!
//! Single responsibility: map a run outcome to the process exit outcome.

use tag_downloader::RunOutcome;

use crate::ProcessExit;

/// Determines the process exit outcome from completed and failed task counts.
pub(crate) fn determine_exit_outcome(completed: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

/// Maps a terminal run outcome to the process exit outcome.
///
/// A search that stopped on a failed page is at best partial, since results
/// past that page were never seen.
pub(crate) fn exit_for_outcome(outcome: &RunOutcome) -> ProcessExit {
    match outcome {
        RunOutcome::Aborted(_) => ProcessExit::Failure,
        RunOutcome::Cancelled(_) => ProcessExit::Cancelled,
        RunOutcome::Completed(summary) => {
            let by_counts = determine_exit_outcome(summary.completed, summary.failed);
            if summary.fetch_failed() && by_counts == ProcessExit::Success {
                if summary.completed > 0 {
                    ProcessExit::Partial
                } else {
                    ProcessExit::Failure
                }
            } else {
                by_counts
            }
        }
    }
}
