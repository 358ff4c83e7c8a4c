//! Progress UI (bar) fed by run events.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tag_downloader::{ProgressSnapshot, RunEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Spawns the event consumer. Draws a progress bar when `use_bar` is true;
/// otherwise drains events silently (tracing already reports them).
/// The task ends when the orchestrator drops its sender.
pub(crate) fn spawn_progress_ui(
    use_bar: bool,
    mut events: UnboundedReceiver<RunEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = use_bar.then(new_bar);
        while let Some(event) = events.recv().await {
            if let Some(bar) = &bar {
                render(bar, &event);
            }
        }
        if let Some(bar) = bar {
            if !bar.is_finished() {
                bar.finish_and_clear();
            }
        }
    })
}

fn new_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn render(bar: &ProgressBar, event: &RunEvent) {
    match event {
        RunEvent::Log(line) => bar.set_message(line.clone()),
        RunEvent::Progress(snapshot) => {
            bar.set_length(snapshot.total as u64);
            bar.set_position(snapshot.processed() as u64);
            bar.set_message(format_progress_message(snapshot));
        }
        RunEvent::Completed(_) => bar.finish_and_clear(),
        RunEvent::Error(reason) => bar.abandon_with_message(reason.clone()),
    }
}

/// One-line status for a snapshot, e.g. `3 ok, 1 failed | 2.0/s | ETA 12s`.
pub(crate) fn format_progress_message(snapshot: &ProgressSnapshot) -> String {
    let mut message = format!("{} ok, {} failed", snapshot.completed, snapshot.failed);
    if snapshot.throughput > 0.0 {
        message.push_str(&format!(" | {:.1}/s", snapshot.throughput));
    }
    if snapshot.eta_seconds > 0.0 {
        message.push_str(&format!(" | ETA {}s", snapshot.eta_seconds.ceil()));
    }
    message
}
