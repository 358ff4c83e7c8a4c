//! Binary runtime: configuration, signal handling, progress UI and exit codes.

pub(crate) mod config_manager;
pub(crate) mod exit_handler;
pub(crate) mod progress_manager;
pub(crate) mod terminal;

use std::io::{self, IsTerminal};

use anyhow::Result;
use tag_downloader::{CancellationToken, Orchestrator, RunOutcome};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::ProcessExit;
use crate::cli::Args;

pub(crate) async fn run_downloader(args: Args) -> Result<ProcessExit> {
    terminal::init_tracing(args.default_log_level(), terminal::no_color_env_requested());
    debug!(config_file = ?args.config, verbose = args.verbose, "CLI arguments parsed");

    let config = config_manager::resolve_config(&args)?;
    info!(tags = %config.download.tags, "Tag downloader starting");

    let cancel = CancellationToken::new();
    let signal_task = spawn_interrupt_listener(cancel.clone());

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let orchestrator = Orchestrator::new(config, events_tx, cancel)?;
    let use_bar = terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let ui = progress_manager::spawn_progress_ui(use_bar, events_rx);

    let outcome = orchestrator.spawn().await?;
    signal_task.abort();
    if let Err(join_error) = ui.await {
        debug!(error = %join_error, "progress UI task ended abnormally");
    }

    report_outcome(&outcome);
    Ok(exit_handler::exit_for_outcome(&outcome))
}

/// Sets the cancellation flag on Ctrl-C; the current transfer finishes first.
fn spawn_interrupt_listener(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current file");
            cancel.cancel();
        }
    })
}

fn report_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed(summary) => {
            if summary.fetch_failed() {
                warn!(%summary, "Search stopped early; some results were not downloaded");
            }
            info!(
                completed = summary.completed,
                failed = summary.failed,
                total = summary.total,
                skipped = summary.skipped_items,
                "Download complete"
            );
        }
        RunOutcome::Cancelled(summary) => {
            warn!(
                completed = summary.completed,
                failed = summary.failed,
                not_attempted = summary.not_attempted(),
                "Download cancelled"
            );
        }
        RunOutcome::Aborted(reason) => error!(%reason, "Run aborted"),
    }
}
