//! The run worker: authenticate, fetch, build tasks, download.

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::cancel::CancellationToken;
use super::error::OrchestratorError;
use super::state::{RunEvent, RunOutcome, RunState, RunSummary};
use crate::api::{ApiClient, FetchEnd, FetchReport, Item};
use crate::config::{ConfigError, RunConfig};
use crate::download::{DownloadTask, FileDownloader};
use crate::progress::ProgressTracker;
use crate::retry::RetryPolicy;

/// Reason reported when the server rejects the credentials.
pub const LOGIN_FAILED: &str = "Login failed";

/// Drives one run from authentication to a terminal state.
///
/// Owns both HTTP transports and releases them on every exit path.
#[derive(Debug)]
pub struct Orchestrator {
    config: RunConfig,
    api: ApiClient,
    downloader: FileDownloader,
    events: UnboundedSender<RunEvent>,
    cancel: CancellationToken,
    state: RunState,
    tracker: ProgressTracker,
}

/// Tasks built from one fetch, plus how many items produced none.
struct TaskList {
    tasks: Vec<DownloadTask>,
    skipped: usize,
}

impl Orchestrator {
    /// Validates `config` and prepares a run. No network activity happens here.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is incomplete or invalid.
    pub fn new(
        config: RunConfig,
        events: UnboundedSender<RunEvent>,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let api = ApiClient::new(config.api.clone(), config.credentials.clone());
        let downloader = FileDownloader::new(
            config.download.save_directory.clone(),
            config.api.user_agent.clone(),
        );
        Ok(Self {
            config,
            api,
            downloader,
            events,
            cancel,
            state: RunState::Idle,
            tracker: ProgressTracker::new(),
        })
    }

    /// Applies `retry_policy` to both API requests and file transfers.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.api = self.api.with_retry_policy(retry_policy.clone());
        self.downloader = self.downloader.with_retry_policy(retry_policy);
        self
    }

    /// Overrides the search page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.api = self.api.with_page_size(page_size);
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Whether either HTTP transport is still open.
    #[must_use]
    pub fn has_open_transports(&self) -> bool {
        self.api.is_open() || self.downloader.is_open()
    }

    /// Runs the worker on a tokio task.
    #[must_use]
    pub fn spawn(mut self) -> JoinHandle<RunOutcome> {
        tokio::spawn(async move { self.run().await })
    }

    /// Executes the run to a terminal state.
    ///
    /// A second call returns [`RunOutcome::Aborted`] without doing any work.
    #[instrument(skip(self), fields(tags = %self.config.download.tags))]
    pub async fn run(&mut self) -> RunOutcome {
        if self.state != RunState::Idle {
            return RunOutcome::Aborted(format!("run already finished ({})", self.state));
        }

        let result = self.execute().await;
        self.api.close();
        self.downloader.close();

        match result {
            Ok(outcome) => outcome,
            Err(error) => self.abort(error.to_string()),
        }
    }

    async fn execute(&mut self) -> Result<RunOutcome, OrchestratorError> {
        self.transition(RunState::Authenticating);
        match self.api.verify_login().await {
            Ok(true) => self.log("Login successful"),
            Ok(false) => return Ok(self.abort(LOGIN_FAILED)),
            Err(error) => return Ok(self.abort(format!("API unreachable: {error}"))),
        }
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(None, 0));
        }

        self.transition(RunState::Fetching);
        let report = self.api.fetch_all(&self.config.search_query()).await;
        self.log_fetch_report(&report);
        if report.items.is_empty() {
            return Ok(self.complete(report.end, 0));
        }
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(Some(report.end), 0));
        }

        self.transition(RunState::Building);
        let task_list = self.build_tasks(&report.items);
        self.tracker.add_total(task_list.tasks.len());
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(Some(report.end), task_list.skipped));
        }

        self.transition(RunState::Downloading);
        self.download_all(&task_list.tasks).await?;
        let unfinished = self.tracker.completed() + self.tracker.failed() < self.tracker.total();
        if unfinished && self.cancel.is_cancelled() {
            return Ok(self.cancelled(Some(report.end), task_list.skipped));
        }

        Ok(self.complete(report.end, task_list.skipped))
    }

    fn build_tasks(&self, items: &[Item]) -> TaskList {
        let mut tasks = Vec::with_capacity(items.len());
        let mut skipped = 0;
        for item in items {
            match DownloadTask::from_item(item) {
                Ok(task) => tasks.push(task),
                Err(reason) => {
                    skipped += 1;
                    warn!(item_id = item.id, %reason, "skipping item");
                    self.emit(RunEvent::Log(format!("Skipping item {}: {reason}", item.id)));
                }
            }
        }
        self.log(format!(
            "Built {} download tasks ({skipped} skipped)",
            tasks.len()
        ));
        TaskList { tasks, skipped }
    }

    /// Works through `tasks`, stopping early when cancellation is requested.
    async fn download_all(&mut self, tasks: &[DownloadTask]) -> Result<(), OrchestratorError> {
        self.tracker.start();
        self.emit(RunEvent::Progress(self.tracker.snapshot()));
        let delay = self.config.api.inter_request_delay;

        for (index, task) in tasks.iter().enumerate() {
            if self.cancel.is_cancelled() {
                debug!(index, "cancellation observed before task");
                return Ok(());
            }

            let success = self.downloader.download(task).await?;
            self.tracker.record_outcome(success);
            if success {
                info!(item_id = task.item_id, filename = %task.filename, "task completed");
                self.emit(RunEvent::Log(format!("Downloaded {}", task.filename)));
            } else {
                warn!(item_id = task.item_id, url = %task.url, "task failed");
                self.emit(RunEvent::Log(format!("Failed to download {}", task.url)));
            }
            self.emit(RunEvent::Progress(self.tracker.snapshot()));

            let is_last = index + 1 == tasks.len();
            if !is_last && !self.cancel.is_cancelled() {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    fn log_fetch_report(&self, report: &FetchReport) {
        if let FetchEnd::PageFailed { page, reason } = &report.end {
            warn!(page, %reason, fetched = report.items.len(), "search stopped early");
            self.emit(RunEvent::Log(format!(
                "Warning: page {page} could not be fetched ({reason}); continuing with {} items",
                report.items.len()
            )));
        }
        self.log(format!(
            "Found {} items ({}, {} pages)",
            report.items.len(),
            report.end,
            report.pages_requested
        ));
    }

    fn summary(&self, fetch_end: Option<FetchEnd>, skipped_items: usize) -> RunSummary {
        RunSummary {
            completed: self.tracker.completed(),
            failed: self.tracker.failed(),
            total: self.tracker.total(),
            skipped_items,
            fetch_end,
        }
    }

    fn complete(&mut self, fetch_end: FetchEnd, skipped_items: usize) -> RunOutcome {
        let summary = self.summary(Some(fetch_end), skipped_items);
        self.transition(RunState::Completed);
        self.log(format!("Download complete: {summary}"));
        self.emit(RunEvent::Completed(summary.clone()));
        RunOutcome::Completed(summary)
    }

    fn cancelled(&mut self, fetch_end: Option<FetchEnd>, skipped_items: usize) -> RunOutcome {
        let summary = self.summary(fetch_end, skipped_items);
        self.transition(RunState::Cancelled);
        self.log(format!("Download cancelled: {summary}"));
        self.emit(RunEvent::Progress(self.tracker.snapshot()));
        RunOutcome::Cancelled(summary)
    }

    fn abort(&mut self, reason: impl Into<String>) -> RunOutcome {
        let reason = reason.into();
        warn!(%reason, state = %self.state, "run aborted");
        self.transition(RunState::Aborted);
        self.emit(RunEvent::Error(reason.clone()));
        RunOutcome::Aborted(reason)
    }

    fn transition(&mut self, next: RunState) {
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "unexpected state transition");
        }
        info!(from = %self.state, to = %next, "state transition");
        self.state = next;
        self.emit(RunEvent::Log(format!("State: {next}")));
    }

    fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.emit(RunEvent::Log(message));
    }

    /// Sends an event; a dropped receiver is ignored.
    fn emit(&self, event: RunEvent) {
        let _ = self.events.send(event);
    }
}
