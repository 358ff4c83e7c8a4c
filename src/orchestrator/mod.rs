//! Run lifecycle: authenticate, fetch, build tasks, download.
//!
//! An [`Orchestrator`] is built from a validated [`RunConfig`](crate::config::RunConfig),
//! reports through an unbounded channel of [`RunEvent`]s and stops early when
//! its [`CancellationToken`] is set.
//!
//! # Example
//!
//! ```no_run
//! use tag_downloader::config::PartialConfig;
//! use tag_downloader::orchestrator::{CancellationToken, Orchestrator, RunEvent};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PartialConfig::from_file("config.json".as_ref())?.resolve()?;
//! let (events, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let handle = Orchestrator::new(config, events, CancellationToken::new())?.spawn();
//! while let Some(event) = rx.recv().await {
//!     if let RunEvent::Log(line) = event {
//!         println!("{line}");
//!     }
//! }
//! let outcome = handle.await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

mod cancel;
mod error;
mod run;
mod state;

pub use cancel::CancellationToken;
pub use error::OrchestratorError;
pub use run::{LOGIN_FAILED, Orchestrator};
pub use state::{RunEvent, RunOutcome, RunState, RunSummary};
