//! CLI entry point for the tag downloader.

use std::process::ExitCode;

use clap::Parser;

mod app;
mod cli;

use cli::Args;

/// How the process should exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every task succeeded, or there was nothing to do.
    Success,
    /// Some tasks failed, or the search stopped early.
    Partial,
    /// The run aborted, or every task failed.
    Failure,
    /// Stopped by Ctrl-C.
    Cancelled,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
            Self::Cancelled => 130,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    match app::run_downloader(args).await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}
