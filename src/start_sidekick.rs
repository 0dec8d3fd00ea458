//! Startup for the `sidekick` binary: logging, configuration, store, dispatch.

use std::process::ExitCode;

use clap::Parser;

use crate::backend::{HttpLibraryService, HttpQueryService};
use crate::cli::{self, Cli};
use crate::common::clock::SystemClock;
use crate::common::config::SidekickConfig;
use crate::common::errors::SidekickResult;
use crate::conversations::{ConversationStore, NamePolicy};
use crate::storage;

/// Parse arguments, run one command and report the outcome.
///
/// # Returns
/// `ExitCode::SUCCESS` when the command completes, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run_cli(cli) {
        Ok(output) => {
            if !output.is_empty() {
                #[allow(clippy::print_stdout)]
                {
                    println!("{output}");
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(1)
        }
    }
}

/// Install the global subscriber. Honors `RUST_LOG`, defaults to `info`, writes to stderr.
///
/// # Panics
/// Panics if a global subscriber is already installed.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_cli(cli: Cli) -> SidekickResult<String> {
    let mut config = SidekickConfig::from_env()?;
    if let Some(path) = cli.state {
        config.storage.path = path;
    }
    config.validate()?;
    tracing::debug!(?config, "Loaded configuration");

    let mut store = open_store(&config)?;
    let service = HttpQueryService::new(&config.backend)?;
    let library = HttpLibraryService::new(&config.backend)?;
    cli::execute(cli.command, &mut store, &service, &library)
}

/// Open the conversation store described by `config`.
///
/// # Errors
/// Returns an error if the storage backend cannot be opened or the naming policy is invalid.
pub fn open_store(config: &SidekickConfig) -> SidekickResult<ConversationStore> {
    let storage = storage::open_storage(&config.storage)?;
    let naming = NamePolicy::new(&config.naming)?;
    Ok(ConversationStore::open(storage, Box::new(SystemClock), naming))
}
