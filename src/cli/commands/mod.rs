//! Phase handlers and command dispatch.
//!
//! Each subcommand maps to an ordered [`Pipeline`] of phase handlers that
//! share one read-only [`Core`].

mod archive;
mod build;
mod core;
mod release;

pub use archive::ArchiveHandler;
pub use build::BuildHandler;
pub use core::Core;
pub use release::{ReleaseHandler, collect_archives};

use std::sync::Arc;

use crate::EnvConfig;
use crate::cli::{Args, Command};
use crate::config::ProjectConfig;
use crate::error::{CliError, Result};
use crate::pipeline::{Pipeline, RunContext};

/// Handlers for `command`, in run order
pub fn build_pipeline(command: &Command, core: Arc<Core>) -> Pipeline {
    match command {
        Command::Build { .. } => Pipeline::new().with(BuildHandler::new(core)),
        Command::Archive => Pipeline::new().with(ArchiveHandler::new(core)),
        Command::Release => Pipeline::new().with(ReleaseHandler::new(core)),
        Command::All { .. } => Pipeline::new()
            .with(BuildHandler::new(core.clone()))
            .with(ArchiveHandler::new(core.clone()))
            .with(ReleaseHandler::new(core)),
    }
}

/// Validate arguments, load the project and run the selected pipeline.
///
/// The run is bounded by `--timeout`; Ctrl-C cancels it.
pub async fn execute_command(args: Args, env: EnvConfig) -> Result<()> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let project = ProjectConfig::load(&args.config)?;
    let core = Arc::new(Core::new(&args, project, env));
    let mut pipeline = build_pipeline(&args.command, core);
    log::debug!("{} runs {:?}", args.command.name(), pipeline.names());

    let ctx = RunContext::new();
    let watcher = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("interrupted; cancelling");
                ctx.cancel();
            }
        })
    };

    let result = pipeline
        .run_with_timeout(&ctx, args.command.extra_args(), args.timeout)
        .await;
    watcher.abort();
    result
}
