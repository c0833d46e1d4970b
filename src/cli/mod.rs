//! Command line interface.

mod args;
pub mod commands;
mod output;
mod retry_config;

pub use args::{Args, Command, parse_timeout};
pub use commands::execute_command;
pub use output::{OutputManager, format_duration};
pub use retry_config::RetryConfig;

use crate::EnvConfig;
use crate::error::{ReleaseError, Result};

/// Main CLI entry point.
///
/// `--help` and `--version` print and succeed; any other parse failure is
/// returned as [`ReleaseError::Usage`] so the caller reports it.
pub async fn run(env: EnvConfig) -> Result<()> {
    let args = match Args::try_parse_args() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => {
            e.print()?;
            return Ok(());
        }
        Err(e) => return Err(ReleaseError::Usage(e)),
    };
    execute_command(args, env).await
}
