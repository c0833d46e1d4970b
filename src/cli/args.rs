//! Command line argument parsing and validation.
//!
//! Every global flag can also be set through a `KODEGEN_RELEASE_*`
//! environment variable; an explicit flag wins.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::DEFAULT_CONFIG_FILE;

/// Build, archive and publish a release
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_release_pipeline",
    version,
    about = "Build, archive and publish a release",
    long_about = "Build, archive and publish release artifacts to GitHub.

Usage:
  kodegen_release_pipeline build   --tag v1.2.3
  kodegen_release_pipeline archive --tag v1.2.3
  kodegen_release_pipeline release --tag v1.2.3
  kodegen_release_pipeline all     --tag v1.2.3 --try"
)]
pub struct Args {
    /// Phase to run
    #[command(subcommand)]
    pub command: Command,

    /// Project file
    #[arg(long, global = true, env = "KODEGEN_RELEASE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Release tag, e.g. v1.2.3
    #[arg(long, global = true, env = "KODEGEN_RELEASE_TAG")]
    pub tag: Option<String>,

    /// Commit, branch or SHA the tag is created from (service default when empty)
    #[arg(long, global = true, env = "KODEGEN_RELEASE_COMMITISH", default_value = "")]
    pub commitish: String,

    /// Output directory for builds and archives
    #[arg(long, global = true, env = "KODEGEN_RELEASE_DIST", default_value = "dist")]
    pub dist: PathBuf,

    /// Time budget for the whole run: `90`, `90s`, `55m`, `2h`
    #[arg(
        long,
        global = true,
        env = "KODEGEN_RELEASE_TIMEOUT",
        default_value = "55m",
        value_parser = parse_timeout
    )]
    pub timeout: Duration,

    /// Dry run: no builds, no archives written, no network
    #[arg(long = "try", global = true, env = "KODEGEN_RELEASE_TRY")]
    pub try_mode: bool,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Pipeline phases
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the configured build commands and collect their artifacts
    Build {
        /// Extra arguments appended to every build command
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Package built artifacts into tar.gz archives
    Archive,
    /// Create the release and upload the archives
    Release,
    /// Run build, archive and release in sequence
    All {
        /// Extra arguments appended to every build command
        #[arg(last = true)]
        args: Vec<String>,
    },
}

impl Command {
    /// Command name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build { .. } => "build",
            Command::Archive => "archive",
            Command::Release => "release",
            Command::All { .. } => "all",
        }
    }

    /// Pass-through arguments
    pub fn extra_args(&self) -> &[String] {
        match self {
            Command::Build { args } | Command::All { args } => args,
            Command::Archive | Command::Release => &[],
        }
    }
}

impl Args {
    /// Parse command line arguments without exiting the process on failure
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        let Some(tag) = self.tag.as_deref() else {
            return Err("--tag is required".to_string());
        };
        if tag.trim().is_empty() {
            return Err("--tag must not be empty".to_string());
        }
        if tag.contains('\\')
            || tag.contains("..")
            || tag.contains("//")
            || tag.starts_with('/')
            || tag.ends_with('/')
            || tag.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(format!("invalid tag '{tag}'"));
        }
        if self.timeout.is_zero() {
            return Err("--timeout must be greater than zero".to_string());
        }
        Ok(())
    }

    /// The validated tag
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or_default()
    }
}

/// Parse `90`, `90s`, `55m` or `2h` into a duration
pub fn parse_timeout(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (number, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{s}'"))?;
    let secs = match unit {
        "s" => value,
        "m" => value.saturating_mul(60),
        "h" => value.saturating_mul(3600),
        _ => return Err(format!("invalid duration unit in '{s}'; use s, m or h")),
    };
    Ok(Duration::from_secs(secs))
}
