//! Read-only state shared by all phases of one invocation.

use std::path::PathBuf;

use crate::EnvConfig;
use crate::cli::{Args, OutputManager, RetryConfig};
use crate::config::ProjectConfig;

/// Shared, immutable phase context
#[derive(Debug)]
pub struct Core {
    /// Loaded project file
    pub project: ProjectConfig,
    /// Release tag
    pub tag: String,
    /// Commit the release tag points at; empty for the service default
    pub commitish: String,
    /// Root output directory
    pub dist: PathBuf,
    /// Dry run
    pub try_mode: bool,
    /// Environment snapshot
    pub env: EnvConfig,
    /// Retry policy for uploads
    pub retry: RetryConfig,
    /// Terminal output
    pub output: OutputManager,
}

impl Core {
    /// Assemble the context from validated arguments
    pub fn new(args: &Args, project: ProjectConfig, env: EnvConfig) -> Self {
        let retry = RetryConfig::from_env(&env);
        Self {
            project,
            tag: args.tag().to_string(),
            commitish: args.commitish.clone(),
            dist: args.dist.clone(),
            try_mode: args.try_mode,
            env,
            retry,
            output: OutputManager::new(args.quiet),
        }
    }

    /// The tag as a single path component: `release/v1` becomes `release-v1`
    pub fn tag_component(&self) -> String {
        self.tag.replace('/', "-")
    }

    /// `{dist}/{project}/{tag}`
    pub fn release_dir(&self) -> PathBuf {
        self.dist.join(&self.project.project).join(self.tag_component())
    }

    /// Where build artifacts are collected, one subdirectory per build
    pub fn builds_dir(&self) -> PathBuf {
        self.release_dir().join("builds")
    }

    /// Where archives are written
    pub fn archives_dir(&self) -> PathBuf {
        self.release_dir().join("archives")
    }

    /// Archive file name for build `name`
    pub fn archive_name(&self, build_name: &str) -> String {
        format!(
            "{}_{}_{}.tar.gz",
            self.project.project,
            self.tag_component(),
            build_name
        )
    }
}
