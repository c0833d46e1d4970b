//! Build phase: run the configured build commands and collect artifacts.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use super::core::Core;
use crate::config::BuildConfig;
use crate::error::{CliError, ConfigError, ReleaseError, Result};
use crate::pipeline::{CommandHandler, RunContext};

/// Runs every build and copies its artifact under the builds directory
pub struct BuildHandler {
    core: Arc<Core>,
    builds: Vec<BuildConfig>,
}

impl BuildHandler {
    /// New, uninitialized build phase
    pub fn new(core: Arc<Core>) -> Self {
        Self {
            core,
            builds: Vec::new(),
        }
    }

    /// Directory the artifact of `build` is collected into
    pub fn output_dir(core: &Core, build: &BuildConfig) -> PathBuf {
        core.builds_dir().join(&build.name)
    }

    /// Make sure the program of a build command can be found
    fn locate_program(&self, build: &BuildConfig) -> Result<PathBuf> {
        let program = Path::new(&build.command[0]);
        if program.components().count() > 1 {
            let resolved = self.core.project.resolve(program);
            if resolved.is_file() {
                return Ok(resolved);
            }
            return Err(program_not_found(build, &resolved.display().to_string()));
        }

        which::which(program).map_err(|e| program_not_found(build, &e.to_string()))
    }

    async fn run_build(&self, ctx: &RunContext, build: &BuildConfig, args: &[String]) -> Result<()> {
        let program = self.locate_program(build)?;
        let mut command = tokio::process::Command::new(&program);
        command
            .args(&build.command[1..])
            .args(args)
            .envs(&build.env)
            .current_dir(&self.core.project.root)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        log::debug!("running {:?}", command);

        let mut child = command.spawn().map_err(|e| {
            ReleaseError::Cli(CliError::ExecutionFailed {
                command: build.command.join(" "),
                reason: e.to_string(),
            })
        })?;

        let status = tokio::select! {
            _ = ctx.cancelled() => return Err(ReleaseError::Cancelled),
            status = child.wait() => status?,
        };

        if !status.success() {
            return Err(ReleaseError::Cli(CliError::ExecutionFailed {
                command: build.command.join(" "),
                reason: format!("build '{}' exited with {status}", build.name),
            }));
        }

        let artifact = self.core.project.resolve(&build.artifact);
        let file_name = artifact.file_name().ok_or_else(|| ConfigError::InvalidArtifactPath {
            path: artifact.clone(),
        })?;
        let out_dir = Self::output_dir(&self.core, build);
        tokio::fs::create_dir_all(&out_dir).await?;
        tokio::fs::copy(&artifact, out_dir.join(file_name))
            .await
            .map_err(|e| {
                ReleaseError::Cli(CliError::ExecutionFailed {
                    command: format!("collect {}", artifact.display()),
                    reason: e.to_string(),
                })
            })?;

        Ok(())
    }
}

fn program_not_found(build: &BuildConfig, reason: &str) -> ReleaseError {
    ConfigError::Invalid {
        reason: format!(
            "build '{}': cannot find program '{}': {reason}",
            build.name, build.command[0]
        ),
    }
    .into()
}

#[async_trait]
impl CommandHandler for BuildHandler {
    fn name(&self) -> &str {
        "build"
    }

    fn init(&mut self) -> Result<()> {
        self.builds = self.core.project.require_builds()?.to_vec();
        for build in &self.builds {
            self.locate_program(build)?;
        }
        Ok(())
    }

    async fn exec(&mut self, ctx: &RunContext, args: &[String]) -> Result<()> {
        let output = &self.core.output;
        output.section(&format!("Build {}", self.core.tag));

        for build in &self.builds {
            ctx.check()?;
            if self.core.try_mode {
                output.indent(&format!("would run {}: {}", build.name, build.command.join(" ")));
                continue;
            }

            output.info(&format!("Building {}", build.name));
            self.run_build(ctx, build, args).await?;
            output.success(&format!("Built {}", build.name));
        }

        Ok(())
    }
}
