//! Archive phase: package each build's artifact into a tar.gz.

use async_trait::async_trait;
use flate2::{Compression, write::GzEncoder};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::build::BuildHandler;
use super::core::Core;
use crate::config::BuildConfig;
use crate::error::{CliError, ConfigError, ReleaseError, Result};
use crate::pipeline::{CommandHandler, RunContext};

/// Packages every build output plus the configured extra files
pub struct ArchiveHandler {
    core: Arc<Core>,
    builds: Vec<BuildConfig>,
    extra_files: Vec<PathBuf>,
}

impl ArchiveHandler {
    /// New, uninitialized archive phase
    pub fn new(core: Arc<Core>) -> Self {
        Self {
            core,
            builds: Vec::new(),
            extra_files: Vec::new(),
        }
    }

    async fn archive_build(
        &self,
        build: &BuildConfig,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let file_name = build
            .artifact
            .file_name()
            .ok_or_else(|| ConfigError::InvalidArtifactPath {
                path: build.artifact.clone(),
            })?
            .to_owned();
        let built = BuildHandler::output_dir(&self.core, build).join(&file_name);
        if !tokio::fs::try_exists(&built).await? {
            return Err(ReleaseError::Cli(CliError::ExecutionFailed {
                command: "archive".to_string(),
                reason: format!(
                    "artifact {} not found; run the build phase first",
                    built.display()
                ),
            }));
        }

        let archives_dir = self.core.archives_dir();
        tokio::fs::create_dir_all(&archives_dir).await?;
        let dest = archives_dir.join(self.core.archive_name(&build.name));

        let mut entries = vec![(built, PathBuf::from(file_name))];
        for extra in &self.extra_files {
            if let Some(name) = extra.file_name() {
                entries.push((extra.clone(), PathBuf::from(name)));
            }
        }

        write_tar_gz(dest.clone(), entries, cancel.clone()).await?;
        Ok(dest)
    }
}

/// Write `(source, name in archive)` pairs into a gzip-compressed tarball at `dest`.
///
/// The tarball is staged in a hidden `.partial` file next to `dest` and
/// renamed onto it only once complete; on failure or cancellation the staged
/// file is removed and `dest` is left untouched.
async fn write_tar_gz(
    dest: PathBuf,
    entries: Vec<(PathBuf, PathBuf)>,
    cancel: CancellationToken,
) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let staged = tempfile::Builder::new()
            .prefix(".")
            .suffix(".partial")
            .tempfile_in(dir)?;

        let enc = GzEncoder::new(staged, Compression::default());
        let mut tar = tar::Builder::new(enc);
        tar.mode(tar::HeaderMode::Deterministic);

        for (source, name) in &entries {
            if cancel.is_cancelled() {
                return Err(ReleaseError::Cancelled);
            }
            tar.append_path_with_name(source, name)?;
        }

        let enc = tar.into_inner()?;
        let mut staged = enc.finish()?;
        staged.flush()?;
        staged.as_file().sync_all()?;

        if cancel.is_cancelled() {
            return Err(ReleaseError::Cancelled);
        }
        staged.persist(&dest).map_err(|e| ReleaseError::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(join_error)?
}

fn join_error(e: tokio::task::JoinError) -> ReleaseError {
    if e.is_panic() {
        ReleaseError::Panic {
            message: crate::fault::panic_message(e.into_panic().as_ref()),
            backtrace: String::new(),
        }
    } else {
        ReleaseError::Cancelled
    }
}

fn missing_extra_file(path: &Path) -> ReleaseError {
    ConfigError::Invalid {
        reason: format!("archive extra file {} does not exist", path.display()),
    }
    .into()
}

#[async_trait]
impl CommandHandler for ArchiveHandler {
    fn name(&self) -> &str {
        "archive"
    }

    fn init(&mut self) -> Result<()> {
        self.builds = self.core.project.require_builds()?.to_vec();
        self.extra_files = self
            .core
            .project
            .archive
            .extra_files
            .iter()
            .map(|p| self.core.project.resolve(p))
            .collect();

        if let Some(missing) = self.extra_files.iter().find(|p| !p.is_file()) {
            return Err(missing_extra_file(missing));
        }
        Ok(())
    }

    async fn exec(&mut self, ctx: &RunContext, _args: &[String]) -> Result<()> {
        let output = &self.core.output;
        output.section(&format!("Archive {}", self.core.tag));

        for build in &self.builds {
            ctx.check()?;
            if self.core.try_mode {
                output.indent(&format!("would write {}", self.core.archive_name(&build.name)));
                continue;
            }

            let dest = self.archive_build(build, ctx.token()).await?;
            output.success(&format!("Archived {}", dest.display()));
        }

        Ok(())
    }
}
