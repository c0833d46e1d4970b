//! Release phase: create the release and upload every archive.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::core::Core;
use crate::config::ReleaseSettings;
use crate::error::{CliError, ReleaseError, Result};
use crate::github::{ReleaseClient, upload_asset_with_retries};
use crate::pipeline::{CommandHandler, RunContext};

/// Publishes the archives as a release
pub struct ReleaseHandler {
    core: Arc<Core>,
    client: Option<ReleaseClient>,
    settings: ReleaseSettings,
}

impl ReleaseHandler {
    /// New, uninitialized release phase
    pub fn new(core: Arc<Core>) -> Self {
        Self {
            core,
            client: None,
            settings: ReleaseSettings::default(),
        }
    }

    /// Use `client` instead of selecting one from the environment at init
    pub fn with_client(mut self, client: ReleaseClient) -> Self {
        self.client = Some(client);
        self
    }
}

/// Archives in `dir`, sorted by file name
pub fn collect_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    let dir_str = dir.to_str().ok_or_else(|| {
        ReleaseError::Cli(CliError::InvalidArguments {
            reason: format!("archive directory {} is not valid UTF-8", dir.display()),
        })
    })?;
    let pattern = format!("{}/*.tar.gz", glob::Pattern::escape(dir_str));

    let mut archives = glob::glob(&pattern)
        .map_err(|e| {
            ReleaseError::Cli(CliError::InvalidArguments {
                reason: e.to_string(),
            })
        })?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    archives.sort();
    Ok(archives)
}

#[async_trait]
impl CommandHandler for ReleaseHandler {
    fn name(&self) -> &str {
        "release"
    }

    fn init(&mut self) -> Result<()> {
        let release = self.core.project.require_release()?;
        self.settings = release
            .settings
            .for_tag(&self.core.tag, &self.core.project.root);

        if self.client.is_none() {
            self.client = Some(ReleaseClient::from_env(
                &release.service,
                &self.core.env,
                self.core.try_mode,
            )?);
        }
        Ok(())
    }

    async fn exec(&mut self, ctx: &RunContext, _args: &[String]) -> Result<()> {
        let core = &self.core;
        let client = self.client.as_ref().ok_or_else(|| {
            ReleaseError::Cli(CliError::ExecutionFailed {
                command: "release".to_string(),
                reason: "release phase executed before it was initialized".to_string(),
            })
        })?;

        core.output.section(&format!("Release {}", core.tag));

        if client.is_dry_run() {
            core.output.warn("dry run: nothing is published");
        }

        let archives = collect_archives(&core.archives_dir())?;
        if archives.is_empty() {
            if !core.try_mode {
                return Err(ReleaseError::Cli(CliError::ExecutionFailed {
                    command: "release".to_string(),
                    reason: format!(
                        "no archives found in {}; run the archive phase first",
                        core.archives_dir().display()
                    ),
                }));
            }
            core.output.warn(&format!(
                "no archives in {}; skipping uploads",
                core.archives_dir().display()
            ));
        }

        ctx.check()?;
        let release_id = tokio::select! {
            _ = ctx.cancelled() => return Err(ReleaseError::Cancelled),
            id = client.create_release(&core.tag, &core.commitish, &self.settings) => id?,
        };
        core.output.success(&format!(
            "Created release {} ({}/{})",
            core.tag, self.settings.repository_owner, self.settings.repository
        ));

        for archive in &archives {
            upload_asset_with_retries(
                client,
                &self.settings,
                release_id,
                archive,
                &core.retry,
                ctx.token(),
            )
            .await?;
            if let Some(name) = archive.file_name() {
                core.output.indent(&format!("✓ Uploaded {}", name.to_string_lossy()));
            }
        }

        core.output.success(&format!("Published {} asset(s)", archives.len()));
        Ok(())
    }
}
