//! Release assets and the retrying upload around them.

use std::path::{Path, PathBuf};

use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use super::client::{ReleaseClient, ReleaseId};
use crate::cli::RetryConfig;
use crate::config::ReleaseSettings;
use crate::error::{ConfigError, Result};
use crate::retry::{AttemptFailure, retry_with_backoff};

/// An open artifact file ready to be uploaded.
///
/// Owning the handle means an upload consumes it; a new attempt has to open
/// the file again.
#[derive(Debug)]
pub struct AssetFile {
    path: PathBuf,
    name: String,
    len: u64,
    file: tokio::fs::File,
}

impl AssetFile {
    /// Open `path`; the remote-visible name is its base file name
    pub async fn open(path: &Path) -> Result<Self> {
        let name = asset_name(path)?;
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            len,
            file,
        })
    }

    /// Remote-visible asset name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local path the asset was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the file is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Turn the file into a streaming request body
    pub(crate) fn into_body(self) -> reqwest::Body {
        reqwest::Body::wrap_stream(ReaderStream::new(self.file))
    }
}

/// Base file name of an artifact path
pub(crate) fn asset_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ConfigError::InvalidArtifactPath {
                path: path.to_path_buf(),
            }
            .into()
        })
}

/// Upload the file at `path` to `release_id`, retrying temporary failures.
///
/// Every attempt opens the file afresh and drops the handle when the attempt
/// ends, whatever its outcome.
pub async fn upload_asset_with_retries(
    client: &ReleaseClient,
    settings: &ReleaseSettings,
    release_id: ReleaseId,
    path: &Path,
    retry: &RetryConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    let operation = format!("upload of {}", asset_name(path)?);

    retry_with_backoff(
        move || async move {
            let asset = AssetFile::open(path).await.map_err(AttemptFailure::fatal)?;
            client
                .upload_asset(settings, Some(asset), release_id)
                .await
                .map_err(AttemptFailure::from)
        },
        retry,
        &operation,
        cancel,
    )
    .await
}
