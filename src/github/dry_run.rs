//! Release client that never touches the network.
//!
//! Lets the whole pipeline run end to end without a real token while still
//! checking that uploads are sequenced after the release they belong to.

use std::sync::atomic::{AtomicU64, Ordering};

use super::asset::AssetFile;
use super::client::ReleaseId;
use crate::config::ReleaseSettings;
use crate::error::{RemoteError, Result};

/// Dry-run release client
#[derive(Debug, Default)]
pub struct DryRunClient {
    /// Identifier fabricated by the last `create_release`; 0 until then
    release_id: AtomicU64,
}

impl DryRunClient {
    /// Create a client with no release yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Fabricate a release and remember its identifier
    pub fn create_release(
        &self,
        tag: &str,
        committish: &str,
        settings: &ReleaseSettings,
    ) -> Result<ReleaseId> {
        log::info!("dry-run: release: tag:{tag} committish:{committish} {settings:?}");
        let id = fabricate_id();
        self.release_id.store(id, Ordering::SeqCst);
        Ok(ReleaseId::DryRun(id))
    }

    /// Accept the upload if it targets the fabricated release and carries a file
    pub fn upload_asset(
        &self,
        _settings: &ReleaseSettings,
        asset: Option<AssetFile>,
        release_id: ReleaseId,
    ) -> Result<()> {
        let expected = self.release_id.load(Ordering::SeqCst);
        if expected == 0 || release_id != ReleaseId::DryRun(expected) {
            return Err(RemoteError::ReleaseIdMismatch {
                expected: ReleaseId::DryRun(expected).to_string(),
                actual: release_id.to_string(),
            }
            .into());
        }

        let asset = asset.ok_or(RemoteError::MissingAsset)?;
        log::info!("dry-run: upload {} ({} bytes) to release {release_id}", asset.name(), asset.len());
        Ok(())
    }
}

/// Random, non-zero, and positive when read as a signed 64-bit id
fn fabricate_id() -> u64 {
    let (high, _) = uuid::Uuid::new_v4().as_u64_pair();
    (high >> 1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;

    async fn some_asset(dir: &tempfile::TempDir) -> AssetFile {
        let path = dir.path().join("asset.tar.gz");
        std::fs::write(&path, b"data").unwrap();
        AssetFile::open(&path).await.unwrap()
    }

    #[test]
    fn fabricated_ids_are_non_zero() {
        for _ in 0..1000 {
            let id = fabricate_id();
            assert_ne!(id, 0);
            assert!(id <= i64::MAX as u64);
        }
    }

    #[tokio::test]
    async fn upload_with_created_id_and_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let client = DryRunClient::new();
        let settings = ReleaseSettings::default();
        let id = client.create_release("v1.0.0", "main", &settings).unwrap();
        assert!(matches!(id, ReleaseId::DryRun(n) if n != 0));

        client
            .upload_asset(&settings, Some(some_asset(&dir).await), id)
            .unwrap();
    }

    #[tokio::test]
    async fn upload_with_other_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let client = DryRunClient::new();
        let settings = ReleaseSettings::default();
        let ReleaseId::DryRun(x) = client.create_release("v1", "main", &settings).unwrap() else {
            panic!("dry-run client issued a live id");
        };

        for other in [ReleaseId::DryRun(x.wrapping_add(1)), ReleaseId::Live(x)] {
            let err = client
                .upload_asset(&settings, Some(some_asset(&dir).await), other)
                .unwrap_err();
            assert!(matches!(
                err,
                ReleaseError::Remote(RemoteError::ReleaseIdMismatch { .. })
            ));
        }
    }

    #[test]
    fn upload_without_file_fails() {
        let client = DryRunClient::new();
        let settings = ReleaseSettings::default();
        let id = client.create_release("v1", "main", &settings).unwrap();
        let err = client.upload_asset(&settings, None, id).unwrap_err();
        assert!(matches!(err, ReleaseError::Remote(RemoteError::MissingAsset)));
    }

    #[tokio::test]
    async fn upload_before_create_fails() {
        let dir = tempfile::tempdir().unwrap();
        let client = DryRunClient::new();
        let err = client
            .upload_asset(
                &ReleaseSettings::default(),
                Some(some_asset(&dir).await),
                ReleaseId::DryRun(1),
            )
            .unwrap_err();
        assert!(!err.is_temporary());
    }
}
