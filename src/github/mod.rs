//! Release publishing against GitHub.
//!
//! [`ReleaseClient`] is a closed set of two variants, the live
//! [`GitHubClient`] and the network-free [`DryRunClient`], selected once by
//! [`ReleaseClient::new`].

mod asset;
mod classify;
mod client;
mod dry_run;
mod live;

pub use asset::{AssetFile, upload_asset_with_retries};
pub use classify::{FailureClass, classify_status, is_temporary_status};
pub use client::{Credentials, ReleaseClient, ReleaseId};
pub use dry_run::DryRunClient;
pub use live::GitHubClient;
