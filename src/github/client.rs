//! Client selection and the capability surface shared by both variants.

use std::fmt;

use super::asset::AssetFile;
use super::dry_run::DryRunClient;
use super::live::GitHubClient;
use crate::EnvConfig;
use crate::config::{ReleaseSettings, ServiceType};
use crate::error::{ConfigError, Result};

/// Handle to a created release.
///
/// Tagged with the variant that issued it, so an identifier fabricated by the
/// dry-run client can never be used against the live service, or the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseId {
    /// Issued by the release service
    Live(u64),
    /// Fabricated by the dry-run client
    DryRun(u64),
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseId::Live(id) => write!(f, "{id}"),
            ReleaseId::DryRun(id) => write!(f, "dry-run:{id}"),
        }
    }
}

/// Where the client gets its authority from
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A pre-issued access token for the live service
    Token(String),
    /// No network access at all
    DryRun,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::DryRun => f.write_str("DryRun"),
        }
    }
}

impl Credentials {
    /// Primary token variable
    pub const TOKEN_VAR: &'static str = "GITHUB_TOKEN";

    /// Token variable consulted when [`Self::TOKEN_VAR`] is unset
    pub const FALLBACK_TOKEN_VAR: &'static str = "GH_TOKEN";

    /// Token value that selects the dry-run client in integration tests
    pub const FAKE_TOKEN: &'static str = "faketoken";

    /// Test-only switch that makes [`Self::FAKE_TOKEN`] meaningful
    pub const ALLOW_FAKE_TOKEN_VAR: &'static str = "KODEGEN_RELEASE_ALLOW_FAKE_TOKEN";

    /// Resolve credentials from the environment snapshot.
    ///
    /// `try_mode` selects the dry-run client without looking for a token. The
    /// fake token only selects it when [`Self::ALLOW_FAKE_TOKEN_VAR`] is
    /// enabled; otherwise it is passed on as an ordinary token.
    pub fn resolve(env: &EnvConfig, try_mode: bool) -> Result<Self> {
        if try_mode {
            return Ok(Credentials::DryRun);
        }

        let token = env
            .get(Self::TOKEN_VAR)
            .or_else(|| env.get(Self::FALLBACK_TOKEN_VAR))
            .ok_or(ConfigError::MissingToken {
                var: Self::TOKEN_VAR,
            })?;

        if token == Self::FAKE_TOKEN && env.is_enabled(Self::ALLOW_FAKE_TOKEN_VAR) {
            log::warn!("fake token accepted; using the dry-run release client");
            return Ok(Credentials::DryRun);
        }

        Ok(Credentials::Token(token))
    }
}

/// Release publishing client
#[derive(Debug)]
pub enum ReleaseClient {
    /// Talks to the GitHub API
    GitHub(GitHubClient),
    /// Never touches the network
    DryRun(DryRunClient),
}

impl ReleaseClient {
    /// Select the client for `service` and `credentials`
    pub fn new(service: ServiceType, credentials: Credentials) -> Result<Self> {
        match (service, credentials) {
            (ServiceType::GitHub, Credentials::Token(token)) => {
                Ok(ReleaseClient::GitHub(GitHubClient::new(token)?))
            }
            (ServiceType::GitHub, Credentials::DryRun) => {
                Ok(ReleaseClient::DryRun(DryRunClient::new()))
            }
        }
    }

    /// Parse the declared service type, then resolve credentials and select the client.
    ///
    /// Fails before any network attempt when the service type is unsupported
    /// or no token is available.
    pub fn from_env(service: &str, env: &EnvConfig, try_mode: bool) -> Result<Self> {
        let service = ServiceType::parse(service)?;
        let credentials = Credentials::resolve(env, try_mode)?;
        Self::new(service, credentials)
    }

    /// Whether this client performs no network I/O
    pub fn is_dry_run(&self) -> bool {
        matches!(self, ReleaseClient::DryRun(_))
    }

    /// Create a release for `tag` at `committish`
    pub async fn create_release(
        &self,
        tag: &str,
        committish: &str,
        settings: &ReleaseSettings,
    ) -> Result<ReleaseId> {
        match self {
            ReleaseClient::GitHub(client) => client.create_release(tag, committish, settings).await,
            ReleaseClient::DryRun(client) => client.create_release(tag, committish, settings),
        }
    }

    /// Upload one asset to a release created by this client
    pub async fn upload_asset(
        &self,
        settings: &ReleaseSettings,
        asset: Option<AssetFile>,
        release_id: ReleaseId,
    ) -> Result<()> {
        match self {
            ReleaseClient::GitHub(client) => client.upload_asset(settings, asset, release_id).await,
            ReleaseClient::DryRun(client) => client.upload_asset(settings, asset, release_id),
        }
    }
}
