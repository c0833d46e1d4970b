//! GitHub REST client for releases and release assets.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::asset::AssetFile;
use super::classify::{FailureClass, classify_status};
use super::client::ReleaseId;
use crate::config::ReleaseSettings;
use crate::error::{CliError, ConfigError, ReleaseError, RemoteError, Result};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Live GitHub client
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    uploads_base: String,
}

/// Body of `POST /repos/{owner}/{repo}/releases`
#[derive(Debug, Serialize)]
struct CreateReleaseRequest<'a> {
    tag_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_commitish: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    draft: bool,
    prerelease: bool,
    generate_release_notes: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedRelease {
    id: u64,
}

impl GitHubClient {
    /// Public GitHub API
    pub const API_BASE: &'static str = "https://api.github.com";

    /// Public GitHub upload host
    pub const UPLOADS_BASE: &'static str = "https://uploads.github.com";

    /// Create a client for the public GitHub service
    pub fn new(token: String) -> Result<Self> {
        Self::with_base_urls(token, Self::API_BASE, Self::UPLOADS_BASE)
    }

    /// Create a client against custom API and upload hosts (GitHub Enterprise, tests)
    pub fn with_base_urls(token: String, api_base: &str, uploads_base: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ConfigError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ReleaseError::Cli(CliError::ExecutionFailed {
                    command: "github_client_init".to_string(),
                    reason: e.to_string(),
                })
            })?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            uploads_base: uploads_base.trim_end_matches('/').to_string(),
        })
    }

    /// Create a release. Anything but `201 Created` is a fatal error.
    pub async fn create_release(
        &self,
        tag: &str,
        committish: &str,
        settings: &ReleaseSettings,
    ) -> Result<ReleaseId> {
        let body = match &settings.release_notes_file {
            Some(path) => Some(tokio::fs::read_to_string(path).await.map_err(|source| {
                ConfigError::ReleaseNotes {
                    path: path.clone(),
                    source,
                }
            })?),
            None => None,
        };

        let request = CreateReleaseRequest {
            tag_name: tag,
            target_commitish: non_empty(committish),
            name: non_empty(&settings.name),
            body: body.as_deref().and_then(non_empty),
            draft: settings.draft,
            prerelease: settings.prerelease,
            generate_release_notes: settings.generate_release_notes,
        };

        let url = format!(
            "{}/repos/{}/{}/releases",
            self.api_base, settings.repository_owner, settings.repository
        );
        log::debug!("creating release {tag} at {url}");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                operation: "create release",
                source,
            })?;

        if response.status() != StatusCode::CREATED {
            return Err(unexpected_status("create release", response).await.into());
        }

        let created: CreatedRelease =
            response
                .json()
                .await
                .map_err(|source| RemoteError::Transport {
                    operation: "create release",
                    source,
                })?;

        log::info!("created release {tag} with id {}", created.id);
        Ok(ReleaseId::Live(created.id))
    }

    /// Upload an asset under its base file name.
    ///
    /// Failures the classifier deems retryable, and failures without any
    /// response, are returned as [`RemoteError::Temporary`].
    pub async fn upload_asset(
        &self,
        settings: &ReleaseSettings,
        asset: Option<AssetFile>,
        release_id: ReleaseId,
    ) -> Result<()> {
        let ReleaseId::Live(id) = release_id else {
            return Err(RemoteError::ReleaseIdMismatch {
                expected: "a live release id".to_string(),
                actual: release_id.to_string(),
            }
            .into());
        };
        let asset = asset.ok_or(RemoteError::MissingAsset)?;

        let url = format!(
            "{}/repos/{}/{}/releases/{id}/assets",
            self.uploads_base, settings.repository_owner, settings.repository
        );
        let name = asset.name().to_string();
        let len = asset.len();
        log::debug!("uploading {name} ({len} bytes) to release {id}");

        let response = self
            .http
            .post(&url)
            .query(&[("name", name.as_str())])
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, len)
            .body(asset.into_body())
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(source) => {
                return Err(RemoteError::Transport {
                    operation: "upload asset",
                    source,
                }
                .temporary()
                .into());
            }
        };

        let status = response.status();
        if status.is_success() {
            log::info!("uploaded {name} to release {id}");
            return Ok(());
        }

        let err = unexpected_status("upload asset", response).await;
        match classify_status(status) {
            FailureClass::Retryable => Err(err.temporary().into()),
            FailureClass::Fatal => Err(err.into()),
        }
    }
}

async fn unexpected_status(operation: &'static str, response: Response) -> RemoteError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    RemoteError::UnexpectedStatus {
        operation,
        status,
        body,
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}
