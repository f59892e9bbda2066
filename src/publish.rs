//! Upload files to a GitHub repository through the Contents API.
//!
//! One file is one `PUT /repos/{owner}/{repo}/contents/{path}` carrying the
//! base64 payload. Configuration problems are reported before any network
//! I/O. There is no retry: a failed upload surfaces as [`PublishError`].

use crate::naming::content_file_name;
use crate::repo_config::{RepoConfig, resolve_repo_name};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub const GITHUB_API: &str = "https://api.github.com";
pub const API_VERSION: &str = "2022-11-28";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const CLIENT_AGENT: &str = concat!("gridcrop/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
    #[error("Refusing to upload an empty file")]
    EmptyContent,
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("API base URL cannot carry a path: {0}")]
    InvalidApiBase(String),
}

/// Where a file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Concrete repository name, after range-pattern resolution.
    pub repo: String,
    /// Path inside the repository as reported by GitHub.
    pub path: String,
}

#[derive(Serialize)]
struct PutContents<'a> {
    message: String,
    content: String,
    branch: &'a str,
}

#[derive(Debug, Clone)]
pub struct Publisher {
    http: reqwest::Client,
    api_base: Url,
}

impl Publisher {
    pub fn new() -> Result<Self, PublishError> {
        Self::with_api_base(GITHUB_API)
    }

    /// Point at a different API host (GitHub Enterprise, or a test server).
    pub fn with_api_base(base: &str) -> Result<Self, PublishError> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_base: Url::parse(base)?,
        })
    }

    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> Result<Url, PublishError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| PublishError::InvalidApiBase(self.api_base.to_string()))?
            .pop_if_empty()
            .extend(["repos", owner, repo, "contents"])
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    /// Upload `bytes` to `remote_path`.
    ///
    /// The repo pattern is resolved once per call, so two uploads with
    /// `img[0-3]` may land in different repositories.
    pub async fn publish(
        &self,
        bytes: &[u8],
        remote_path: &str,
        config: &RepoConfig,
    ) -> Result<PublishOutcome, PublishError> {
        let owner = config.owner.trim();
        let repo = resolve_repo_name(&config.repo);
        if owner.is_empty() || repo.is_empty() {
            return Err(PublishError::MissingConfig(
                "owner and repo must be set".into(),
            ));
        }
        let token = config.token.trim();
        if token.is_empty() {
            return Err(PublishError::MissingConfig(
                "a GitHub token is required to upload".into(),
            ));
        }
        if bytes.is_empty() {
            return Err(PublishError::EmptyContent);
        }
        let path = remote_path.trim().trim_start_matches('/');
        if path.is_empty() {
            return Err(PublishError::MissingConfig("remote path is empty".into()));
        }

        let url = self.contents_url(owner, &repo, path)?;
        let body = PutContents {
            message: format!("upload {path}"),
            content: STANDARD.encode(bytes),
            branch: config.effective_branch(),
        };
        info!(%owner, %repo, %path, size = bytes.len(), "Uploading");

        let resp = self
            .http
            .put(url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, CLIENT_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(PublishError::Api {
                status: status.as_u16(),
                message: api_error_message(status, &text),
            });
        }

        let path = content_path(&text).unwrap_or_else(|| path.to_string());
        debug!(%repo, %path, "Upload accepted");
        Ok(PublishOutcome { repo, path })
    }

    /// Upload a local file as `<path_prefix>/<name>`.
    ///
    /// `name` defaults to the file's own name.
    pub async fn publish_file(
        &self,
        path: &Path,
        name: Option<&str>,
        config: &RepoConfig,
    ) -> Result<PublishOutcome, PublishError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| PublishError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        self.publish(&bytes, &config.remote_path(&name), config).await
    }

    /// Upload encoded images under content-addressed names, one at a time.
    ///
    /// `files` pairs a key (typically the item's display URL) with JPEG bytes.
    /// Returns key → jsDelivr URL. Stops at the first failure.
    pub async fn publish_batch(
        &self,
        files: Vec<(String, Vec<u8>)>,
        config: &RepoConfig,
    ) -> Result<HashMap<String, String>, PublishError> {
        let mut urls = HashMap::with_capacity(files.len());
        for (key, bytes) in files {
            let remote = config.remote_path(&content_file_name(&bytes, "jpg"));
            let outcome = self.publish(&bytes, &remote, config).await?;
            let cdn = config
                .jsdelivr_url_for_repo(&outcome.repo, &outcome.path)
                .ok_or_else(|| PublishError::MissingConfig("owner must be set".into()))?;
            urls.insert(key, cdn);
        }
        Ok(urls)
    }
}

/// Human-readable reason for a failed upload.
///
/// Prefers the API's `message`, then the canonical status reason.
pub fn api_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(str::to_string))
        .filter(|m| !m.is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("upload failed {}", status.as_u16()))
}

fn content_path(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("content")?.get("path")?.as_str().map(str::to_string)
}
