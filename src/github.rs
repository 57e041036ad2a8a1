//! HTTP client for the GitHub release asset endpoints.
//!
//! Wraps `reqwest::blocking::Client` for the three calls a publish run makes:
//! list the assets of a release, upload an asset, delete an asset. All methods
//! return `anyhow::Result` and translate HTTP errors into readable messages.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;

/// Default REST endpoint, used when `GITHUB_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("nightly-publish/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Largest page size the assets endpoint accepts.
const PER_PAGE: usize = 100;

/// Uploads can be large; give them more room than the metadata calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// An asset attached to a release.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub browser_download_url: Option<String>,
}

/// A new asset to attach to a release.
#[derive(Debug, Clone)]
pub struct AssetUpload<'a> {
    /// The release's `upload_url`, with or without its `{?name,label}` template.
    pub upload_url: &'a str,
    pub name: &'a str,
    pub content_type: &'a str,
    pub bytes: Vec<u8>,
}

/// The asset GitHub created for an upload.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadedAsset {
    #[serde(default)]
    pub id: u64,
    pub browser_download_url: String,
}

/// `owner/repo` pair identifying a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    /// Parse an `owner/repo` string. Both halves must be non-empty.
    pub fn parse(s: &str) -> Option<Self> {
        let (owner, repo) = s.trim().split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

// ---------------------------------------------------------------------------
// ReleaseStore
// ---------------------------------------------------------------------------

/// The remote operations a publish run depends on.
pub trait ReleaseStore {
    /// All assets attached to `release_id`, in whatever order the server returns.
    fn list_assets(&self, release_id: u64) -> Result<Vec<ReleaseAsset>>;

    fn upload_asset(&self, upload: &AssetUpload<'_>) -> Result<UploadedAsset>;

    fn delete_asset(&self, asset_id: u64) -> Result<()>;
}

// ---------------------------------------------------------------------------
// GitHubClient
// ---------------------------------------------------------------------------

/// Release asset client for one repository.
pub struct GitHubClient {
    client: reqwest::blocking::Client,
    api_url: String,
    repository: RepoSlug,
    token: String,
}

impl GitHubClient {
    /// Create a client for `repository`.
    ///
    /// `api_url` is trimmed and stripped of trailing slashes so endpoint paths
    /// can be appended directly.
    pub fn new(api_url: &str, repository: RepoSlug, token: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            repository,
            token,
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{path}",
            self.api_url, self.repository.owner, self.repository.repo
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::blocking::RequestBuilder {
        self.client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }
}

impl ReleaseStore for GitHubClient {
    fn list_assets(&self, release_id: u64) -> Result<Vec<ReleaseAsset>> {
        let url = self.repo_url(&format!("/releases/{release_id}/assets"));
        let mut assets = Vec::new();
        let mut page = 1usize;
        loop {
            let resp = self
                .request(reqwest::Method::GET, &url)
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .with_context(|| format!("failed to connect to GitHub API at {url}"))?;

            let body = map_http_error(resp)
                .with_context(|| format!("failed to list assets for release {release_id}"))?;
            let batch: Vec<ReleaseAsset> = serde_json::from_str(&body)
                .context("failed to parse release assets response")?;

            let last_page = batch.len() < PER_PAGE;
            assets.extend(batch);
            if last_page {
                return Ok(assets);
            }
            page += 1;
        }
    }

    fn upload_asset(&self, upload: &AssetUpload<'_>) -> Result<UploadedAsset> {
        let url = strip_url_template(upload.upload_url);
        let resp = self
            .request(reqwest::Method::POST, url)
            .query(&[("name", upload.name)])
            .header(reqwest::header::CONTENT_TYPE, upload.content_type)
            .header(reqwest::header::CONTENT_LENGTH, upload.bytes.len())
            .body(upload.bytes.clone())
            .send()
            .with_context(|| format!("failed to connect to upload endpoint at {url}"))?;

        let body = map_http_error(resp)
            .with_context(|| format!("failed to upload asset '{}'", upload.name))?;
        serde_json::from_str(&body).context("failed to parse upload response")
    }

    fn delete_asset(&self, asset_id: u64) -> Result<()> {
        let url = self.repo_url(&format!("/releases/assets/{asset_id}"));
        let resp = self
            .request(reqwest::Method::DELETE, &url)
            .send()
            .with_context(|| format!("failed to connect to GitHub API at {url}"))?;

        map_http_error(resp).with_context(|| format!("failed to delete asset {asset_id}"))?;
        Ok(())
    }
}

/// Drops the RFC 6570 `{?name,label}` suffix GitHub appends to `upload_url`.
pub fn strip_url_template(upload_url: &str) -> &str {
    let trimmed = upload_url.trim();
    match trimmed.find('{') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    }
}

// ---------------------------------------------------------------------------
// HTTP error mapping
// ---------------------------------------------------------------------------

/// Read a response body, or map a non-success status to an error message.
fn map_http_error(resp: reqwest::blocking::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    if status.is_success() {
        return Ok(body);
    }

    let detail = extract_error_message(&body);
    match status.as_u16() {
        401 => anyhow::bail!("Not authenticated: {detail}. Check GITHUB_TOKEN."),
        403 => anyhow::bail!("Forbidden: {detail}. The token may lack contents:write."),
        404 => anyhow::bail!("Not found: {detail}"),
        422 => anyhow::bail!("Validation failed: {detail}"),
        500..=599 => anyhow::bail!("Server error (HTTP {status}): {detail}"),
        _ => anyhow::bail!("Unexpected response (HTTP {status}): {detail}"),
    }
}

/// Pull the `message` field out of a GitHub error body, or fall back to the
/// raw body (truncated).
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(msg) = value.get("message").and_then(|m| m.as_str())
    {
        return msg.to_string();
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no details provided".to_string();
    }
    if trimmed.chars().count() > 200 {
        let head: String = trimmed.chars().take(200).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
