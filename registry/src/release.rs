//! Release metadata lookup and asset download against a source-control host.
//!
//! Only `github.com` is currently supported (see [`crate::specifier`]); the
//! client talks to the GitHub REST API directly rather than depending on an
//! `octocrab`-style SDK, since the registry only needs two endpoints.

use crate::catalog::AssetHints;
use crate::error::{RegistryError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const API_BASE: &str = "https://api.github.com";
const MAX_RETRIES: u32 = 3;
const BASE_RETRY_DELAY_MS: u64 = 500;
const METADATA_TIMEOUT_SECS: u64 = 30;
const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DOWNLOAD_CHUNK_HINT: usize = 32 * 1024;

/// A single downloadable file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    #[serde(default)]
    pub content_type: String,
}

/// A resolved release: its tag and the assets attached to it.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseDescriptor {
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    pub assets: Vec<ReleaseAsset>,
}

/// Progress callback invoked as `(downloaded_bytes, total_bytes)`.
pub type ProgressFn<'a> = dyn FnMut(u64, u64) + Send + 'a;

/// Thin HTTP client over the release host.
pub struct ReleaseClient {
    metadata_client: reqwest::Client,
    download_client: reqwest::Client,
    token: Option<String>,
    max_retries: u32,
    api_base: String,
}

impl ReleaseClient {
    /// Build a client with the default metadata timeout and retry budget,
    /// reading `COSTFORGE_GITHUB_TOKEN` for authentication.
    ///
    /// If unset, attempts a best-effort fallback through the local `gh` CLI;
    /// failure there is silent and requests proceed unauthenticated.
    pub fn new() -> Result<Self> {
        Self::with_config(METADATA_TIMEOUT_SECS, MAX_RETRIES)
    }

    /// Build a client with a caller-supplied metadata timeout and retry
    /// budget, typically sourced from [`RegistryConfig`](crate) fields. The
    /// download timeout stays fixed, since it is sized for archive transfer
    /// rather than metadata round trips.
    pub fn with_config(metadata_timeout_secs: u64, max_retries: u32) -> Result<Self> {
        Self::with_base_url(API_BASE.to_string(), metadata_timeout_secs, max_retries)
    }

    /// Build a client against a custom API base URL (for testing against a
    /// local mock server).
    pub fn with_base_url(api_base: String, metadata_timeout_secs: u64, max_retries: u32) -> Result<Self> {
        let token = std::env::var("COSTFORGE_GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(token_from_gh_cli);

        let metadata_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(metadata_timeout_secs))
            .user_agent("costforge-registry")
            .build()?;
        let download_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .user_agent("costforge-registry")
            .build()?;

        Ok(Self {
            metadata_client,
            download_client,
            token,
            max_retries,
            api_base,
        })
    }

    fn calculate_backoff(attempt: u32) -> Duration {
        let delay_ms = BASE_RETRY_DELAY_MS * 2_u64.pow(attempt);
        Duration::from_millis(delay_ms.min(10_000))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Fetch release metadata. Pass `None` for `tag` to resolve "latest".
    pub async fn fetch_release(
        &self,
        owner: &str,
        repo: &str,
        tag: Option<&str>,
    ) -> Result<ReleaseDescriptor> {
        let api_base = &self.api_base;
        let url = match tag {
            Some(t) => format!("{api_base}/repos/{owner}/{repo}/releases/tags/{t}"),
            None => format!("{api_base}/repos/{owner}/{repo}/releases/latest"),
        };

        let mut attempts = 0;
        loop {
            let request = self.authorize(self.metadata_client.get(&url));
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<ReleaseDescriptor>().await.map_err(Into::into);
                    }
                    if status.as_u16() == 404 {
                        return Err(RegistryError::ReleaseNotFound {
                            owner: owner.to_string(),
                            repo: repo.to_string(),
                            tag: tag.map(|t| format!(" @ {t}")).unwrap_or_default(),
                        });
                    }
                    if status.as_u16() == 403 {
                        return Err(RegistryError::RateLimited);
                    }
                    if status.is_server_error() && attempts < self.max_retries {
                        attempts += 1;
                        tokio::time::sleep(Self::calculate_backoff(attempts - 1)).await;
                        continue;
                    }
                    return Err(RegistryError::ReleaseNotFound {
                        owner: owner.to_string(),
                        repo: repo.to_string(),
                        tag: format!(" (http {status})"),
                    });
                }
                Err(e) if attempts < self.max_retries && (e.is_timeout() || e.is_connect()) => {
                    attempts += 1;
                    tokio::time::sleep(Self::calculate_backoff(attempts - 1)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Download an asset to `dest`, invoking `on_progress` after each chunk.
    pub async fn download(
        &self,
        asset: &ReleaseAsset,
        dest: &Path,
        mut on_progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<()> {
        let request = self.authorize(self.download_client.get(&asset.download_url));
        let response = request.send().await?.error_for_status()?;
        let total = response.content_length().unwrap_or(asset.size);

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| RegistryError::io(dest, e))?;

        let mut downloaded: u64 = 0;
        let mut buffer: Vec<u8> = Vec::with_capacity(DOWNLOAD_CHUNK_HINT);
        let mut stream = response.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);
            while buffer.len() >= DOWNLOAD_CHUNK_HINT {
                let piece = buffer.drain(..DOWNLOAD_CHUNK_HINT).collect::<Vec<u8>>();
                file.write_all(&piece).await.map_err(|e| RegistryError::io(dest, e))?;
                downloaded += piece.len() as u64;
                if let Some(cb) = on_progress.as_deref_mut() {
                    cb(downloaded, total);
                }
            }
        }
        if !buffer.is_empty() {
            file.write_all(&buffer).await.map_err(|e| RegistryError::io(dest, e))?;
            downloaded += buffer.len() as u64;
            if let Some(cb) = on_progress.as_deref_mut() {
                cb(downloaded, total);
            }
        }
        file.flush().await.map_err(|e| RegistryError::io(dest, e))?;
        Ok(())
    }
}

fn token_from_gh_cli() -> Option<String> {
    std::process::Command::new("gh")
        .args(["auth", "token"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn os_tokens() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &["windows", "Windows"]
    } else if cfg!(target_os = "macos") {
        &["darwin", "macos", "macOS", "Darwin"]
    } else {
        &["linux", "Linux"]
    }
}

pub(crate) fn arch_tokens() -> &'static [&'static str] {
    if cfg!(target_arch = "x86_64") {
        &["amd64", "x86_64", "X86_64", "AMD64"]
    } else if cfg!(target_arch = "aarch64") {
        &["arm64", "ARM64", "aarch64", "AARCH64"]
    } else {
        &[]
    }
}

pub(crate) fn archive_ext() -> &'static str {
    if cfg!(target_os = "windows") {
        "zip"
    } else {
        "tar.gz"
    }
}

/// Select the release asset matching this host's OS and architecture.
///
/// Builds an ordered list of candidate filenames from the project name (and
/// optional [`AssetHints`]), the resolved version, OS/arch token variants,
/// and an optional region suffix, then returns the first exact match.
pub fn select_asset<'a>(
    release: &'a ReleaseDescriptor,
    project_name: &str,
    hints: Option<&AssetHints>,
) -> Result<&'a ReleaseAsset> {
    let names: Vec<&str> = match hints.and_then(|h| h.asset_prefix.as_deref()) {
        Some(prefix) => vec![prefix, project_name],
        None => vec![project_name],
    };

    let version_variants: Vec<String> = {
        let raw = release.tag.trim_start_matches(['v', 'V']);
        vec![raw.to_string(), format!("v{raw}")]
    };

    let ext = archive_ext();
    let region_suffixes: Vec<String> = match hints.and_then(|h| h.default_region.as_deref()) {
        Some(region) => vec![String::new(), format!("_{region}")],
        None => vec![String::new()],
    };

    for name in &names {
        for version in &version_variants {
            for os in os_tokens() {
                for arch in arch_tokens() {
                    for region in &region_suffixes {
                        let candidate = format!("{name}_{version}_{os}_{arch}{region}.{ext}");
                        if let Some(found) = release.assets.iter().find(|a| a.name == candidate) {
                            return Ok(found);
                        }
                    }
                }
            }
        }
    }

    Err(RegistryError::NoMatchingAsset {
        available: release
            .assets
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    })
}
