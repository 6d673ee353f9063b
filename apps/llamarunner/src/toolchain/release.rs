//! Latest-release metadata for self-update.
//!
//! ## Release Format
//!
//! The endpoint returns GitHub's release JSON; only these fields are used:
//!
//! ```json
//! {
//!   "tag_name": "v0.3.1",
//!   "name": "llamarunner 0.3.1",
//!   "body": "Release notes...",
//!   "assets": [
//!     {
//!       "name": "llamarunner-linux-amd64",
//!       "browser_download_url": "https://github.com/.../llamarunner-linux-amd64",
//!       "digest": "sha256:abc123..."
//!     }
//!   ]
//! }
//! ```
//!
//! The endpoint can be overridden with `LLAMARUNNER_RELEASES_URL`, for
//! testing or a mirror.

use anyhow::{Context, Result};
use serde::Deserialize;

use super::Platform;
use crate::errors::RunnerError;

/// Environment variable overriding the release endpoint.
pub const RELEASES_URL_ENV: &str = "LLAMARUNNER_RELEASES_URL";

/// Default release endpoint.
const DEFAULT_RELEASES_URL: &str =
    "https://api.github.com/repos/GGrassia/llamarunner/releases/latest";

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User-Agent header for HTTP requests; GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("llamarunner/", env!("CARGO_PKG_VERSION"));

/// A published release.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
    /// Git tag, e.g. `v0.3.1`.
    pub tag_name: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Release notes.
    #[serde(default)]
    pub body: Option<String>,
    /// Downloadable binaries.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A binary attached to a release.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Asset {
    /// File name, e.g. `llamarunner-linux-amd64`.
    pub name: String,
    /// Direct download URL.
    pub browser_download_url: String,
    /// Content digest in `algorithm:hex` form, when published.
    #[serde(default)]
    pub digest: Option<String>,
}

impl Asset {
    /// Returns the hex SHA256 from the digest, if there is one.
    #[must_use]
    pub fn sha256(&self) -> Option<&str> {
        self.digest
            .as_deref()
            .and_then(|digest| digest.strip_prefix("sha256:"))
            .filter(|hex| !hex.is_empty())
    }
}

impl Release {
    /// Returns the name to show the user, falling back to the tag.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.tag_name)
    }

    /// Returns the release version: the tag without a leading `v`.
    #[must_use]
    pub fn version(&self) -> &str {
        strip_v(&self.tag_name)
    }

    /// Finds the asset published for `platform`.
    #[must_use = "returns asset info without side effects"]
    pub fn asset_for(&self, platform: Platform) -> Option<&Asset> {
        let wanted = platform.asset_name();
        self.assets.iter().find(|asset| asset.name == wanted)
    }

    /// Returns whether `current` is at least as new as this release.
    ///
    /// Both sides are compared as semver with an optional leading `v`. When
    /// either side is not valid semver, only string equality counts as up to
    /// date.
    #[must_use]
    pub fn is_up_to_date(&self, current: &str) -> bool {
        let latest = strip_v(&self.tag_name);
        let current = strip_v(current);

        match (
            semver::Version::parse(latest),
            semver::Version::parse(current),
        ) {
            (Ok(latest), Ok(current)) => current >= latest,
            _ => current == latest,
        }
    }
}

fn strip_v(version: &str) -> &str {
    let version = version.trim();
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

/// Returns the release endpoint.
///
/// `LLAMARUNNER_RELEASES_URL` wins when set; empty or whitespace-only values
/// are treated as unset.
fn releases_url() -> String {
    std::env::var(RELEASES_URL_ENV)
        .ok()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_RELEASES_URL.to_string())
}

fn handle_http_error(status: reqwest::StatusCode, url: &str) -> RunnerError {
    match status.as_u16() {
        404 => RunnerError::release(format!("no published release found at {url}")),
        403 | 429 => RunnerError::release(format!(
            "rate limited by {url} ({status}); try again later"
        )),
        code if code >= 500 => RunnerError::release(format!("server error ({code}): {url}")),
        code => RunnerError::release(format!("HTTP error {code}: {url}")),
    }
}

/// Fetches the latest release.
///
/// # Errors
///
/// Returns an error if the request fails, the server answers with a
/// non-success status, or the body is not release JSON.
pub async fn fetch_latest_release() -> Result<Release> {
    let url = releases_url();
    log::debug!("fetching release metadata from {url}");

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(&url)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .send()
        .await
        .with_context(|| format!("Failed to fetch release metadata from {url}"))?;

    if !response.status().is_success() {
        return Err(handle_http_error(response.status(), &url).into());
    }

    let text = response
        .text()
        .await
        .with_context(|| format!("Failed to read response from {url}"))?;

    parse_release(&text).with_context(|| format!("Failed to parse release metadata from {url}"))
}

fn parse_release(text: &str) -> Result<Release> {
    Ok(serde_json::from_str(text)?)
}
