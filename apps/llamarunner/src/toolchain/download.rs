//! Streaming download of a release binary.
//!
//! The body is hashed while it is written, so the SHA-256 is known as soon
//! as the last chunk lands and the file is never read back. A failed
//! attempt removes the partial file and is retried after a short backoff.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use super::release::USER_AGENT;

/// Attempts before giving up.
const ATTEMPTS: u32 = 3;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Downloads `url` into `dest` and returns the lowercase hex SHA-256 of the
/// bytes written.
///
/// # Errors
///
/// Returns the error of the last attempt when every attempt fails.
pub async fn download_binary(url: &str, dest: &Path) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")?;

    let mut attempt = 1;
    loop {
        match stream_to_file(&client, url, dest).await {
            Ok(sha256) => return Ok(sha256),
            Err(e) if attempt < ATTEMPTS => {
                log::warn!("download attempt {attempt}/{ATTEMPTS} failed: {e:#}");
                let _ = tokio::fs::remove_file(dest).await;
                tokio::time::sleep(backoff(attempt)).await;
                attempt += 1;
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                return Err(e.context(format!("Download failed after {ATTEMPTS} attempts")));
            }
        }
    }
}

async fn stream_to_file(client: &reqwest::Client, url: &str, dest: &Path) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;
    if !response.status().is_success() {
        bail!("HTTP error {}: {url}", response.status());
    }

    let total = response.content_length();
    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut hasher = Sha256::new();
    let mut written: u64 = 0;
    let mut last_percent = None;

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.with_context(|| format!("Failed to read from {url}"))?;
        hasher.update(&chunk);
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        written += chunk.len() as u64;

        if let Some(percent) = total.and_then(|total| percent_of(written, total))
            && last_percent != Some(percent)
        {
            print!("\rDownloading... {percent}%");
            let _ = std::io::stdout().flush();
            last_percent = Some(percent);
        }
    }

    file.flush()
        .await
        .with_context(|| format!("Failed to flush {}", dest.display()))?;
    println!("\rDownloaded {} KiB.     ", written / 1024);

    Ok(hex::encode(hasher.finalize()))
}

/// Whole percent of `total`, or `None` when the size is unknown.
fn percent_of(written: u64, total: u64) -> Option<u64> {
    (total > 0).then(|| (written.saturating_mul(100) / total).min(100))
}

/// 1s, 2s, ... plus up to 250ms of jitter.
fn backoff(attempt: u32) -> Duration {
    let base = 1000 * u64::from(attempt);
    Duration::from_millis(base + rand::rng().random_range(0..=250))
}
