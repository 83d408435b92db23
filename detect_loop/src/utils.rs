//! Utility functions
//!
use std::path::Path;

use anyhow::Result;
use reqwest::Client;

/// Download a file from a URL to a given filepath, creating parent
/// directories as needed.
pub async fn fetch_file(client: &Client, url: &str, filepath: impl AsRef<Path>) -> Result<()> {
    let filepath = filepath.as_ref();
    log::info!("Downloading {} to {}", url, filepath.display());

    let resp = client.get(url).send().await?.error_for_status()?;
    let content = resp.bytes().await?;

    if let Some(parent) = filepath.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(filepath, &content)?;

    log::info!("Downloaded {} bytes", content.len());
    Ok(())
}
