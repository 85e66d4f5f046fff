//! HTTP retrieval of upstream feeds to local files
//!
//! The destination contains the fully written resource before parsing ever
//! sees it: the body streams into a `.tmp` sibling which is renamed over the
//! destination only once the download completes. A non-success status is a
//! retrieval failure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::errors::{SourceError, SourceResult};

pub struct Fetcher {
    client: reqwest::Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    /// Download `url` into `dest`, creating parent directories on demand
    pub async fn fetch_to_file(&self, url: &str, dest: &Path) -> SourceResult<()> {
        debug!("Fetching {url} -> {}", dest.display());

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::FetchStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let tmp_path = tmp_sibling(dest);
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            downloaded += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, dest).await?;
        debug!("Fetched {downloaded} bytes into {}", dest.display());
        Ok(())
    }
}

fn tmp_sibling(dest: &Path) -> PathBuf {
    let mut tmp = dest.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
