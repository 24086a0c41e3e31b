//! Input resolution: load a user-supplied path or URL into memory.
//!
//! The whole document is held as one immutable [`SourceDocument`]; every
//! later read works on a fresh copy of it. We check the PDF magic bytes
//! (`%PDF`) up front so callers get a meaningful error rather than a decoder
//! failure on page 1.

use crate::error::SlicerError;
use crate::pipeline::source::SourceDocument;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the input into memory, downloading it first if it is a URL.
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<SourceDocument, SlicerError> {
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else if input.trim().is_empty() {
        return Err(SlicerError::InvalidInput {
            input: input.to_string(),
        });
    } else {
        read_local(input).await?
    };

    check_magic(&bytes)?;
    Ok(SourceDocument::new(bytes))
}

/// Reject buffers that do not start with `%PDF`.
pub fn check_magic(bytes: &[u8]) -> Result<(), SlicerError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(SlicerError::NotAPdf { magic });
    }
    Ok(())
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, SlicerError> {
    let path = PathBuf::from(path_str);

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(SlicerError::PermissionDenied { path })
        }
        Err(_) => Err(SlicerError::FileNotFound { path }),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, SlicerError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SlicerError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SlicerError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SlicerError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(SlicerError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SlicerError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
