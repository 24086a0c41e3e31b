//! Writing processed pages to disk: one `<label>.pdf` per page and,
//! optionally, one `BOLETOS_<unix-millis>.zip` with all of them.
//!
//! Every file is written atomically (temp file + rename): an interrupted run
//! never leaves a truncated PDF under its final name.

use crate::error::SlicerError;
use crate::output::ProcessedPage;
use chrono::Utc;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive file name prefix.
pub const ARCHIVE_PREFIX: &str = "BOLETOS_";

/// `BOLETOS_<millis>.zip`.
pub fn archive_name(unix_millis: i64) -> String {
    format!("{ARCHIVE_PREFIX}{unix_millis}.zip")
}

/// Write each page's PDF into `dir`, creating it if needed.
///
/// Returns the written paths in page order.
pub async fn write_pages(dir: &Path, pages: &[ProcessedPage]) -> Result<Vec<PathBuf>, SlicerError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SlicerError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut written = Vec::with_capacity(pages.len());
    for page in pages {
        let path = dir.join(&page.file_name);
        write_atomic(&path, &page.pdf_bytes).await?;
        debug!("Page {}: wrote {}", page.page_num, path.display());
        written.push(path);
    }
    info!("Wrote {} page files to {}", written.len(), dir.display());
    Ok(written)
}

/// Build the ZIP archive of all pages in `dir`.
pub async fn write_archive(dir: &Path, pages: &[ProcessedPage]) -> Result<PathBuf, SlicerError> {
    let path = dir.join(archive_name(Utc::now().timestamp_millis()));
    let bytes = build_archive(pages).map_err(|e| SlicerError::ArchiveFailed {
        path: path.clone(),
        detail: e.to_string(),
    })?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SlicerError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
    write_atomic(&path, &bytes).await?;
    info!("Wrote archive {} ({} entries)", path.display(), pages.len());
    Ok(path)
}

/// Deflated in-memory archive, one entry per page, in page order.
pub fn build_archive(pages: &[ProcessedPage]) -> zip::result::ZipResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for page in pages {
        zip.start_file(page.file_name.as_str(), options)?;
        zip.write_all(&page.pdf_bytes)?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Write to a uniquely named temp file in the target directory, then
/// rename it over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SlicerError> {
    let target = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || {
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        let io_err = |source: std::io::Error| SlicerError::OutputWriteFailed {
            path: target.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.persist(&target).map_err(|e| io_err(e.error))?;
        Ok::<(), SlicerError>(())
    })
    .await
    .map_err(|e| SlicerError::Internal(format!("Write task panicked: {e}")))?
}
