//! Error types for the boleto-slicer library.
//!
//! Two distinct failure modes, two distinct representations:
//!
//! * [`SlicerError`] is **fatal**: the batch cannot continue (missing
//!   credential, undecodable PDF, page out of range, unwritable output).
//!   Returned as `Err(SlicerError)` from the `slice*` entry points.
//!
//! * [`crate::candidate::Sentinel`] is **page-local**: one page could not be
//!   read (model error, nothing matched). Carried as data inside
//!   [`crate::candidate::RawCandidate`] and resolved by the normalizer into a
//!   placeholder name, so the batch keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the boleto-slicer library.
#[derive(Debug, Error)]
pub enum SlicerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("Input is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: [u8; 4] },

    // ── Document-structural errors ────────────────────────────────────────
    /// pdfium could not decode the document.
    #[error("PDF is corrupt or unreadable: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    /// Requested page is outside `1..=total`.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The page's embedded text layer could not be read.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// The page could not be copied into a standalone document.
    #[error("Could not export page {page} as a standalone PDF: {detail}")]
    PageExportFailed { page: usize, detail: String },

    // ── Configuration errors ──────────────────────────────────────────────
    /// The vision strategy is selected but its API credential is absent.
    #[error(
        "API key not configured: environment variable {env_var} is empty or unset.\n\
         Export it (e.g. `export {env_var}=...`) or run with --strategy text."
    )]
    MissingCredential { env_var: String },

    /// The configured provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
         Place libpdfium next to the binary, install it system-wide,\n\
         or set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not assemble the ZIP archive.
    #[error("Failed to build archive '{path}': {detail}")]
    ArchiveFailed { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SlicerError {
    /// True for errors the user fixes by changing configuration rather than
    /// the input document.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SlicerError::MissingCredential { .. }
                | SlicerError::ProviderNotConfigured { .. }
                | SlicerError::InvalidConfig(_)
                | SlicerError::PdfiumBindingFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_names_the_variable() {
        let e = SlicerError::MissingCredential {
            env_var: "GEMINI_API_KEY".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
        assert!(msg.contains("--strategy text"));
        assert!(e.is_configuration());
    }

    #[test]
    fn page_out_of_range_display() {
        let e = SlicerError::PageOutOfRange { page: 9, total: 4 };
        assert!(e.to_string().contains("Page 9"));
        assert!(e.to_string().contains("4 pages"));
        assert!(!e.is_configuration());
    }

    #[test]
    fn text_extraction_display() {
        let e = SlicerError::TextExtractionFailed {
            page: 2,
            detail: "no text layer".into(),
        };
        assert!(e.to_string().contains("page 2"));
        assert!(e.to_string().contains("no text layer"));
    }
}
