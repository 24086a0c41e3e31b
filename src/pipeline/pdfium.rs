//! pdfium-backed [`PageSource`]: page count, rasterisation, positioned text
//! and single-page export.
//!
//! Every method runs inside `spawn_blocking`. Each call binds the library,
//! loads its own copy of the bytes and drops the document before returning;
//! no pdfium handle outlives a call.

use crate::error::SlicerError;
use crate::pipeline::source::{check_page, PageSource, TextItem};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Environment variable naming a directory that contains libpdfium.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Production page source backed by the pdfium C++ library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumPageSource {
    password: Option<String>,
    library_dir: Option<PathBuf>,
}

impl PdfiumPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// User password for encrypted documents.
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    /// Directory to look for libpdfium in before the defaults.
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    /// Bind libpdfium: explicit dir, `$PDFIUM_LIB_PATH`, `./`, then system.
    fn bind(&self) -> Result<Pdfium, SlicerError> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(ref dir) = self.library_dir {
            candidates.push(dir.clone());
        }
        if let Ok(dir) = std::env::var(PDFIUM_LIB_PATH_ENV) {
            if !dir.is_empty() {
                candidates.push(PathBuf::from(dir));
            }
        }
        candidates.push(PathBuf::from("./"));

        for dir in &candidates {
            let lib = Pdfium::pdfium_platform_library_name_at_path(dir);
            if let Ok(bindings) = Pdfium::bind_to_library(&lib) {
                debug!("Bound pdfium from {}", lib.display());
                return Ok(Pdfium::new(bindings));
            }
        }

        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| SlicerError::PdfiumBindingFailed(format!("{e:?}")))
    }

    fn load<'a>(&'a self, pdfium: &'a Pdfium, bytes: Vec<u8>) -> Result<PdfDocument<'a>, SlicerError> {
        pdfium
            .load_pdf_from_byte_vec(bytes, self.password.as_deref())
            .map_err(|e| {
                let err_str = format!("{e:?}");
                if err_str.contains("Password") || err_str.contains("password") {
                    if self.password.is_some() {
                        SlicerError::WrongPassword
                    } else {
                        SlicerError::PasswordRequired
                    }
                } else {
                    SlicerError::CorruptPdf { detail: err_str }
                }
            })
    }
}

/// 0-based pdfium index for a validated 1-based page number.
fn page_index(document: &PdfDocument<'_>, page_num: usize) -> Result<PdfPageIndex, SlicerError> {
    let total = document.pages().len() as usize;
    check_page(page_num, total)?;
    Ok((page_num - 1) as PdfPageIndex)
}

impl PageSource for PdfiumPageSource {
    fn page_count(&self, bytes: Vec<u8>) -> Result<usize, SlicerError> {
        let pdfium = self.bind()?;
        let document = self.load(&pdfium, bytes)?;
        Ok(document.pages().len() as usize)
    }

    fn page_as_image(
        &self,
        bytes: Vec<u8>,
        page_num: usize,
        scale: f32,
    ) -> Result<DynamicImage, SlicerError> {
        let pdfium = self.bind()?;
        let document = self.load(&pdfium, bytes)?;
        let idx = page_index(&document, page_num)?;

        let page = document
            .pages()
            .get(idx)
            .map_err(|e| SlicerError::CorruptPdf {
                detail: format!("page {page_num}: {e:?}"),
            })?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| SlicerError::CorruptPdf {
                detail: format!("render page {page_num}: {e:?}"),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} at {:.1}x → {}x{} px",
            page_num,
            scale,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn page_as_text(&self, bytes: Vec<u8>, page_num: usize) -> Result<Vec<TextItem>, SlicerError> {
        let pdfium = self.bind()?;
        let document = self.load(&pdfium, bytes)?;
        let idx = page_index(&document, page_num)?;

        let page = document
            .pages()
            .get(idx)
            .map_err(|e| SlicerError::TextExtractionFailed {
                page: page_num,
                detail: format!("{e:?}"),
            })?;
        let text = page.text().map_err(|e| SlicerError::TextExtractionFailed {
            page: page_num,
            detail: format!("{e:?}"),
        })?;

        let items: Vec<TextItem> = text
            .segments()
            .iter()
            .map(|segment| positioned_item(segment.text(), &segment.bounds()))
            .collect();

        debug!("Page {}: {} text segments", page_num, items.len());
        Ok(items)
    }

    fn extract_page(&self, bytes: Vec<u8>, page_num: usize) -> Result<Vec<u8>, SlicerError> {
        let pdfium = self.bind()?;
        let document = self.load(&pdfium, bytes)?;
        let idx = page_index(&document, page_num)?;

        let export_err = |e: PdfiumError| SlicerError::PageExportFailed {
            page: page_num,
            detail: format!("{e:?}"),
        };

        let mut single = pdfium.create_new_pdf().map_err(export_err)?;
        single
            .pages_mut()
            .copy_page_from_document(&document, idx, 0)
            .map_err(export_err)?;
        single.save_to_bytes().map_err(export_err)
    }
}

/// Anchor a segment at the bottom-left corner of its bounds (PDF user space).
fn positioned_item(text: String, bounds: &PdfRect) -> TextItem {
    TextItem::new(text, bounds.left().value, bounds.bottom().value)
}
