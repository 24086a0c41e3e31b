//! Pipeline stages for slicing a boleto PDF.
//!
//! Each submodule implements one step and is testable on its own; the
//! orchestrator in [`crate::slice`] wires them together per page.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ source ──┬─▶ vision ───────────────┬─▶ normalize ──▶ export
//! (path/URL) (pdfium) └─▶ layout ──▶ cascade ──┘   (label)        (files, zip)
//! ```
//!
//! 1. [`input`]     load a path or URL into a [`source::SourceDocument`]
//! 2. [`source`]    the [`source::PageSource`] seam; [`pdfium`] implements it
//! 3. [`vision`]    render + vision-model reply cleanup
//! 4. [`layout`]    reading-order text from positioned runs
//! 5. [`cascade`]   pattern rules over that text
//! 6. [`normalize`] candidate → file-name-safe label
//! 7. [`export`]    atomic file writes and the ZIP archive

pub mod cascade;
pub mod export;
pub mod input;
pub mod layout;
pub mod normalize;
pub mod pdfium;
pub mod source;
pub mod vision;
