//! Values flowing between the extractors, the normalizer and the output.
//!
//! A page either yields a [`RawCandidate::Value`] (possibly noisy text) or a
//! [`RawCandidate::Sentinel`] naming why nothing usable came out. Sentinels
//! are ordinary data: extractors return them instead of errors so one bad
//! page never aborts the batch. The only sentinel the orchestrator treats as
//! fatal is [`Sentinel::MissingCredential`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved marker for a page-local extraction failure.
///
/// The wire values are what the vision model is told to answer with, so a
/// model reply of `NAO_ENCONTRADO` is recognized the same way as the
/// text strategy's explicit [`Sentinel::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentinel {
    /// No identifier-shaped token on the page.
    NotFound,
    /// The page could not be rendered.
    ReadError,
    /// The vision provider failed (transport, timeout, malformed reply).
    ModelError,
    /// The rendered page could not be prepared for the model.
    ProcessingError,
    /// The vision strategy has no API credential.
    MissingCredential,
}

impl Sentinel {
    pub const ALL: [Sentinel; 5] = [
        Sentinel::NotFound,
        Sentinel::ReadError,
        Sentinel::ModelError,
        Sentinel::ProcessingError,
        Sentinel::MissingCredential,
    ];

    /// Wire value of the sentinel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentinel::NotFound => "NAO_ENCONTRADO",
            Sentinel::ReadError => "ERRO_LEITURA",
            Sentinel::ModelError => "ERRO_IA",
            Sentinel::ProcessingError => "ERRO_PROCESSAMENTO",
            Sentinel::MissingCredential => "ERRO_SEM_CHAVE",
        }
    }

    /// Recognize a sentinel by value (trimmed, case-insensitive).
    pub fn from_value(value: &str) -> Option<Sentinel> {
        let value = value.trim();
        Sentinel::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an extraction strategy produced for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawCandidate {
    Value(String),
    Sentinel(Sentinel),
}

impl RawCandidate {
    /// Wrap free text, recognizing sentinel wire values and treating blank
    /// text as [`Sentinel::NotFound`].
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            return RawCandidate::Sentinel(Sentinel::NotFound);
        }
        match Sentinel::from_value(&text) {
            Some(s) => RawCandidate::Sentinel(s),
            None => RawCandidate::Value(text),
        }
    }

    /// The sentinel carried by this candidate, whether explicit or by value.
    pub fn sentinel(&self) -> Option<Sentinel> {
        match self {
            RawCandidate::Sentinel(s) => Some(*s),
            RawCandidate::Value(v) => Sentinel::from_value(v),
        }
    }

    pub fn is_missing_credential(&self) -> bool {
        self.sentinel() == Some(Sentinel::MissingCredential)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RawCandidate::Value(v) => v,
            RawCandidate::Sentinel(s) => s.as_str(),
        }
    }
}

/// Final, file-name-safe label for a page.
///
/// Either a cleaned identifier (digits and hyphens only) or the positional
/// placeholder `BOLETO-PAG-<page>`. A placeholder is terminal: it is never
/// re-read as a sentinel or stripped on a later pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum NormalizedIdentifier {
    Identifier(String),
    Placeholder(usize),
}

/// Prefix of the positional placeholder label.
pub const PLACEHOLDER_PREFIX: &str = "BOLETO-PAG-";

impl NormalizedIdentifier {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, NormalizedIdentifier::Placeholder(_))
    }

    /// Output file name, `<label>.pdf`.
    pub fn file_name(&self) -> String {
        format!("{self}.pdf")
    }
}

impl fmt::Display for NormalizedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedIdentifier::Identifier(id) => f.write_str(id),
            NormalizedIdentifier::Placeholder(page) => write!(f, "{PLACEHOLDER_PREFIX}{page}"),
        }
    }
}

impl From<NormalizedIdentifier> for String {
    fn from(id: NormalizedIdentifier) -> Self {
        id.to_string()
    }
}
