//! Pattern cascade: locate the "Num. do Documento" code in linearised text.
//!
//! The code is a short digit group, a hyphen and one check digit
//! (`24277-4`). Slips carry several look-alikes (the much longer "Nosso
//! Número", agency and payee codes), so the rules go from most to least
//! specific and the first rule with a match decides:
//!
//! 1. a `DD/MM/YYYY` date immediately followed by a `NNNNN-N` code; on the
//!    slip layout the identifier sits right after "Data do Documento"
//! 2. the first standalone `NNNNN-N` token
//! 3. the first standalone 4-to-8-digit `N…N-N` token
//! 4. nothing: [`Sentinel::NotFound`]
//!
//! "First" is reading order, so the top-most token wins within a rule.

use crate::candidate::{RawCandidate, Sentinel};
use crate::pipeline::layout::{normalise_spacing, reading_order_text};
use crate::pipeline::source::TextItem;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// ASCII digits and ASCII word boundaries: under Unicode `\b` a letter such as
// "º" glued to the code ("Nº24277-4") would count as part of the same word.
static RE_DATE_THEN_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u:\b)[0-9]{2}/[0-9]{2}/[0-9]{4} ?([0-9]{5}-[0-9])(?-u:\b)").unwrap()
});

static RE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b)([0-9]{5}-[0-9])(?-u:\b)").unwrap());

static RE_LOOSE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b)([0-9]{4,8}-[0-9])(?-u:\b)").unwrap());

/// Which cascade rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    DateAdjacent,
    Standalone,
    Relaxed,
}

/// Run the cascade over already-normalised text.
pub fn match_document_number(text: &str) -> Option<(MatchRule, String)> {
    let rules: [(MatchRule, &Lazy<Regex>); 3] = [
        (MatchRule::DateAdjacent, &RE_DATE_THEN_CODE),
        (MatchRule::Standalone, &RE_CODE),
        (MatchRule::Relaxed, &RE_LOOSE_CODE),
    ];

    rules.into_iter().find_map(|(rule, re)| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| (rule, m.as_str().to_string()))
    })
}

/// Full text strategy for one page: reading order, normalisation, cascade.
pub fn find_document_number(items: &[TextItem], line_tolerance: f32) -> RawCandidate {
    let text = normalise_spacing(&reading_order_text(items, line_tolerance));
    match match_document_number(&text) {
        Some((rule, code)) => {
            debug!("Cascade matched {:?}: {}", rule, code);
            RawCandidate::Value(code)
        }
        None => RawCandidate::Sentinel(Sentinel::NotFound),
    }
}
