//! Turn a [`RawCandidate`] into the label used as the output file name.
//!
//! Never fails and never returns an empty label: anything that does not
//! survive cleanup becomes the positional placeholder `BOLETO-PAG-<page>`.

use crate::candidate::{NormalizedIdentifier, RawCandidate, PLACEHOLDER_PREFIX};

/// Normalize one page's candidate.
///
/// Rules, in order:
/// - a sentinel (explicit, or a value equal to a sentinel wire value) or a
///   blank value becomes the placeholder
/// - a value that already is this page's placeholder label stays terminal
/// - otherwise every character outside `[0-9-]` is stripped; an empty or
///   bare-hyphen result becomes the placeholder
pub fn normalize(raw: &RawCandidate, page_num: usize) -> NormalizedIdentifier {
    let value = match raw {
        RawCandidate::Sentinel(_) => return NormalizedIdentifier::Placeholder(page_num),
        RawCandidate::Value(v) => v.trim().to_uppercase(),
    };

    if value.is_empty() || raw.sentinel().is_some() {
        return NormalizedIdentifier::Placeholder(page_num);
    }

    if parse_placeholder(&value) == Some(page_num) {
        return NormalizedIdentifier::Placeholder(page_num);
    }

    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        NormalizedIdentifier::Placeholder(page_num)
    } else {
        NormalizedIdentifier::Identifier(cleaned)
    }
}

/// Page number of a `BOLETO-PAG-<n>` label.
fn parse_placeholder(value: &str) -> Option<usize> {
    value.strip_prefix(PLACEHOLDER_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Sentinel;

    fn value(s: &str) -> RawCandidate {
        RawCandidate::Value(s.to_string())
    }

    #[test]
    fn clean_identifier_passes_through() {
        assert_eq!(
            normalize(&value("24277-4"), 1),
            NormalizedIdentifier::Identifier("24277-4".into())
        );
    }

    #[test]
    fn every_sentinel_becomes_the_same_placeholder() {
        for s in Sentinel::ALL {
            assert_eq!(
                normalize(&RawCandidate::Sentinel(s), 3),
                NormalizedIdentifier::Placeholder(3)
            );
            assert_eq!(
                normalize(&value(s.as_str()), 3),
                NormalizedIdentifier::Placeholder(3)
            );
            assert_eq!(
                normalize(&value(&format!("  {} ", s.as_str().to_lowercase())), 3),
                NormalizedIdentifier::Placeholder(3)
            );
        }
    }

    #[test]
    fn strips_ocr_noise() {
        assert_eq!(
            normalize(&value(" nº 05551-2. "), 2),
            NormalizedIdentifier::Identifier("05551-2".into())
        );
        assert_eq!(
            normalize(&value("24.277-4"), 2),
            NormalizedIdentifier::Identifier("24277-4".into())
        );
    }

    #[test]
    fn empty_or_bare_hyphen_after_cleanup_is_placeholder() {
        assert_eq!(normalize(&value(""), 5), NormalizedIdentifier::Placeholder(5));
        assert_eq!(normalize(&value("   "), 5), NormalizedIdentifier::Placeholder(5));
        assert_eq!(normalize(&value("N/A"), 5), NormalizedIdentifier::Placeholder(5));
        assert_eq!(normalize(&value(" - "), 5), NormalizedIdentifier::Placeholder(5));
    }

    #[test]
    fn normalizing_twice_is_stable() {
        for raw in ["24277-4", "Num: 0001-9!", "abc", "NAO_ENCONTRADO"] {
            let once = normalize(&value(raw), 7);
            let twice = normalize(&value(&once.to_string()), 7);
            assert_eq!(once, twice, "raw = {raw:?}");
        }
    }

    #[test]
    fn placeholder_is_terminal_not_stripped() {
        assert_eq!(
            normalize(&value("BOLETO-PAG-7"), 7),
            NormalizedIdentifier::Placeholder(7)
        );
    }

    #[test]
    fn output_is_filename_safe() {
        let id = normalize(&value("../../etc/passwd 123-4\n\0"), 1);
        let label = id.to_string();
        assert_eq!(label, "123-4");
        assert!(!label.contains('/') && !label.contains('\\'));
        assert!(label.chars().all(|c| !c.is_control()));
    }
}
