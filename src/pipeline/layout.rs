//! Reading-order reconstruction from positioned text runs.
//!
//! PDF text drawing operations arrive in content-stream order, which for
//! scanned-and-OCR'd slips is often column-major or outright arbitrary. We
//! rebuild an approximation of the printed layout good enough for regex
//! matching: top-to-bottom lines, left-to-right within a line.
//!
//! ```text
//! TextItem[] ──▶ sort (y desc, x asc) ──▶ group by y tolerance ──▶ sort line by x
//!            ──▶ join items with ' ' and lines with '\n' ──▶ normalise spacing
//! ```
//!
//! The line tolerance is the key tie-break: two runs printed on the same
//! baseline rarely share an exact `y`, and without a tolerance sub-point
//! jitter would fragment one printed line into several.

use crate::pipeline::source::TextItem;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

/// Default vertical distance (PDF points) under which two runs share a line.
pub const DEFAULT_LINE_TOLERANCE: f32 = 5.0;

/// Group items into lines in reading order.
///
/// Consecutive items in `(y desc, x asc)` order whose `y` differs by less than
/// `tolerance` join the current line. Any two items closer than `tolerance`
/// vertically therefore always land on the same line, because every item
/// sorted between them is closer still. Each line is then ordered by `x`.
pub fn group_lines(items: &[TextItem], tolerance: f32) -> Vec<Vec<&TextItem>> {
    let mut sorted: Vec<&TextItem> = items
        .iter()
        .filter(|item| !item.text.trim().is_empty())
        .collect();
    sorted.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines: Vec<Vec<&TextItem>> = Vec::new();
    let mut last_y: Option<f32> = None;

    for item in sorted {
        match (last_y, lines.last_mut()) {
            (Some(y), Some(line)) if (y - item.y).abs() < tolerance => line.push(item),
            _ => lines.push(vec![item]),
        }
        last_y = Some(item.y);
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
    }
    lines
}

/// Linearise the page: items joined by one space, lines by `\n`.
pub fn reading_order_text(items: &[TextItem], tolerance: f32) -> String {
    group_lines(items, tolerance)
        .iter()
        .map(|line| {
            line.iter()
                .map(|item| item.text.trim())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_PADDED_HYPHEN: Lazy<Regex> = Lazy::new(|| Regex::new(r" - ").unwrap());

/// Collapse whitespace runs (line breaks included) to one space and
/// `" - "` to `"-"`; text extraction often pads hyphens with spaces.
pub fn normalise_spacing(text: &str) -> String {
    let collapsed = RE_WHITESPACE.replace_all(text, " ");
    RE_PADDED_HYPHEN
        .replace_all(collapsed.trim(), "-")
        .into_owned()
}
