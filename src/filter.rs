//! Chapter range filtering

use crate::types::{Chapter, ChapterRange};

/// Parse a chapter label into a number
///
/// Leading whitespace is skipped and the longest numeric prefix is parsed, so
/// "12", "12.5", ".5" and "12 (part 2)" are numeric while "Extra", "Oneshot"
/// and "" are not. Exponents, `Infinity` and `NaN` are not accepted.
pub fn parse_chapter_number(label: &str) -> Option<f64> {
    let s = label.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        let frac_digits = frac_end - frac_start;
        if frac_digits > 0 || digits > 0 {
            digits += frac_digits;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    s[..end]
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Select the chapters whose number lies in `range` (inclusive on both ends)
///
/// Chapters without a number never match. Surviving chapters keep their input
/// order.
pub fn filter_by_range(chapters: &[Chapter], range: ChapterRange) -> Vec<Chapter> {
    chapters
        .iter()
        .filter(|chapter| chapter.number.is_some_and(|n| range.contains(n)))
        .cloned()
        .collect()
}
