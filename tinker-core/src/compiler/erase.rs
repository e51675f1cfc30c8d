//! Removal of type-only syntax from source text

use std::ops::Range;
use tracing::trace;

/// Sort ranges and merge the overlapping or touching ones
fn normalize(ranges: &[Range<usize>], len: usize) -> Vec<Range<usize>> {
    let mut sorted: Vec<Range<usize>> = ranges
        .iter()
        .filter(|r| r.start < r.end)
        .map(|r| r.start.min(len)..r.end.min(len))
        .collect();
    sorted.sort_by_key(|r| r.start);
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// Delete `ranges` (byte offsets) from `source`
///
/// Everything outside the ranges is kept byte for byte. Line breaks inside a
/// removed range survive, so positions in the output keep their line numbers.
pub fn erase(source: &str, ranges: &[Range<usize>]) -> String {
    let ranges = normalize(ranges, source.len());
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for range in &ranges {
        let (Some(kept), Some(removed)) = (source.get(cursor..range.start), source.get(range.clone()))
        else {
            continue;
        };
        out.push_str(kept);
        out.extend(removed.chars().filter(|c| matches!(c, '\n' | '\r')));
        cursor = range.end;
    }
    out.push_str(source.get(cursor..).unwrap_or_default());
    trace!(target: "tinker::compiler", ranges = ranges.len(), before = source.len(), after = out.len(), "erased type syntax");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_ranges() {
        let src = "let x: number = 1;";
        assert_eq!(erase(src, &[5..13]), "let x = 1;");
    }

    #[test]
    fn test_merges_overlaps_and_keeps_newlines() {
        let src = "interface A {\n  x: number;\n}\nlet a = 1;";
        let end = src.find("let").unwrap();
        assert_eq!(erase(src, &[0..10, 5..end]), "\n\n\nlet a = 1;");
    }

    #[test]
    fn test_unsorted_ranges() {
        let src = "f(a: T, b: U)";
        assert_eq!(erase(src, &[9..12, 3..6]), "f(a, b)");
    }

    #[test]
    fn test_no_ranges_is_identity() {
        let src = "console.log('hi') // comment";
        assert_eq!(erase(src, &[]), src);
    }
}
