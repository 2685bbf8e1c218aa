//! Chapter-boundary detection
//!
//! Thai novels mark chapters with a "ตอนที่ N" heading at the top of the
//! page. This module provides the header heuristics, the heading regex,
//! and the folding of detected headings into page ranges.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A resolved chapter with its page range (inclusive, 1-based)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    pub chapter: u32,
    pub start_page: u32,
    pub end_page: u32,
}

/// A detected chapter heading: the chapter number and the page it starts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterStart {
    pub chapter: u32,
    pub page: u32,
}

fn chapter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ตอนที่\s*([0-9]+)").expect("valid chapter regex"))
}

/// Map Thai digits (๐-๙) to their ASCII equivalents
pub fn normalize_thai_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '๐'..='๙' => {
                char::from_u32('0' as u32 + (c as u32 - '๐' as u32)).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

/// Detect a "ตอนที่ N" heading in a page header
pub fn find_chapter_number(text: &str) -> Option<u32> {
    let normalized = normalize_thai_digits(text);
    chapter_regex()
        .captures(&normalized)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Heuristic header extraction: the first `max_lines` non-empty lines of a
/// page, capped at `max_chars` characters.
pub fn page_header(text: &str, max_lines: usize, max_chars: usize) -> String {
    let header = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n");

    if header.chars().count() > max_chars {
        header.chars().take(max_chars).collect()
    } else {
        header
    }
}

/// Fold detected chapter headings into page ranges.
///
/// `starts` must be in page order. A chapter ends on the page before the
/// next heading with a different chapter number; the final chapter ends on
/// `last_page`. Only chapters within `[start_chapter, end_chapter]` are
/// returned, sorted by chapter number. Repeated headings (running headers)
/// keep their first page.
pub fn fold_chapter_starts(
    starts: &[ChapterStart],
    start_chapter: u32,
    end_chapter: u32,
    last_page: u32,
) -> Vec<ChapterRange> {
    let mut ranges: Vec<ChapterRange> = Vec::new();
    let mut emitted: Vec<u32> = Vec::new();

    for (i, start) in starts.iter().enumerate() {
        if emitted.contains(&start.chapter) {
            continue;
        }
        emitted.push(start.chapter);

        if start.chapter < start_chapter || start.chapter > end_chapter {
            continue;
        }

        let end_page = starts[i + 1..]
            .iter()
            .find(|next| next.chapter != start.chapter && next.page > start.page)
            .map(|next| next.page - 1)
            .unwrap_or(last_page)
            .max(start.page);

        ranges.push(ChapterRange {
            chapter: start.chapter,
            start_page: start.page,
            end_page,
        });
    }

    ranges.sort_by_key(|r| r.chapter);
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(chapter: u32, page: u32) -> ChapterStart {
        ChapterStart { chapter, page }
    }

    #[test]
    fn test_find_chapter_number() {
        assert_eq!(find_chapter_number("ตอนที่ 5 การเดินทาง"), Some(5));
        assert_eq!(find_chapter_number("ตอนที่12"), Some(12));
        assert_eq!(find_chapter_number("บทนำ"), None);
        assert_eq!(find_chapter_number(""), None);
    }

    #[test]
    fn test_find_chapter_number_thai_digits() {
        assert_eq!(find_chapter_number("ตอนที่ ๗"), Some(7));
        assert_eq!(find_chapter_number("ตอนที่ ๑๕ บทสรุป"), Some(15));
    }

    #[test]
    fn test_normalize_thai_digits() {
        assert_eq!(normalize_thai_digits("๐๑๒๓๔๕๖๗๘๙"), "0123456789");
        assert_eq!(normalize_thai_digits("หน้า ๓"), "หน้า 3");
        assert_eq!(normalize_thai_digits("plain 42"), "plain 42");
    }

    #[test]
    fn test_page_header_takes_leading_lines() {
        let text = "ตอนที่ 1\nชื่อเรื่อง\n\nเนื้อหาย่อหน้าแรก\nเนื้อหาย่อหน้าสอง";
        assert_eq!(page_header(text, 2, 200), "ตอนที่ 1\nชื่อเรื่อง");
    }

    #[test]
    fn test_page_header_caps_length() {
        let text = "หัวเรื่องยาวมาก".repeat(50);
        let header = page_header(&text, 3, 10);
        assert_eq!(header.chars().count(), 10);
    }

    #[test]
    fn test_page_header_empty_page() {
        assert_eq!(page_header("", 3, 200), "");
        assert_eq!(page_header(" \n \n ", 3, 200), "");
    }

    #[test]
    fn test_fold_sequential_chapters() {
        let starts = [start(1, 2), start(2, 6), start(3, 11)];
        let ranges = fold_chapter_starts(&starts, 1, 3, 20);

        assert_eq!(
            ranges,
            vec![
                ChapterRange { chapter: 1, start_page: 2, end_page: 5 },
                ChapterRange { chapter: 2, start_page: 6, end_page: 10 },
                ChapterRange { chapter: 3, start_page: 11, end_page: 20 },
            ]
        );
    }

    #[test]
    fn test_fold_filters_requested_range() {
        let starts = [start(1, 2), start(2, 6), start(3, 11)];
        let ranges = fold_chapter_starts(&starts, 2, 2, 20);

        assert_eq!(
            ranges,
            vec![ChapterRange { chapter: 2, start_page: 6, end_page: 10 }]
        );
    }

    #[test]
    fn test_fold_out_of_range_heading_still_closes_previous() {
        // Chapter 4 is past the requested range but still ends chapter 3
        let starts = [start(3, 5), start(4, 9)];
        let ranges = fold_chapter_starts(&starts, 3, 3, 30);

        assert_eq!(
            ranges,
            vec![ChapterRange { chapter: 3, start_page: 5, end_page: 8 }]
        );
    }

    #[test]
    fn test_fold_repeated_heading_keeps_first_page() {
        // Running headers repeat the chapter number on every page
        let starts = [start(1, 2), start(1, 3), start(1, 4), start(2, 5)];
        let ranges = fold_chapter_starts(&starts, 1, 2, 8);

        assert_eq!(
            ranges,
            vec![
                ChapterRange { chapter: 1, start_page: 2, end_page: 4 },
                ChapterRange { chapter: 2, start_page: 5, end_page: 8 },
            ]
        );
    }

    #[test]
    fn test_fold_no_matches() {
        assert!(fold_chapter_starts(&[], 1, 10, 50).is_empty());

        let starts = [start(20, 3)];
        assert!(fold_chapter_starts(&starts, 1, 10, 50).is_empty());
    }
}
