//! Search term selection and snippet extraction.
//!
//! Matching itself happens upstream; this only decides which terms are worth
//! sending and cuts display snippets around local matches.

use crate::content::Item;

/// Terms shorter than this are ignored unless they contain CJK characters.
pub const MIN_TERM_CHARS: usize = 3;

const ELLIPSIS: &str = "…";

/// Qualifying search terms, in input order, without duplicates.
///
/// `"a, 中, abc"` yields `["中", "abc"]`.
pub fn terms(search: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in search
        .split(|c: char| c == ',' || c == '，' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        let qualifies = term.chars().count() >= MIN_TERM_CHARS || term.chars().any(is_cjk);
        if qualifies && !terms.iter().any(|t| t.to_lowercase() == term.to_lowercase()) {
            terms.push(term.to_string());
        }
    }
    terms
}

/// Han ideographs, kana and hangul.
pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7AF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2A6DF)
}

/// Text fields searched for snippets, across every language variant.
pub fn searchable_segments(item: &Item) -> Vec<&str> {
    let mut segments = item.title.all_values();
    for field in [&item.title_alt, &item.description, &item.text]
        .into_iter()
        .flatten()
    {
        segments.extend(field.all_values());
    }
    segments.retain(|s| !s.is_empty());
    segments
}

/// Up to `max` non-overlapping snippets around term matches, `radius`
/// characters either side, in text order per segment.
pub fn snippets(segments: &[&str], terms: &[String], radius: usize, max: usize) -> Vec<String> {
    let needles: Vec<Vec<char>> = terms.iter().map(|t| fold(t)).collect();
    let mut snippets = Vec::new();

    for segment in segments {
        if snippets.len() >= max {
            break;
        }
        let chars: Vec<char> = segment.chars().collect();
        let haystack = fold(segment);

        let mut hits: Vec<(usize, usize)> = Vec::new();
        for needle in needles.iter().filter(|n| !n.is_empty()) {
            let mut start = 0;
            while start + needle.len() <= haystack.len() {
                if haystack[start..start + needle.len()] == needle[..] {
                    hits.push((start, start + needle.len()));
                    start += needle.len();
                } else {
                    start += 1;
                }
            }
        }
        hits.sort();

        let mut covered_to = 0;
        for (start, end) in hits {
            if snippets.len() >= max {
                break;
            }
            if start < covered_to {
                continue;
            }
            let from = start.saturating_sub(radius);
            let to = (end + radius).min(chars.len());
            covered_to = to;

            let body: String = chars[from..to].iter().collect();
            let mut snippet = String::new();
            if from > 0 {
                snippet.push_str(ELLIPSIS);
            }
            snippet.push_str(body.trim());
            if to < chars.len() {
                snippet.push_str(ELLIPSIS);
            }
            snippets.push(snippet);
        }
    }
    snippets
}

/// Per-character lowercase that keeps indices aligned with the input.
fn fold(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}
