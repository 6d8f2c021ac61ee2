//! Citation extraction from generated answers.
//!
//! Two marker styles are recognised: excerpt labels such as `[S2]` or
//! `[S1, S3]`, and source markers such as `(leave.pdf, page 4)`. Markers are
//! only ever resolved against the chunks that were in the prompt, so an
//! answer can't cite something it was never shown.

use crate::types::{Citation, CitationMode, ScoredChunk};
use std::collections::HashSet;

/// Longest bracket or parenthesis body considered a marker.
const MAX_MARKER_LEN: usize = 200;

/// Extract citations from `answer`, resolved against `retrieved` (the
/// chunks in prompt order).
///
/// Citations come back in order of first mention, one per document page.
/// If the answer carries no resolvable marker, every retrieved chunk is
/// listed instead and the mode says so.
pub fn extract_citations(answer: &str, retrieved: &[ScoredChunk]) -> (Vec<Citation>, CitationMode) {
    if retrieved.is_empty() {
        return (Vec::new(), CitationMode::None);
    }

    let mut mentions: Vec<(usize, usize)> = Vec::new();
    mentions.extend(label_mentions(answer, retrieved.len()));
    mentions.extend(source_mentions(answer, retrieved));
    mentions.sort_unstable();

    let explicit = dedupe(mentions.into_iter().map(|(_, idx)| &retrieved[idx]));
    if !explicit.is_empty() {
        return (explicit, CitationMode::Explicit);
    }

    (dedupe(retrieved.iter()), CitationMode::SourcesConsulted)
}

/// One citation per (document, page), keeping the first occurrence.
fn dedupe<'a>(hits: impl Iterator<Item = &'a ScoredChunk>) -> Vec<Citation> {
    let mut seen = HashSet::new();
    hits.filter(|hit| seen.insert((hit.chunk.document.clone(), hit.chunk.page)))
        .map(|hit| Citation {
            document: hit.chunk.document.clone(),
            page: hit.chunk.page,
            chunk_id: hit.chunk.id.clone(),
        })
        .collect()
}

/// Delimited spans `(position, body)` opened by `open` and closed by `close`.
fn spans(text: &str, open: char, close: char) -> Vec<(usize, &str)> {
    text.match_indices(open)
        .filter_map(|(start, _)| {
            let body_start = start + open.len_utf8();
            let end = text[body_start..].find(close)?;
            (end <= MAX_MARKER_LEN).then(|| (start, &text[body_start..body_start + end]))
        })
        .collect()
}

/// `[S<n>]` labels, as (position, chunk index).
fn label_mentions(answer: &str, count: usize) -> Vec<(usize, usize)> {
    let mut mentions = Vec::new();
    for (pos, body) in spans(answer, '[', ']') {
        for part in body.split(|c: char| c == ',' || c == ';' || c.is_whitespace()) {
            let rank = part
                .strip_prefix('S')
                .or_else(|| part.strip_prefix('s'))
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(rank) = rank.filter(|r| (1..=count).contains(r)) {
                mentions.push((pos, rank - 1));
            }
        }
    }
    mentions
}

/// `(document, page N)` markers, as (position, chunk index).
fn source_mentions(answer: &str, retrieved: &[ScoredChunk]) -> Vec<(usize, usize)> {
    let mut mentions = Vec::new();
    for (pos, body) in spans(answer, '(', ')') {
        let lower = body.to_lowercase();
        let pages = page_numbers(&lower);
        if pages.is_empty() {
            continue;
        }
        for (idx, hit) in retrieved.iter().enumerate() {
            if pages.contains(&hit.chunk.page)
                && names_document(&lower, &hit.chunk.document.to_lowercase())
            {
                mentions.push((pos, idx));
            }
        }
    }
    mentions
}

/// Whether `body` mentions `document` as a whole name, so `a.pdf` is not
/// found inside `data.pdf` or `a.pdf.bak`.
fn names_document(body: &str, document: &str) -> bool {
    let is_name_char = |c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.');
    !document.is_empty()
        && body.match_indices(document).any(|(start, _)| {
            let before = body[..start].chars().next_back();
            let after = body[start + document.len()..].chars().next();
            !before.is_some_and(is_name_char) && !after.is_some_and(is_name_char)
        })
}

/// Page numbers following "page" or "pages" in a lowercased marker body,
/// e.g. "page 4" or "pages 4, 5".
fn page_numbers(body: &str) -> Vec<u32> {
    let mut pages = Vec::new();
    for (start, _) in body.match_indices("page") {
        let rest = body[start + 4..].trim_start_matches('s');

        // Numbers run until the next word
        let end = rest.find(|c: char| c.is_alphabetic()).unwrap_or(rest.len());
        pages.extend(
            rest[..end]
                .split(|c: char| !c.is_ascii_digit())
                .filter_map(|n| n.parse::<u32>().ok()),
        );
    }
    pages
}
