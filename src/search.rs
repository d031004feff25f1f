//! Query matching and result rendering for the interactive path
//!
//! Pure and synchronous: everything it reads (entries, OCR text, thumbnail
//! paths) was loaded by the caller. A query matches an entry when it is a
//! case-insensitive substring of the entry text, or when its characters
//! appear in order with no more than `max_gap` characters skipped between
//! two consecutive matches. Images also match on their cached OCR text with
//! a looser gap.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::clipboard_history::{Entry, EntryKind, OcrIndex, ThumbnailStore};
use crate::config::SearchConfig;
use crate::utils::truncate_with_ellipsis;

/// Id of the placeholder result shown when nothing matches
pub const EMPTY_RESULT_ID: &str = "__empty__";

/// Restrict results to one entry kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    None,
    Images,
    Text,
}

impl TypeFilter {
    pub fn accepts(self, entry: &Entry) -> bool {
        match self {
            TypeFilter::None => true,
            TypeFilter::Images => entry.is_image(),
            TypeFilter::Text => !entry.is_image(),
        }
    }
}

impl FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "none" | "all" => Ok(TypeFilter::None),
            "images" | "image" => Ok(TypeFilter::Images),
            "text" => Ok(TypeFilter::Text),
            other => Err(format!("unknown filter '{}' (expected images or text)", other)),
        }
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeFilter::None => "none",
            TypeFilter::Images => "images",
            TypeFilter::Text => "text",
        })
    }
}

// ============================================
// MATCHING
// ============================================

/// Literal substring or gap-bounded ordered subsequence, case-insensitive.
/// An empty query matches everything.
pub fn matches(query: &str, text: &str, max_gap: usize) -> bool {
    if query.is_empty() {
        return true;
    }
    let query = query.to_lowercase();
    let text = text.to_lowercase();
    if text.contains(&query) {
        return true;
    }

    let query: Vec<char> = query.chars().collect();
    let text: Vec<char> = text.chars().collect();
    is_gap_bounded_subsequence(&query, &text, max_gap)
}

/// Whether `query` can be matched in order inside `text` with every pair of
/// consecutive matched positions at most `max_gap` characters apart.
///
/// Tracks every text position at which the query prefix can end, so a poor
/// early pick never hides a valid later alignment (greedy matching would
/// reject "abc" in "ab__a_bc" with a gap of 1).
fn is_gap_bounded_subsequence(query: &[char], text: &[char], max_gap: usize) -> bool {
    let Some((&first, rest)) = query.split_first() else {
        return true;
    };

    let mut reachable: Vec<usize> = positions_of(text, first).collect();

    for &ch in rest {
        if reachable.is_empty() {
            return false;
        }
        let mut next = Vec::new();
        let mut cursor = 0;
        let mut latest = None;
        for (pos, &c) in text.iter().enumerate() {
            // Closest reachable end strictly before `pos`
            while cursor < reachable.len() && reachable[cursor] < pos {
                latest = Some(reachable[cursor]);
                cursor += 1;
            }
            if c == ch && latest.is_some_and(|prev: usize| pos - prev - 1 <= max_gap) {
                next.push(pos);
            }
        }
        reachable = next;
    }

    !reachable.is_empty()
}

fn positions_of(text: &[char], ch: char) -> impl Iterator<Item = usize> + '_ {
    text.iter()
        .enumerate()
        .filter(move |&(_, &c)| c == ch)
        .map(|(pos, _)| pos)
}

/// Match an entry on its own text, and an image also on its OCR text
pub fn entry_matches(
    query: &str,
    entry: &Entry,
    ocr_text: Option<&str>,
    config: &SearchConfig,
) -> bool {
    if matches(query, &entry.content, config.text_max_gap) {
        return true;
    }
    entry.is_image() && ocr_text.is_some_and(|text| matches(query, text, config.ocr_max_gap))
}

// ============================================
// RENDERING
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Text,
    Image,
    Empty,
}

/// One row of output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    /// The raw history line, which copy/delete take back as input
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub kind: ResultKind,
}

impl ResultItem {
    /// Placeholder shown when there is nothing to list
    pub fn empty() -> Self {
        ResultItem {
            id: EMPTY_RESULT_ID.to_string(),
            name: "No clipboard entries".to_string(),
            description: "Copy something to see it here".to_string(),
            icon: "info".to_string(),
            thumbnail: None,
            kind: ResultKind::Empty,
        }
    }

    pub fn is_empty_placeholder(&self) -> bool {
        self.kind == ResultKind::Empty
    }
}

/// Render one entry.
///
/// Images are named by their dimensions and described by an OCR snippet
/// when one is cached. Long text is truncated with an ellipsis.
pub fn render(
    entry: &Entry,
    ocr_text: Option<&str>,
    thumbnail: Option<String>,
    config: &SearchConfig,
) -> ResultItem {
    match entry.kind {
        EntryKind::Image { width, height } => {
            let description = match ocr_text {
                Some(text) => {
                    truncate_with_ellipsis(&text.replace('\n', " "), config.ocr_preview_len)
                }
                None => "Image".to_string(),
            };
            ResultItem {
                id: entry.raw_line.clone(),
                name: format!("Image {}x{}", width, height),
                description,
                icon: "image".to_string(),
                thumbnail,
                kind: ResultKind::Image,
            }
        }
        EntryKind::Text => ResultItem {
            id: entry.raw_line.clone(),
            name: truncate_with_ellipsis(&entry.content, config.text_display_len),
            description: "Text".to_string(),
            icon: "content_paste".to_string(),
            thumbnail: None,
            kind: ResultKind::Text,
        },
    }
}

/// Filter and render `entries` (newest first) against the cache snapshot.
///
/// Never returns an empty list: no match yields the placeholder result.
/// Thumbnails are only referenced when their file exists.
pub fn search_entries(
    entries: &[Entry],
    query: &str,
    filter: TypeFilter,
    ocr_index: &OcrIndex,
    thumbnails: &ThumbnailStore,
    config: &SearchConfig,
) -> Vec<ResultItem> {
    let mut results: Vec<ResultItem> = entries
        .iter()
        .filter(|entry| filter.accepts(entry))
        .filter_map(|entry| {
            let hash = entry.is_image().then(|| entry.content_hash());
            let ocr_text = hash.as_ref().and_then(|h| ocr_index.text(h));
            if !entry_matches(query, entry, ocr_text, config) {
                return None;
            }
            let thumbnail = hash
                .as_ref()
                .and_then(|h| thumbnails.lookup(h))
                .map(|path| path.display().to_string());
            Some(render(entry, ocr_text, thumbnail, config))
        })
        .collect();

    if results.is_empty() {
        results.push(ResultItem::empty());
    }
    results
}
