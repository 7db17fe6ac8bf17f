use std::collections::VecDeque;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::loader::Document;

/// Separators tried in order, coarsest first. The empty separator splits
/// between characters and always applies.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Text chunk produced by the splitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk id
    pub id: Uuid,
    /// Raw text of the chunk (trimmed)
    pub text: String,
    /// File the chunk came from
    pub source: String,
    /// 1-based page number for paged formats
    pub page: Option<u32>,
    /// Character offset of the first character within the page text
    pub start: usize,
    /// Character offset after the last character
    pub end: usize,
}

impl Chunk {
    pub fn new(
        text: String,
        source: impl Into<String>,
        page: Option<u32>,
        start: usize,
        end: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            source: source.into(),
            page,
            start,
            end,
        }
    }
}

/// Recursive character splitter with overlap, measured in characters.
///
/// Text is cut on the coarsest separator present; pieces still longer than
/// `size` are cut again with the next separator. Adjacent pieces are merged
/// back up to `size`, and each new chunk starts with trailing pieces of the
/// previous one totalling at most `overlap` characters.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    size: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(size: usize, overlap: usize) -> Self {
        Self::with_separators(size, overlap, DEFAULT_SEPARATORS)
    }

    pub fn with_separators(size: usize, overlap: usize, separators: &[&str]) -> Self {
        let size = size.max(1);
        let mut separators: Vec<String> = separators.iter().map(|s| s.to_string()).collect();
        if separators.last().map_or(true, |s| !s.is_empty()) {
            separators.push(String::new());
        }
        Self {
            size,
            overlap: overlap.min(size.saturating_sub(1)),
            separators,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split a loaded document.
    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        self.split(&doc.text, &doc.source, doc.page)
    }

    /// Split many documents, keeping document order.
    pub fn split_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter().flat_map(|d| self.split_document(d)).collect()
    }

    /// Split raw text into overlapping chunks.
    pub fn split(&self, text: &str, source: &str, page: Option<u32>) -> Vec<Chunk> {
        let mut ranges = Vec::new();
        self.split_range(text, 0..text.len(), 0, &mut ranges);

        ranges
            .into_iter()
            .filter_map(|range| trim_range(text, range))
            .map(|range| {
                let start = text[..range.start].chars().count();
                let chunk_text = text[range].to_string();
                let end = start + chunk_text.chars().count();
                Chunk::new(chunk_text, source, page, start, end)
            })
            .collect()
    }

    fn split_range(
        &self,
        text: &str,
        range: Range<usize>,
        level: usize,
        out: &mut Vec<Range<usize>>,
    ) {
        let segment = &text[range.clone()];
        let level = (level..self.separators.len())
            .find(|&i| {
                let sep = &self.separators[i];
                sep.is_empty() || segment.contains(sep.as_str())
            })
            .unwrap_or(self.separators.len() - 1);
        let separator = self.separators[level].as_str();

        let mut pending: Vec<Range<usize>> = Vec::new();
        for piece in pieces(text, range, separator) {
            if char_len(text, &piece) <= self.size {
                pending.push(piece);
                continue;
            }
            self.merge(text, std::mem::take(&mut pending), out);
            if level + 1 < self.separators.len() {
                self.split_range(text, piece, level + 1, out);
            } else {
                out.push(piece);
            }
        }
        self.merge(text, pending, out);
    }

    /// Merge contiguous pieces into chunks of at most `size` characters.
    fn merge(&self, text: &str, pieces: Vec<Range<usize>>, out: &mut Vec<Range<usize>>) {
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(text, &piece);
            if total + len > self.size && !window.is_empty() {
                out.push(span(&window));
                while total > self.overlap || (total + len > self.size && total > 0) {
                    match window.pop_front() {
                        Some((_, popped)) => total -= popped,
                        None => break,
                    }
                }
            }
            total += len;
            window.push_back((piece, len));
        }

        if !window.is_empty() {
            out.push(span(&window));
        }
    }
}

/// Cut `range` at every occurrence of `separator`, keeping the separator at
/// the start of the following piece so pieces stay contiguous.
fn pieces(text: &str, range: Range<usize>, separator: &str) -> Vec<Range<usize>> {
    let segment = &text[range.clone()];
    let base = range.start;

    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(i, c)| base + i..base + i + c.len_utf8())
            .collect();
    }

    let mut out = Vec::new();
    let mut last = 0;
    for (idx, _) in segment.match_indices(separator) {
        if idx > last {
            out.push(base + last..base + idx);
        }
        last = idx;
    }
    if last < segment.len() {
        out.push(base + last..base + segment.len());
    }
    out
}

fn span(window: &VecDeque<(Range<usize>, usize)>) -> Range<usize> {
    let start = window.front().map(|(r, _)| r.start).unwrap_or(0);
    let end = window.back().map(|(r, _)| r.end).unwrap_or(start);
    start..end
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

fn trim_range(text: &str, range: Range<usize>) -> Option<Range<usize>> {
    let segment = &text[range.clone()];
    let leading = segment.len() - segment.trim_start().len();
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = range.start + leading;
    Some(start..start + trimmed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn short_text_is_single_chunk() {
        let splitter = TextSplitter::new(300, 20);
        let chunks = splitter.split("  Restart the VPN client.  ", "kb.txt", None);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Restart the VPN client.");
        assert_eq!(chunks[0].start, 2);
        assert_eq!(chunks[0].end, 25);
    }

    #[test]
    fn empty_text_returns_empty() {
        let splitter = TextSplitter::new(10, 2);
        assert!(splitter.split("", "x", None).is_empty());
        assert!(splitter.split("   \t\n  ", "x", None).is_empty());
    }

    #[test]
    fn paragraphs_split_first() {
        let splitter = TextSplitter::new(12, 0);
        let chunks = splitter.split("aaaa bbbb\n\ncccc dddd", "doc", Some(3));

        assert_eq!(texts(&chunks), vec!["aaaa bbbb", "cccc dddd"]);
        assert_eq!(chunks[1].start, 11);
        assert_eq!(chunks[1].end, 20);
        assert!(chunks.iter().all(|c| c.page == Some(3)));
    }

    #[test]
    fn words_overlap_between_chunks() {
        let splitter = TextSplitter::new(10, 5);
        let chunks = splitter.split("one two three four", "doc", None);

        assert_eq!(texts(&chunks), vec!["one two", "two three", "four"]);
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let splitter = TextSplitter::new(4, 0);
        let chunks = splitter.split("abcdefghij", "doc", None);

        assert_eq!(texts(&chunks), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn chunks_never_exceed_size() {
        let splitter = TextSplitter::new(30, 5);
        let text = "Outlook keeps asking for a password.\n\nOpen Control Panel, then Mail, \
                    then Show Profiles and remove the broken profile.\nRestart Outlook and \
                    sign in again with your university account.";
        let chunks = splitter.split(text, "doc", None);

        assert!(chunks.len() > 3);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 30, "too long: {:?}", chunk.text);
            assert!(!chunk.text.is_empty());
        }
    }

    #[test]
    fn offsets_point_back_into_source() {
        let splitter = TextSplitter::new(16, 4);
        let text = "Printer offline?\nCheck the cable.\n\nStill offline? Reinstall the driver.";
        let chars: Vec<char> = text.chars().collect();

        for chunk in splitter.split(text, "doc", None) {
            let slice: String = chars[chunk.start..chunk.end].iter().collect();
            assert_eq!(slice, chunk.text);
        }
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        // The separator travels with the following piece, so " ààààà" is 6 chars.
        let splitter = TextSplitter::new(6, 0);
        let chunks = splitter.split("ééééé ààààà", "doc", None);

        assert_eq!(texts(&chunks), vec!["ééééé", "ààààà"]);
        assert_eq!(chunks[1].start, 6);
        assert_eq!(chunks[1].end, 11);
    }

    #[test]
    fn overlap_is_clamped_below_size() {
        let splitter = TextSplitter::new(3, 10);
        assert_eq!(splitter.overlap(), 2);
        assert!(!splitter.split("a b c d e f g", "doc", None).is_empty());
    }

    #[test]
    fn zero_size_uses_minimum() {
        let splitter = TextSplitter::new(0, 0);
        assert_eq!(splitter.size(), 1);
        assert_eq!(splitter.split("ab", "doc", None).len(), 2);
    }

    #[test]
    fn custom_separators_get_character_fallback() {
        let splitter = TextSplitter::with_separators(3, 0, &[";"]);
        let chunks = splitter.split("abcdef", "doc", None);
        assert_eq!(texts(&chunks), vec!["abc", "def"]);
    }

    #[test]
    fn split_documents_keeps_order_and_metadata() {
        let splitter = TextSplitter::new(300, 20);
        let docs = vec![
            Document::new("page one", "manual.pdf", Some(1)),
            Document::new("page two", "manual.pdf", Some(2)),
        ];
        let chunks = splitter.split_documents(&docs);

        assert_eq!(texts(&chunks), vec!["page one", "page two"]);
        assert_eq!(chunks[0].page, Some(1));
        assert_eq!(chunks[1].page, Some(2));
        assert_eq!(chunks[1].source, "manual.pdf");
    }

    #[test]
    fn chunk_has_unique_id() {
        let c1 = Chunk::new("text1".into(), "src", None, 0, 5);
        let c2 = Chunk::new("text1".into(), "src", None, 0, 5);
        assert_ne!(c1.id, c2.id);
    }
}
