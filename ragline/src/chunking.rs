//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits text on the strongest structural boundary available (paragraph,
//! line, sentence, word, character) and merges the pieces back into chunks
//! bounded by a character budget, with overlap between neighbours.

use std::ops::Range;

use crate::config::RagConfig;
use crate::document::{Chunk, Document};

/// Separators tried by [`RecursiveChunker`], strongest first.
///
/// The empty string means "any character boundary".
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically, then merges pieces greedily up to `chunk_size`.
///
/// Lengths are counted in `char`s. Splitting keeps each separator attached
/// to the piece it ends, so chunk boundaries fall right after a paragraph
/// break, line break, sentence end or space. A piece that exceeds
/// `chunk_size` with no weaker separator left is emitted whole as an
/// oversized chunk.
///
/// When a chunk is emitted, the next chunk starts with the longest suffix
/// of it that begins right after a separator and holds at most
/// `chunk_overlap` non-trailing-whitespace chars. The strongest separator
/// with a boundary in that window wins. If none has one and `""` is among
/// the separators, the window is cut at a char boundary instead.
/// The window shrinks so that seed and next piece fit in `chunk_size`;
/// the seed is dropped only when the next piece leaves no room.
///
/// Chunk IDs are `{document_id}_{chunk_index}`. Each chunk inherits the
/// parent document's metadata plus `chunk_index` and `start_index` (the
/// char offset of the chunk in the document text).
///
/// # Example
///
/// ```rust,ignore
/// use ragline::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(200, 50);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` with [`DEFAULT_SEPARATORS`].
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — maximum number of characters repeated between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a chunker from the size and overlap of a validated [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the separator list, strongest first.
    ///
    /// Without `""` in the list, text with no separator left is never cut
    /// mid-token and may produce oversized chunks.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum overlap in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split raw text into trimmed, non-empty chunk texts.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_spans(text).into_iter().map(|span| text[span].to_string()).collect()
    }

    /// Byte ranges of the trimmed chunks within `text`.
    fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut atoms = Vec::new();
        atomize(text, 0, &self.separators, self.chunk_size, &mut atoms);

        let mut spans = Vec::new();
        let mut current: Option<(Range<usize>, usize)> = None;

        for atom in atoms {
            let atom_len = char_len(&text[atom.clone()]);
            current = Some(match current.take() {
                None => (atom, atom_len),
                Some((span, len)) if len + atom_len <= self.chunk_size => {
                    (span.start..atom.end, len + atom_len)
                }
                Some((span, _)) => {
                    let room = self.chunk_size.saturating_sub(atom_len);
                    let seed = self.overlap_seed(&text[span.clone()], room);
                    let start = span.start;
                    spans.push(span);
                    match seed {
                        Some((offset, seed_len)) => (start + offset..atom.end, seed_len + atom_len),
                        None => (atom, atom_len),
                    }
                }
            });
        }
        if let Some((span, _)) = current {
            spans.push(span);
        }

        spans
            .into_iter()
            .filter_map(|span| {
                let raw = &text[span.clone()];
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return None;
                }
                let start = span.start + (raw.len() - raw.trim_start().len());
                Some(start..start + trimmed.len())
            })
            .collect()
    }

    /// Where the overlap seed starts within `chunk` (byte offset) and its
    /// length in chars, trailing whitespace included. The seed never takes
    /// more than `room` chars.
    fn overlap_seed(&self, chunk: &str, room: usize) -> Option<(usize, usize)> {
        let core = chunk.trim_end();
        let tail = char_len(&chunk[core.len()..]);
        let budget = self.chunk_overlap.min(room.saturating_sub(tail));
        if budget == 0 {
            return None;
        }
        let total = char_len(core);
        let window_chars = total.saturating_sub(budget).max(1);
        if window_chars >= total {
            return None;
        }
        let window = core.char_indices().nth(window_chars).map(|(i, _)| i)?;

        let mut seed_start = self.separators.iter().filter(|s| !s.is_empty()).find_map(|sep| {
            core.match_indices(sep.as_str())
                .map(|(pos, _)| pos + sep.len())
                .find(|&end| end >= window && end < core.len())
        });

        // no structural boundary in the window: any char boundary is a separator
        if seed_start.is_none() && self.separators.iter().any(String::is_empty) {
            seed_start = Some(window);
        }

        let start = seed_start?;
        Some((start, char_len(&chunk[start..])))
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.text;
        if text.trim().is_empty() {
            return Vec::new();
        }

        self.split_spans(text)
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), i.into());
                metadata.insert("start_index".to_string(), char_len(&text[..span.start]).into());
                Chunk {
                    id: format!("{}_{i}", document.id),
                    document_id: document.id.clone(),
                    text: text[span].to_string(),
                    metadata,
                }
            })
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Break `text` into pieces no longer than `size`, using the strongest
/// separator present and recursing into oversize pieces with weaker ones.
/// Pushes absolute byte ranges (offset by `offset`) in text order.
fn atomize(
    text: &str,
    offset: usize,
    separators: &[String],
    size: usize,
    atoms: &mut Vec<Range<usize>>,
) {
    if char_len(text) <= size {
        atoms.push(offset..offset + text.len());
        return;
    }

    let Some(pos) = separators.iter().position(|s| s.is_empty() || text.contains(s.as_str()))
    else {
        // indivisible
        atoms.push(offset..offset + text.len());
        return;
    };
    let weaker = &separators[pos + 1..];

    for piece in split_after(text, &separators[pos]) {
        let piece_text = &text[piece.clone()];
        let start = offset + piece.start;
        if char_len(piece_text) <= size {
            atoms.push(start..start + piece_text.len());
        } else {
            atomize(piece_text, start, weaker, size, atoms);
        }
    }
}

/// Split at every occurrence of `separator`, keeping it attached to the
/// preceding piece. An empty separator splits between characters.
fn split_after(text: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| i..i + c.len_utf8()).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        let end = pos + separator.len();
        pieces.push(start..end);
        start = end;
    }
    if start < text.len() {
        pieces.push(start..text.len());
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MetadataValue;

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = RecursiveChunker::new(100, 20);
        assert_eq!(chunker.split_text("  short text \n"), vec!["short text"]);
        assert!(chunker.split_text("").is_empty());
        assert!(chunker.split_text(" \n\n ").is_empty());
    }

    #[test]
    fn word_boundaries_with_overlap() {
        let chunker = RecursiveChunker::new(12, 5);
        assert_eq!(
            chunker.split_text("one two three four five six seven"),
            vec!["one two", "two three", "three four", "four five", "five six", "six seven"]
        );
    }

    #[test]
    fn prefers_paragraph_then_sentence_boundaries() {
        let chunker = RecursiveChunker::new(40, 10);
        let text = "First paragraph here.\n\nSecond paragraph is longer than the limit. \
                    It has two sentences.";
        assert_eq!(
            chunker.split_text(text),
            vec![
                "First paragraph here.\n\nSecond paragraph",
                "paragraph is longer than the limit.",
                "the limit. It has two sentences.",
            ]
        );
    }

    #[test]
    fn falls_back_to_characters() {
        let chunker = RecursiveChunker::new(10, 3);
        assert_eq!(
            chunker.split_text("abcdefghijklmnopqrstuvwxyz"),
            vec!["abcdefghij", "hijklmnopq", "opqrstuvwx", "vwxyz"]
        );
    }

    #[test]
    fn char_split_token_keeps_overlap_after_a_space() {
        let chunker = RecursiveChunker::new(10, 3);
        assert_eq!(
            chunker.split_text("hello abcdefghijklmnopqrst"),
            vec!["hello abcd", "bcdefghijk", "ijklmnopqr", "pqrst"]
        );
        assert_eq!(
            RecursiveChunker::new(5, 3).split_text("x\n\n\nabcdefgh"),
            vec!["x\n\n\na", "abcd", "bcdef", "defgh"]
        );
    }

    #[test]
    fn indivisible_token_is_emitted_oversized() {
        let chunker = RecursiveChunker::new(10, 3).with_separators(["\n\n", " "]);
        let text = "tiny abcdefghijklmnopqrstuvwxyz end";
        assert_eq!(chunker.split_text(text), vec!["tiny", "abcdefghijklmnopqrstuvwxyz", "end"]);
    }

    #[test]
    fn lengths_are_counted_in_chars() {
        let chunker = RecursiveChunker::new(11, 6);
        assert_eq!(
            chunker.split_text("ééééé ààààà ççççç"),
            vec!["ééééé", "éééé ààààà", "ààààà ççççç"]
        );
    }

    #[test]
    fn chunks_carry_ids_and_positions() {
        let doc = Document::new("doc", "one two three four five six seven")
            .with_metadata("source", "notes.txt");
        let chunks = RecursiveChunker::new(12, 5).chunk(&doc);

        assert_eq!(chunks.len(), 6);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, format!("doc_{i}"));
            assert_eq!(chunk.document_id, "doc");
            assert_eq!(chunk.metadata["source"], MetadataValue::from("notes.txt"));
            assert_eq!(chunk.metadata["chunk_index"].as_i64(), Some(i as i64));
            let start = chunk.metadata["start_index"].as_i64().unwrap() as usize;
            assert!(doc.text[start..].starts_with(&chunk.text));
        }
        assert_eq!(chunks[1].metadata["start_index"].as_i64(), Some(4));
    }

    #[test]
    fn whitespace_document_has_no_chunks() {
        let doc = Document::new("blank", "   \n ");
        assert!(RecursiveChunker::new(10, 2).chunk(&doc).is_empty());
    }
}
