//! Overlap-aware text chunker.
//!
//! Splits document content into windows of at most `max_chars` characters,
//! preferring to break at a paragraph boundary (`\n\n`), then a line
//! boundary, then a word boundary, and only then at an arbitrary character.
//! Each chunk after the first starts `overlap` characters before the
//! previous chunk's end, so no semantic unit is fully severed at a split.
//!
//! Chunks record their byte offset into the parent document; dropping each
//! chunk's overlapping prefix and concatenating in index order reproduces
//! the original content exactly.

use uuid::Uuid;

use crate::models::{Chunk, Document};

/// Split a document into overlapping chunks.
///
/// `overlap` must be smaller than `max_chars` (enforced at config load).
/// An empty document yields zero chunks; a document of at most `max_chars`
/// characters yields exactly one. No produced chunk exceeds `max_chars`
/// characters; a single unbroken word longer than the limit is hard-split
/// at a character boundary rather than emitted oversized.
pub fn split_document(doc: &Document, max_chars: usize, overlap: usize) -> Vec<Chunk> {
    debug_assert!(overlap < max_chars);

    let text = doc.content.as_str();
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0i64;

    loop {
        let rest = &text[start..];
        let window_bytes = byte_len_of_chars(rest, max_chars);

        if window_bytes >= rest.len() {
            chunks.push(make_chunk(doc, index, start, rest));
            break;
        }

        let split = find_split(&rest[..window_bytes]);
        chunks.push(make_chunk(doc, index, start, &rest[..split]));
        index += 1;

        // Back up by `overlap` characters, but always make forward progress.
        let back = byte_len_of_trailing_chars(&rest[..split], overlap);
        start += if back < split { split - back } else { split };
    }

    chunks
}

/// Split all documents, preserving per-chunk provenance.
pub fn split_documents(docs: &[Document], max_chars: usize, overlap: usize) -> Vec<Chunk> {
    docs.iter()
        .flat_map(|doc| split_document(doc, max_chars, overlap))
        .collect()
}

/// Choose the split point within a full window: largest position that ends
/// a paragraph, else a line, else a word, else the whole window.
fn find_split(window: &str) -> usize {
    if let Some(p) = window.rfind("\n\n") {
        return p + 2;
    }
    if let Some(p) = window.rfind('\n') {
        return p + 1;
    }
    if let Some(p) = window.rfind(' ') {
        return p + 1;
    }
    window.len()
}

/// Byte length of the first `n` characters of `s` (all of `s` if shorter).
fn byte_len_of_chars(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

/// Byte length of the trailing `n` characters of `s` (all of `s` if shorter).
fn byte_len_of_trailing_chars(s: &str, n: usize) -> usize {
    let count = s.chars().count();
    if count <= n {
        return s.len();
    }
    let cut = s.char_indices().nth(count - n).map_or(s.len(), |(i, _)| i);
    s.len() - cut
}

fn make_chunk(doc: &Document, index: i64, start_offset: usize, text: &str) -> Chunk {
    Chunk {
        id: Uuid::new_v4().to_string(),
        source_path: doc.path.clone(),
        chunk_index: index,
        start_offset,
        file_type: doc.file_type,
        category: doc.category,
        text: text.to_string(),
    }
}
