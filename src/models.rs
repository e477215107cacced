//! Core data models used throughout scrypto-sage.
//!
//! These types represent the documents, chunks, and responses that flow
//! through the ingestion and answering pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// File kind of a knowledge-base document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Markdown,
    Code,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Markdown => "markdown",
            FileType::Code => "code",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "markdown" => Some(FileType::Markdown),
            "code" => Some(FileType::Code),
            _ => None,
        }
    }
}

/// Content classification used for source attribution.
///
/// Inferred from the document's path with a fixed precedence:
/// an `examples` path segment wins over a `src` segment, which wins over
/// the markdown extension; everything else is generic code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Documentation,
    Example,
    Source,
    Code,
}

impl ContentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Documentation => "documentation",
            ContentCategory::Example => "example",
            ContentCategory::Source => "source",
            ContentCategory::Code => "code",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "documentation" => Some(ContentCategory::Documentation),
            "example" => Some(ContentCategory::Example),
            "source" => Some(ContentCategory::Source),
            "code" => Some(ContentCategory::Code),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A knowledge-base file read by the loader, tagged with provenance.
///
/// Immutable once read; lives for a single ingestion pass.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the knowledge-base root.
    pub path: String,
    pub file_type: FileType,
    pub category: ContentCategory,
    pub content: String,
}

/// An overlap-aware slice of a document, the unit of embedding and retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    /// Relative path of the parent document.
    pub source_path: String,
    /// Position within the parent document, contiguous from 0.
    pub chunk_index: i64,
    /// Byte offset of this chunk's text within the parent document.
    /// Lets callers verify that de-overlapped chunks reconstruct the
    /// original content exactly.
    pub start_offset: usize,
    pub file_type: FileType,
    pub category: ContentCategory,
    pub text: String,
}

impl Chunk {
    /// Final path component of the parent document, for citation display.
    pub fn filename(&self) -> &str {
        self.source_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.source_path)
    }
}

/// A chunk paired with its similarity score, as returned by the index.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Provenance record accompanying a synthesized answer.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub filename: String,
    pub category: ContentCategory,
    pub snippet: String,
}

/// A complete answer to one question, with source citations in
/// retrieval order (most relevant first).
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// One question/answer exchange, owned by the caller.
///
/// The pipeline never reads or writes conversation history; retention is
/// the chat front-end's concern.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub asked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrip() {
        for cat in [
            ContentCategory::Documentation,
            ContentCategory::Example,
            ContentCategory::Source,
            ContentCategory::Code,
        ] {
            assert_eq!(ContentCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(ContentCategory::parse("unknown"), None);
    }

    #[test]
    fn filename_strips_directories() {
        let chunk = Chunk {
            id: "c1".into(),
            source_path: "docs/guides/blueprints.md".into(),
            chunk_index: 0,
            start_offset: 0,
            file_type: FileType::Markdown,
            category: ContentCategory::Documentation,
            text: String::new(),
        };
        assert_eq!(chunk.filename(), "blueprints.md");
    }
}
