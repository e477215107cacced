//! Knowledge-base document loader.
//!
//! Recursively scans the knowledge-base directory for markdown docs and
//! Rust code samples, tagging each file with provenance metadata. The
//! harvesting scripts that populate the directory are a separate, offline
//! concern; the loader only reads what they deposited.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::error::RagError;
use crate::models::{ContentCategory, Document, FileType};

const INCLUDE_GLOBS: &[&str] = &["**/*.md", "**/*.rs"];
const EXCLUDE_GLOBS: &[&str] = &["**/.git/**", "**/target/**", "**/node_modules/**"];

/// Load all markdown and Rust files under `root`.
///
/// Fails with [`RagError::KnowledgeBase`] if the directory does not exist;
/// without a knowledge base there is nothing to retrieve from, so startup
/// cannot proceed. Results are sorted by relative path for deterministic
/// ordering; loading the same unchanged directory twice yields the same
/// document set.
pub fn load(root: &Path) -> Result<Vec<Document>, RagError> {
    if !root.is_dir() {
        return Err(RagError::KnowledgeBase {
            path: root.to_path_buf(),
            reason: "directory does not exist".to_string(),
        });
    }

    let include_set = build_globset(INCLUDE_GLOBS);
    let exclude_set = build_globset(EXCLUDE_GLOBS);

    let mut documents = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| RagError::KnowledgeBase {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        let file_type = file_type_of(&rel_str);
        documents.push(Document {
            category: categorize(relative, file_type),
            path: rel_str,
            file_type,
            content,
        });
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(count = documents.len(), root = %root.display(), "loaded knowledge base");

    Ok(documents)
}

fn file_type_of(rel_path: &str) -> FileType {
    if rel_path.ends_with(".md") {
        FileType::Markdown
    } else {
        FileType::Code
    }
}

/// Infer the content category from path segments with a fixed precedence:
/// `examples` segment > `src` segment > markdown extension > generic code.
fn categorize(relative: &Path, file_type: FileType) -> ContentCategory {
    let has_segment = |name: &str| {
        relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().eq_ignore_ascii_case(name))
    };

    if has_segment("examples") {
        ContentCategory::Example
    } else if has_segment("src") {
        ContentCategory::Source
    } else if file_type == FileType::Markdown {
        ContentCategory::Documentation
    } else {
        ContentCategory::Code
    }
}

fn build_globset(patterns: &[&str]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        // Patterns are compile-time constants; a failure here is a bug.
        builder.add(Glob::new(pattern).unwrap_or_else(|e| panic!("bad glob {pattern}: {e}")));
    }
    builder.build().expect("globset build")
}
