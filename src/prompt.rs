//! Prompt composition.
//!
//! Merges retrieved chunk text and the user question into the fixed
//! template sent to the completion endpoint. Pure string work, no model
//! calls, no side effects. When retrieval returns nothing the context
//! block is empty and the template's own instructions tell the model to
//! say the context is insufficient rather than invent an answer.

use crate::models::Chunk;

const TEMPLATE_HEADER: &str = "\
You are an expert RadixDLT and Scrypto developer assistant. Use the provided \
context to answer questions about RadixDLT, Scrypto, blockchain development, \
and Rust programming.

Guidelines:
- Provide accurate, technical information based on the context
- Include relevant code examples when available
- Explain concepts clearly for developers
- If the context doesn't contain enough information, say so
- Focus on practical, actionable advice";

/// Separator between chunk texts in the context block.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Build the full prompt from the question and retrieved chunks, which are
/// concatenated in retrieval order (most relevant first).
pub fn compose(question: &str, chunks: &[Chunk]) -> String {
    let context = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!("{TEMPLATE_HEADER}\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer: ")
}
