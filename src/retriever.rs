//! Similarity retriever over the vector index.
//!
//! Embeds the question with the same provider that built the index and
//! returns the top-K chunks, dropping similarity scores at this boundary.
//! The provider identity contract is enforced when the index is opened
//! (see [`crate::index::VectorIndex::open`]), not here.

use crate::embedding::{embed_query, Embedder};
use crate::error::RagError;
use crate::index::VectorIndex;
use crate::models::Chunk;

/// Return the up-to-`k` chunks most similar to `question`.
pub async fn retrieve(
    embedder: &dyn Embedder,
    index: &VectorIndex,
    question: &str,
    k: usize,
) -> Result<Vec<Chunk>, RagError> {
    let query_vec = embed_query(embedder, question).await?;
    let scored = index.query(&query_vec, k).await?;
    tracing::debug!(k, retrieved = scored.len(), "retrieval complete");
    Ok(scored.into_iter().map(|s| s.chunk).collect())
}
