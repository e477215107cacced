//! The answering pipeline.
//!
//! [`RagPipeline`] ties the components together: at startup it opens the
//! persisted vector index (or builds one from the knowledge base when
//! nothing is persisted; embedding is the expensive step and must not be
//! repeated on every run), then serves `ask()` calls that run retrieval,
//! prompt composition, synthesis, and response assembly, strictly in that
//! order, blocking end-to-end.
//!
//! The pipeline is stateless between calls: it never reads or writes
//! conversation history, and the index is read-only once built. State
//! machine: `Uninitialized → Ready` via [`RagPipeline::init`]; any failure
//! during initialization is fatal, and `ask()` on a pipeline that is not
//! `Ready` fails with [`RagError::NotReady`].

use std::sync::Arc;

use crate::chunker;
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::RagError;
use crate::index::VectorIndex;
use crate::loader;
use crate::models::{Chunk, Response, SourceRef};
use crate::prompt;
use crate::retriever;
use crate::synth::{OpenRouterSynthesizer, Synthesizer};

/// Maximum characters of chunk text shown in a source citation.
const SNIPPET_MAX_CHARS: usize = 200;

/// Counts reported after an index build.
#[derive(Debug, Clone, Copy)]
pub struct IndexReport {
    pub documents: usize,
    pub chunks: usize,
}

enum State {
    Uninitialized,
    Ready { index: VectorIndex },
}

pub struct RagPipeline {
    config: Config,
    embedder: Arc<dyn Embedder>,
    synthesizer: Arc<dyn Synthesizer>,
    state: State,
}

impl RagPipeline {
    /// Construct with the providers named in the configuration.
    ///
    /// Fails with [`RagError::CredentialMissing`] when the completion
    /// endpoint credential is absent; a misconfigured pipeline must never
    /// reach `Ready`.
    pub fn new(config: Config) -> Result<Self, RagError> {
        let embedder = create_embedder(&config.embedding)?;
        let synthesizer: Arc<dyn Synthesizer> =
            Arc::new(OpenRouterSynthesizer::new(&config.synthesis)?);
        Ok(Self::with_components(config, embedder, synthesizer))
    }

    /// Construct with explicit providers. This is the seam tests and
    /// embedding callers use to substitute backends.
    pub fn with_components(
        config: Config,
        embedder: Arc<dyn Embedder>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            config,
            embedder,
            synthesizer,
            state: State::Uninitialized,
        }
    }

    /// Reach `Ready`: open the persisted index if one exists, otherwise
    /// load the knowledge base, chunk it, and build the index.
    pub async fn init(&mut self) -> Result<(), RagError> {
        let path = &self.config.index.path;
        let index = if VectorIndex::exists(path) {
            VectorIndex::open(path, self.embedder.as_ref()).await?
        } else {
            let (index, report) = build(&self.config, self.embedder.as_ref()).await?;
            tracing::info!(
                documents = report.documents,
                chunks = report.chunks,
                "no persisted index found; built from knowledge base"
            );
            index
        };
        self.state = State::Ready { index };
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    /// Model identifier answers are synthesized with.
    pub fn model_id(&self) -> &str {
        self.synthesizer.model_id()
    }

    /// Answer one question: retrieve, compose, synthesize, assemble.
    ///
    /// Retrieval returning zero chunks is not an error: the prompt still
    /// instructs the model to state that context is insufficient, and the
    /// response carries an empty source list.
    pub async fn ask(&self, question: &str) -> Result<Response, RagError> {
        let State::Ready { index } = &self.state else {
            return Err(RagError::NotReady);
        };

        let chunks = retriever::retrieve(
            self.embedder.as_ref(),
            index,
            question,
            self.config.retrieval.top_k,
        )
        .await?;

        let prompt_text = prompt::compose(question, &chunks);
        let answer = self.synthesizer.synthesize(&prompt_text).await?;

        Ok(assemble_response(question, answer, &chunks))
    }

    /// Best-effort count of indexed chunks; `None` when unavailable
    /// (including before `init`).
    pub async fn chunk_count(&self) -> Option<u64> {
        match &self.state {
            State::Ready { index } => index.count().await,
            State::Uninitialized => None,
        }
    }
}

/// Load the knowledge base, chunk it, and build a fresh index at the
/// configured location, replacing any previous contents.
pub async fn build(
    config: &Config,
    embedder: &dyn Embedder,
) -> Result<(VectorIndex, IndexReport), RagError> {
    let documents = loader::load(&config.knowledge_base.root)?;
    let chunks = chunker::split_documents(
        &documents,
        config.chunking.max_chars,
        config.chunking.overlap,
    );
    let index = VectorIndex::build(
        &config.index.path,
        embedder,
        &chunks,
        config.embedding.batch_size,
    )
    .await?;

    Ok((
        index,
        IndexReport {
            documents: documents.len(),
            chunks: chunks.len(),
        },
    ))
}

/// Package the answer with one citation per retrieved chunk, in retrieval
/// order. Duplicate filenames are kept; deduplication and display caps
/// are the caller's policy, not the assembler's.
pub fn assemble_response(question: &str, answer: String, chunks: &[Chunk]) -> Response {
    let sources = chunks
        .iter()
        .map(|chunk| SourceRef {
            filename: chunk.filename().to_string(),
            category: chunk.category,
            snippet: snippet_of(&chunk.text, SNIPPET_MAX_CHARS),
        })
        .collect();

    Response {
        question: question.to_string(),
        answer,
        sources,
    }
}

/// Truncate at a character boundary with a trailing ellipsis marker.
fn snippet_of(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
