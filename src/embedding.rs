//! Embedding provider abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and two concrete providers:
//! - **[`HashEmbedder`]**: a deterministic local bag-of-tokens projection.
//!   No network, stable output for identical input. The default.
//! - **[`OpenAiEmbedder`]**: calls the OpenAI embeddings API with batching,
//!   retry, and exponential backoff.
//!
//! The same provider must back both index build and query embedding; the
//! index records the provider's model name and dimensionality and refuses
//! to open under a different one. Also provides vector utilities:
//! [`vec_to_blob`], [`blob_to_vec`], and [`cosine_similarity`].

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::RagError;

/// A pure function from text to a fixed-length vector.
///
/// Implementations must be deterministic: the same text always produces the
/// same vector, which is what makes a persisted index reusable across runs.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier recorded in the index metadata.
    fn model_name(&self) -> &str;
    /// Output dimensionality; constant for the provider's lifetime.
    fn dims(&self) -> usize;
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Embed a single query string.
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, RagError> {
    let vectors = embedder.embed(std::slice::from_ref(&text.to_string())).await?;
    vectors
        .into_iter()
        .next()
        .ok_or_else(|| RagError::Embedding("empty embedding response".to_string()))
}

/// Instantiate the provider selected by the configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, RagError> {
    match config.provider.as_str() {
        "hash" => Ok(Arc::new(HashEmbedder::new(config.dims))),
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        other => Err(RagError::Embedding(format!(
            "unknown embedding provider: {other}"
        ))),
    }
}

// ============ Hash provider ============

/// Deterministic local embedder: hashes lowercased alphanumeric tokens into
/// signed buckets of a fixed-size vector, then L2-normalizes.
///
/// Crude compared to a learned model, but fully offline and stable, which
/// is exactly what the pipeline contract requires of an embedding function.
/// Texts sharing vocabulary land near each other under cosine similarity.
pub struct HashEmbedder {
    dims: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            name: format!("hash-{dims}"),
            dims,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
                % self.dims;
            let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

// ============ OpenAI provider ============

/// Embedding provider backed by `POST /v1/embeddings`.
///
/// Requires `OPENAI_API_KEY` in the environment; its absence is a fatal
/// startup condition, not a per-call error.
///
/// Retry strategy for a batch:
/// - HTTP 429 and 5xx → retry with exponential backoff (1s, 2s, 4s, ... capped)
/// - other 4xx → fail immediately
/// - network errors → retry
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RagError> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| RagError::Embedding("embedding.model required for openai".into()))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::CredentialMissing("OPENAI_API_KEY"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        Ok(Self {
            model,
            dims: config.dims,
            api_key,
            client,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| RagError::Embedding(e.to_string()))?;
                        return parse_embeddings_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(RagError::Embedding(format!(
                            "OpenAI API error {status}: {body_text}"
                        )));
                        continue;
                    }

                    return Err(RagError::Embedding(format!(
                        "OpenAI API error {status}: {body_text}"
                    )));
                }
                Err(e) => {
                    last_err = Some(RagError::Embedding(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| RagError::Embedding("embedding failed after retries".into())))
    }
}

fn parse_embeddings_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, RagError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| RagError::Embedding("invalid response: missing data array".into()))?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| RagError::Embedding("invalid response: missing embedding".into()))?;
        embeddings.push(
            embedding
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect(),
        );
    }
    Ok(embeddings)
}

// ============ Vector utilities ============

/// Encode a float vector as little-endian f32 bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`. Returns `0.0` for empty or
/// mismatched-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(128);
        let texts = vec!["A blueprint is a module.".to_string()];
        let a = embedder.embed(&texts).await.unwrap();
        let b = embedder.embed(&texts).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 128);
    }

    #[tokio::test]
    async fn hash_vectors_are_normalized() {
        let embedder = HashEmbedder::new(64);
        let vectors = embedder
            .embed(&["some nonempty text".to_string()])
            .await
            .unwrap();
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let embedder = HashEmbedder::new(256);
        let texts = vec![
            "how do I declare a blueprint module".to_string(),
            "a blueprint is declared with a module".to_string(),
            "deep learning frameworks like pytorch".to_string(),
        ];
        let vectors = embedder.embed(&texts).await.unwrap();
        let related = cosine_similarity(&vectors[0], &vectors[1]);
        let unrelated = cosine_similarity(&vectors[0], &vectors[2]);
        assert!(
            related > unrelated,
            "related {related} should beat unrelated {unrelated}"
        );
    }

    #[test]
    fn vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob.len(), 20);
        assert_eq!(blob_to_vec(&blob), vec);
    }

    #[test]
    fn cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }
}
