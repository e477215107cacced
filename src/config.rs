use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::registry;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub knowledge_base: KnowledgeBaseConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeBaseConfig {
    /// Root of the directory tree produced by the harvesting scripts.
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Location of the persisted vector index (SQLite file).
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap: default_overlap(),
        }
    }
}

fn default_max_chars() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Maximum number of chunks retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"hash"` (deterministic local) or `"openai"`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}
fn default_dims() -> usize {
    384
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SynthesisConfig {
    /// OpenRouter model identifier; must appear in the model registry.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_synth_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_synth_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "anthropic/claude-3.5-sonnet".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.1
}
fn default_synth_timeout_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap >= config.chunking.max_chars {
        anyhow::bail!(
            "chunking.overlap ({}) must be smaller than chunking.max_chars ({})",
            config.chunking.overlap,
            config.chunking.max_chars
        );
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    match config.embedding.provider.as_str() {
        "hash" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be hash or openai.",
            other
        ),
    }

    if config.embedding.provider == "openai" && config.embedding.model.is_none() {
        anyhow::bail!("embedding.model must be specified when provider is 'openai'");
    }

    if registry::find(&config.synthesis.model).is_none() {
        anyhow::bail!(
            "Unknown synthesis model: '{}'. Known models: {}",
            config.synthesis.model,
            registry::KNOWN_MODELS
                .iter()
                .map(|m| m.id)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    const MINIMAL: &str = r#"
[knowledge_base]
root = "kb/cleaned"

[index]
path = "data/sage.sqlite"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.chunking.max_chars, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.top_k, 6);
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.embedding.dims, 384);
        assert_eq!(config.synthesis.model, "anthropic/claude-3.5-sonnet");
        assert_eq!(config.synthesis.max_tokens, 1024);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_max() {
        let toml_str = format!("{MINIMAL}\n[chunking]\nmax_chars = 100\noverlap = 100\n");
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn rejects_unknown_synthesis_model() {
        let toml_str = format!("{MINIMAL}\n[synthesis]\nmodel = \"acme/imaginary\"\n");
        let err = parse(&toml_str).unwrap_err().to_string();
        assert!(err.contains("Unknown synthesis model"), "got: {err}");
    }

    #[test]
    fn rejects_unknown_embedding_provider() {
        let toml_str = format!("{MINIMAL}\n[embedding]\nprovider = \"chroma\"\n");
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn openai_embedding_requires_model() {
        let toml_str = format!("{MINIMAL}\n[embedding]\nprovider = \"openai\"\ndims = 1536\n");
        assert!(parse(&toml_str).is_err());
    }
}
