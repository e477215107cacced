//! Registry of supported OpenRouter completion models.
//!
//! The configured model identifier is validated against this table at
//! startup, so an unrecognized model fails loudly at config load time
//! instead of surfacing as a confusing per-request API error.

/// Rough quality tier, used for grouping in `sage models` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Excellent,
    VeryGood,
    Good,
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quality::Excellent => f.write_str("Excellent"),
            Quality::VeryGood => f.write_str("Very Good"),
            Quality::Good => f.write_str("Good"),
        }
    }
}

/// Metadata for one supported completion model.
#[derive(Debug, Clone, Copy)]
pub struct ModelInfo {
    /// OpenRouter model identifier, e.g. `anthropic/claude-3.5-sonnet`.
    pub id: &'static str,
    /// Approximate cost in USD per million tokens.
    pub cost_per_mtok: f64,
    pub quality: Quality,
    pub best_for: &'static str,
}

/// All models the assistant knows how to describe and bill for.
pub const KNOWN_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "anthropic/claude-3.5-sonnet",
        cost_per_mtok: 3.0,
        quality: Quality::Excellent,
        best_for: "Technical docs, coding",
    },
    ModelInfo {
        id: "openai/gpt-4o",
        cost_per_mtok: 5.0,
        quality: Quality::Excellent,
        best_for: "General purpose",
    },
    ModelInfo {
        id: "anthropic/claude-3-haiku",
        cost_per_mtok: 0.25,
        quality: Quality::Good,
        best_for: "Fast responses",
    },
    ModelInfo {
        id: "meta-llama/llama-3.1-70b-instruct",
        cost_per_mtok: 0.52,
        quality: Quality::VeryGood,
        best_for: "Technical content",
    },
    ModelInfo {
        id: "mistralai/mistral-large",
        cost_per_mtok: 3.0,
        quality: Quality::VeryGood,
        best_for: "Reasoning",
    },
    ModelInfo {
        id: "qwen/qwen-2.5-72b-instruct",
        cost_per_mtok: 0.56,
        quality: Quality::Good,
        best_for: "Technical docs",
    },
    ModelInfo {
        id: "meta-llama/llama-3.1-8b-instruct",
        cost_per_mtok: 0.055,
        quality: Quality::Good,
        best_for: "Budget option",
    },
    ModelInfo {
        id: "mistralai/mistral-7b-instruct",
        cost_per_mtok: 0.06,
        quality: Quality::Good,
        best_for: "Fast & cheap",
    },
];

/// Look up a model by identifier.
pub fn find(id: &str) -> Option<&'static ModelInfo> {
    KNOWN_MODELS.iter().find(|m| m.id == id)
}

/// Print the registry grouped by quality tier.
pub fn print_models() {
    println!("Supported OpenRouter models");
    println!("===========================");
    for quality in [Quality::Excellent, Quality::VeryGood, Quality::Good] {
        println!();
        println!("  {}:", quality);
        for model in KNOWN_MODELS.iter().filter(|m| m.quality == quality) {
            println!(
                "    {:<40} ~${:.3}/1M tokens | {}",
                model.id, model.cost_per_mtok, model.best_for
            );
        }
    }
    println!();
}
