//! # scrypto-sage
//!
//! A retrieval-augmented question-answering assistant for Scrypto and
//! Radix DLT developers.
//!
//! The pipeline indexes a knowledge-base directory of markdown docs and
//! Rust code samples, retrieves the chunks most similar to a question, and
//! forwards them with the question to a hosted language model, returning
//! the answer with source citations.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌─────────┐   ┌──────────────┐
//! │ Loader │──▶│ Chunker │──▶│ Vector Index │   (build time, once)
//! └────────┘   └─────────┘   └──────┬───────┘
//!                                   │
//!            question ──▶ Retriever ┘
//!                             │
//!                             ▼
//!                      Prompt Composer ──▶ Synthesizer ──▶ Response
//!                                                          (answer + sources)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`error`] | Pipeline error taxonomy |
//! | [`loader`] | Knowledge-base directory scan |
//! | [`chunker`] | Overlap-aware text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | SQLite-persisted vector index |
//! | [`retriever`] | Top-K similarity retrieval |
//! | [`prompt`] | Prompt template composition |
//! | [`synth`] | Completion endpoint client |
//! | [`pipeline`] | End-to-end pipeline orchestration |
//! | [`registry`] | Supported completion model registry |
//! | [`chat`] | Interactive chat front-end |
//! | [`stats`] | Index statistics |

pub mod chat;
pub mod chunker;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod registry;
pub mod retriever;
pub mod stats;
pub mod synth;
