//! Semantic search infrastructure for the phrase catalogue.
//!
//! This module provides local semantic search capabilities using fastembed-rs
//! for generating embeddings and in-memory vector similarity search.
//!
//! # Architecture
//!
//! - `preprocess`: Text normalization shared by phrases and queries
//! - `embeddings`: Wraps fastembed for embedding generation
//! - `index`: Embedding matrix and flat inner-product index
//! - `lexical`: Substring matching for keyword search
//! - `service`: Search engine and query boundary

pub mod embeddings;
pub mod index;
mod lexical;
mod preprocess;
mod service;

pub use embeddings::{EmbeddingError, EmbeddingModel, Encoder, ModelOptions};
pub use index::{Embeddings, IndexError, SearchHit, VectorIndex};
pub use preprocess::normalize_phrase;
pub use service::{
    keyword_search, ExactResult, PhraseSearchService, QueryRequest, QueryResponse, ScoredResult,
    SearchEngine, SearchError, SearchSettings,
};

/// Default embedding model name (multilingual, the catalogue is not English-only)
pub const DEFAULT_MODEL: &str = "paraphrase-multilingual-minilm-l12-v2";

/// Default similarity threshold for semantic search
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Default number of nearest neighbors fetched per query
pub const DEFAULT_TOP_K: usize = 5;
