//! Phrase lookup over a catalogue of pre-classified phrases.
//!
//! Combines embedding-based semantic search with literal substring matching.

pub mod config;
pub mod corpus;
pub mod semantic;
pub mod sources;

#[cfg(test)]
mod tests;

pub use corpus::{Corpus, CorpusError, CorpusStore, PhraseRecord, SearchScope, SourceSettings, Subset};
pub use semantic::{
    keyword_search, normalize_phrase, EmbeddingModel, Encoder, ExactResult, PhraseSearchService,
    QueryRequest, QueryResponse, ScoredResult, SearchEngine, SearchError, SearchSettings,
};
