//! Phrase search service.
//!
//! Provides the query-handling surface used by the presentation layer:
//! - Semantic search: normalize, embed, query the index, threshold
//! - Keyword search: substring match on normalized text
//! - Query boundary that picks the full corpus or a topic subset and
//!   reports failures as a value

use std::sync::Arc;

use serde::Serialize;

use crate::corpus::{Corpus, CorpusError, CorpusStore, PhraseRecord, SearchScope};
use crate::semantic::embeddings::{check_finite, EmbeddingError, Encoder};
use crate::semantic::index::IndexError;
use crate::semantic::lexical::match_substring;
use crate::semantic::{normalize_phrase, DEFAULT_THRESHOLD, DEFAULT_TOP_K};

/// Errors that can occur during search operations.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Corpus unavailable: {0}")]
    Corpus(#[from] CorpusError),
}

/// Tuning values for semantic search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    /// Number of nearest rows fetched from the index
    pub top_k: usize,
    /// Minimum similarity a row needs to be returned
    pub min_score: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_THRESHOLD,
        }
    }
}

/// Semantic search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub score: f32,
    pub phrase_full: String,
    pub topics: Vec<String>,
    pub comment: Option<String>,
}

/// Keyword search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExactResult {
    pub phrase_full: String,
    pub topics: Vec<String>,
    pub comment: Option<String>,
}

impl ScoredResult {
    fn from_record(score: f32, record: &PhraseRecord) -> Self {
        Self {
            score,
            phrase_full: record.phrase_full().to_string(),
            topics: record.topics().iter().cloned().collect(),
            comment: record.comment().map(str::to_string),
        }
    }
}

impl From<&PhraseRecord> for ExactResult {
    fn from(record: &PhraseRecord) -> Self {
        Self {
            phrase_full: record.phrase_full().to_string(),
            topics: record.topics().iter().cloned().collect(),
            comment: record.comment().map(str::to_string),
        }
    }
}

/// Runs semantic and keyword search over any [`SearchScope`].
///
/// Never mutates the scope it searches.
pub struct SearchEngine {
    encoder: Arc<dyn Encoder>,
    settings: SearchSettings,
}

impl SearchEngine {
    pub fn new(encoder: Arc<dyn Encoder>, settings: SearchSettings) -> Self {
        Self { encoder, settings }
    }

    fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    /// Search for semantically similar phrases.
    ///
    /// # Returns
    /// At most `top_k` results scoring at least `min_score`, highest first.
    /// An empty query or an empty scope yields no results.
    pub fn semantic_search(
        &self,
        query: &str,
        scope: &dyn SearchScope,
    ) -> Result<Vec<ScoredResult>, SearchError> {
        let query = normalize_phrase(query);
        if query.is_empty() || scope.is_empty() {
            return Ok(vec![]);
        }

        let query_embedding = self.encoder.encode_one(&query)?;
        check_finite(std::slice::from_ref(&query_embedding))?;
        let hits = scope.index().search(&query_embedding, self.settings.top_k)?;

        let results: Vec<ScoredResult> = hits
            .into_iter()
            .filter(|hit| hit.score >= self.settings.min_score)
            .filter_map(|hit| {
                scope
                    .record(hit.row)
                    .map(|record| ScoredResult::from_record(hit.score, record))
            })
            .collect();

        log::debug!(
            "semantic query={query:?} scope={} results={}",
            scope.len(),
            results.len()
        );

        Ok(results)
    }

    /// Find phrases whose normalized text contains the normalized query.
    ///
    /// Results keep scope order.
    pub fn keyword_search(&self, query: &str, scope: &dyn SearchScope) -> Vec<ExactResult> {
        keyword_search(query, scope)
    }
}

/// Keyword search without an engine; it needs no encoder.
pub fn keyword_search(query: &str, scope: &dyn SearchScope) -> Vec<ExactResult> {
    let query = normalize_phrase(query);
    let records: Vec<&PhraseRecord> = scope.records().collect();

    match_substring(&query, records.iter().map(|r| r.phrase_proc()))
        .into_iter()
        .map(|pos| ExactResult::from(records[pos]))
        .collect()
}

/// One request from the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub query: String,
    /// Topics selected in the filter
    pub topics: Vec<String>,
    /// Search only within `topics` instead of the full corpus
    pub restrict_to_topics: bool,
}

/// Both result lists for one query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResponse {
    pub semantic: Vec<ScoredResult>,
    pub exact: Vec<ExactResult>,
    /// Number of records the query ran against
    pub scope_size: usize,
    /// True when a topic restriction left nothing to search
    pub empty_scope: bool,
}

/// Owns the corpus store and search engine for the process.
pub struct PhraseSearchService {
    store: CorpusStore,
    engine: SearchEngine,
}

impl PhraseSearchService {
    pub fn new(store: CorpusStore, engine: SearchEngine) -> Self {
        Self { store, engine }
    }

    /// Load the corpus now instead of on the first query.
    pub fn initialize(&self) -> Result<&Corpus, CorpusError> {
        self.corpus()
    }

    /// The cached corpus, loading it on first call.
    pub fn corpus(&self) -> Result<&Corpus, CorpusError> {
        self.store.get_or_load(self.engine.encoder())
    }

    /// Run semantic and keyword search for one request.
    ///
    /// Failures are returned rather than raised, and leave the cached
    /// corpus untouched for later queries.
    pub fn handle_query(&self, request: &QueryRequest) -> Result<QueryResponse, SearchError> {
        let corpus = self.corpus()?;

        if request.restrict_to_topics && !request.topics.is_empty() {
            let subset = corpus.subset(&request.topics);
            if subset.is_empty() {
                log::warn!("No phrases for topics {:?}", request.topics);
                return Ok(QueryResponse {
                    empty_scope: true,
                    ..Default::default()
                });
            }
            return self.search_scope(&request.query, &subset);
        }

        self.search_scope(&request.query, corpus)
    }

    fn search_scope(
        &self,
        query: &str,
        scope: &dyn SearchScope,
    ) -> Result<QueryResponse, SearchError> {
        let semantic = self.engine.semantic_search(query, scope)?;
        let exact = self.engine.keyword_search(query, scope);

        Ok(QueryResponse {
            semantic,
            exact,
            scope_size: scope.len(),
            empty_scope: false,
        })
    }
}
