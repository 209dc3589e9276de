//! Phrase catalogue held in memory for the lifetime of the process.
//!
//! A [`Corpus`] owns the records, their embeddings and the full vector index.
//! A [`Subset`] is a topic-filtered view over a corpus with its own freshly
//! built index; it is never cached.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::semantic::embeddings::{check_finite, EmbeddingError, Encoder};
use crate::semantic::index::{Embeddings, IndexError, VectorIndex};
use crate::semantic::normalize_phrase;
use crate::sources::{self, RawPhrase, SourceError};

/// A catalogued phrase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhraseRecord {
    phrase_full: String,
    phrase_proc: String,
    topics: BTreeSet<String>,
    comment: Option<String>,
}

impl PhraseRecord {
    /// Create a record. The normalized text is derived from `phrase_full`
    /// and the comment is cleaned with [`clean_comment`].
    pub fn new<I, S>(phrase_full: impl Into<String>, topics: I, comment: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrase_full = phrase_full.into();
        Self {
            phrase_proc: normalize_phrase(&phrase_full),
            phrase_full,
            topics: topics.into_iter().map(Into::into).collect(),
            comment: clean_comment(comment),
        }
    }

    pub fn phrase_full(&self) -> &str {
        &self.phrase_full
    }

    /// Normalized text used for embedding and keyword matching.
    pub fn phrase_proc(&self) -> &str {
        &self.phrase_proc
    }

    pub fn topics(&self) -> &BTreeSet<String> {
        &self.topics
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// True when the record carries at least one of `selected`.
    pub fn has_any_topic(&self, selected: &[String]) -> bool {
        selected.iter().any(|topic| self.topics.contains(topic))
    }
}

impl From<RawPhrase> for PhraseRecord {
    fn from(raw: RawPhrase) -> Self {
        PhraseRecord::new(raw.phrase, raw.topics, raw.comment)
    }
}

/// Map missing, blank and `nan` comments to `None`.
pub fn clean_comment(comment: Option<String>) -> Option<String> {
    let comment = comment?;
    let trimmed = comment.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(comment)
    }
}

/// Errors that can occur while building a corpus.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// Read access shared by the full corpus and topic subsets.
///
/// Row `i` of [`SearchScope::index`] corresponds to [`SearchScope::record`]`(i)`.
pub trait SearchScope {
    /// Number of records in scope.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record at scope position `row`.
    fn record(&self, row: usize) -> Option<&PhraseRecord>;

    /// Vector index whose rows line up with scope positions.
    fn index(&self) -> &VectorIndex;

    /// Records in scope order.
    fn records(&self) -> Box<dyn Iterator<Item = &PhraseRecord> + '_> {
        Box::new((0..self.len()).filter_map(move |row| self.record(row)))
    }
}

/// All catalogued phrases with their embeddings and full index.
#[derive(Debug)]
pub struct Corpus {
    records: Vec<PhraseRecord>,
    index: VectorIndex,
}

impl Corpus {
    /// Embed every record and build the full-corpus index.
    ///
    /// Either the whole corpus is built or an error is returned.
    pub fn build(records: Vec<PhraseRecord>, encoder: &dyn Encoder) -> Result<Self, CorpusError> {
        let now = Instant::now();

        let texts: Vec<String> = records.iter().map(|r| r.phrase_proc.clone()).collect();
        let vectors = encoder.encode(&texts)?;
        if vectors.len() != records.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: records.len(),
                got: vectors.len(),
            }
            .into());
        }
        check_finite(&vectors)?;

        let embeddings = Embeddings::from_rows(encoder.dimensions(), vectors)?;
        let index = VectorIndex::build(embeddings);

        log::info!(
            "Indexed {} phrases in {}ms",
            index.len(),
            now.elapsed().as_millis()
        );

        Ok(Self { records, index })
    }

    /// Build a corpus from raw source rows.
    pub fn from_raw(rows: Vec<RawPhrase>, encoder: &dyn Encoder) -> Result<Self, CorpusError> {
        Self::build(rows.into_iter().map(PhraseRecord::from).collect(), encoder)
    }

    pub fn records(&self) -> &[PhraseRecord] {
        &self.records
    }

    /// L2-normalized embedding matrix, row `i` for record `i`.
    pub fn embeddings(&self) -> &Embeddings {
        self.index.vectors()
    }

    /// Sorted unique list of every topic in the corpus.
    pub fn topics(&self) -> Vec<&str> {
        self.records
            .iter()
            .flat_map(|r| r.topics.iter().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Records carrying any of `selected`, in corpus order.
    pub fn records_with_topics(&self, selected: &[String]) -> Vec<&PhraseRecord> {
        self.records
            .iter()
            .filter(|r| r.has_any_topic(selected))
            .collect()
    }

    /// Materialize the topic-filtered view and build its index.
    pub fn subset(&self, selected: &[String]) -> Subset<'_> {
        let record_indices: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.has_any_topic(selected))
            .map(|(i, _)| i)
            .collect();

        let embeddings = self.embeddings().gather(&record_indices);
        let index = VectorIndex::build(embeddings);
        log::debug!(
            "Built subset index for {:?}: {} vectors",
            selected,
            index.len()
        );

        Subset {
            corpus: self,
            record_indices,
            index,
        }
    }
}

impl SearchScope for Corpus {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn record(&self, row: usize) -> Option<&PhraseRecord> {
        self.records.get(row)
    }

    fn index(&self) -> &VectorIndex {
        &self.index
    }
}

/// Topic-filtered read-only view over a [`Corpus`].
#[derive(Debug)]
pub struct Subset<'a> {
    corpus: &'a Corpus,
    record_indices: Vec<usize>,
    index: VectorIndex,
}

impl Subset<'_> {
    /// Positions of the selected records in the parent corpus.
    pub fn record_indices(&self) -> &[usize] {
        &self.record_indices
    }

    /// Embeddings gathered from the parent, row `i` for `record_indices[i]`.
    pub fn embeddings(&self) -> &Embeddings {
        self.index.vectors()
    }
}

impl SearchScope for Subset<'_> {
    fn len(&self) -> usize {
        self.record_indices.len()
    }

    fn record(&self, row: usize) -> Option<&PhraseRecord> {
        self.record_indices
            .get(row)
            .and_then(|&i| self.corpus.records.get(i))
    }

    fn index(&self) -> &VectorIndex {
        &self.index
    }
}

/// Where the corpus is loaded from.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub data_dir: PathBuf,
    pub topic_separator: String,
}

/// Process-wide holder of the corpus, built on first access.
///
/// A failed load leaves the store empty; the next access retries.
pub struct CorpusStore {
    settings: SourceSettings,
    corpus: OnceCell<Corpus>,
}

impl CorpusStore {
    pub fn new(settings: SourceSettings) -> Self {
        Self {
            settings,
            corpus: OnceCell::new(),
        }
    }

    /// Store holding an already built corpus.
    pub fn with_corpus(settings: SourceSettings, corpus: Corpus) -> Self {
        Self {
            settings,
            corpus: OnceCell::with_value(corpus),
        }
    }

    /// Return the corpus, loading and embedding it on first call.
    pub fn get_or_load(&self, encoder: &dyn Encoder) -> Result<&Corpus, CorpusError> {
        self.corpus.get_or_try_init(|| {
            log::info!("Loading phrases from {}", self.settings.data_dir.display());
            let rows = sources::load_dir(&self.settings.data_dir, &self.settings.topic_separator)?;
            Corpus::from_raw(rows, encoder)
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.corpus.get().is_some()
    }
}
