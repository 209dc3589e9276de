//! Deterministic encoders standing in for the embedding model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::corpus::{Corpus, PhraseRecord};
use crate::semantic::{EmbeddingError, Encoder, SearchEngine, SearchSettings};

/// Bag-of-words encoder: one dimension per vocabulary word plus one shared
/// slot for unknown words. Texts sharing no words score exactly 0.
pub struct VocabEncoder {
    vocab: Vec<&'static str>,
}

impl VocabEncoder {
    pub fn new(vocab: &[&'static str]) -> Self {
        Self {
            vocab: vocab.to_vec(),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dimensions()];
        for token in text.split_whitespace() {
            let slot = self
                .vocab
                .iter()
                .position(|word| *word == token)
                .unwrap_or(self.vocab.len());
            v[slot] += 1.0;
        }
        v
    }
}

impl Encoder for VocabEncoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.vocab.len() + 1
    }
}

/// Wraps a [`VocabEncoder`] and fails while `broken` is set.
pub struct FlakyEncoder {
    inner: VocabEncoder,
    pub broken: AtomicBool,
}

impl FlakyEncoder {
    pub fn new(vocab: &[&'static str]) -> Self {
        Self {
            inner: VocabEncoder::new(vocab),
            broken: AtomicBool::new(false),
        }
    }

    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }
}

impl Encoder for FlakyEncoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(EmbeddingError::EmbeddingFailed("backend unavailable".to_string()));
        }
        self.inner.encode(texts)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

/// Wraps a [`VocabEncoder`] and emits NaN for any text containing `word`.
pub struct NanEncoder {
    inner: VocabEncoder,
    word: &'static str,
}

impl NanEncoder {
    pub fn new(vocab: &[&'static str], word: &'static str) -> Self {
        Self {
            inner: VocabEncoder::new(vocab),
            word,
        }
    }
}

impl Encoder for NanEncoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = self.inner.encode(texts)?;
        for (text, vector) in texts.iter().zip(vectors.iter_mut()) {
            if text.split_whitespace().any(|token| token == self.word) {
                vector[0] = f32::NAN;
            }
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

pub const VOCAB: &[&str] = &[
    "hello", "world", "goodbye", "good", "morning", "evening", "night", "thank", "you", "see",
    "later", "friend",
];

pub fn encoder() -> Arc<VocabEncoder> {
    Arc::new(VocabEncoder::new(VOCAB))
}

pub fn engine(min_score: f32, top_k: usize) -> SearchEngine {
    SearchEngine::new(encoder(), SearchSettings { top_k, min_score })
}

/// The two-phrase catalogue used by the basic scenarios.
pub fn greeting_corpus() -> Corpus {
    let records = vec![
        PhraseRecord::new("Hello world", ["greeting"], None),
        PhraseRecord::new("Goodbye", ["farewell"], None),
    ];
    Corpus::build(records, encoder().as_ref()).unwrap()
}

/// A larger catalogue with overlapping topics and a duplicate phrase.
pub fn mixed_corpus() -> Corpus {
    let records = vec![
        PhraseRecord::new("Hello world", ["greeting"], Some("classic".into())),
        PhraseRecord::new("Good morning, friend!", ["greeting", "morning"], None),
        PhraseRecord::new("Good evening", ["greeting", "evening"], Some("nan".into())),
        PhraseRecord::new("Good night", ["farewell", "evening"], None),
        PhraseRecord::new("Goodbye", ["farewell"], Some("   ".into())),
        PhraseRecord::new("See you later", ["farewell"], None),
        PhraseRecord::new("Thank you", ["gratitude"], None),
        PhraseRecord::new("Thank you", ["gratitude", "polite"], Some("duplicate text".into())),
        PhraseRecord::new("Hello, friend", Vec::<String>::new(), None),
    ];
    Corpus::build(records, encoder().as_ref()).unwrap()
}
