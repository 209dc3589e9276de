//! Embedding model wrapper for fastembed.
//!
//! Provides a high-level interface for generating embeddings:
//! - `Encoder` trait so the search engine does not depend on the backend
//! - Process-wide shared model, loaded at most once
//! - Batch embedding generation

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fastembed::{InitOptions, TextEmbedding};
use once_cell::sync::OnceCell;

/// Default number of texts sent to the model per inference call
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Process-wide model instance. Released at process exit.
static SHARED_MODEL: OnceCell<Arc<EmbeddingModel>> = OnceCell::new();

/// Maps normalized texts to fixed-dimension dense vectors.
///
/// `encode` must return exactly one vector per input, in input order, and
/// the vector for a text must not depend on which other texts share its batch.
pub trait Encoder: Send + Sync {
    /// Encode a batch of texts.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Dimension of every vector produced by `encode`.
    fn dimensions(&self) -> usize;

    /// Encode a single text.
    fn encode_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.encode(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct EmbeddingModel {
    model: Mutex<TextEmbedding>,
    dimensions: usize,
    batch_size: usize,
}

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),

    #[error("Encoder returned {got} vectors for {expected} texts")]
    CountMismatch { expected: usize, got: usize },

    #[error("Encoder returned a non-finite value in vector {0}")]
    NonFinite(usize),
}

/// Reject vectors containing NaN or infinite components.
pub fn check_finite<V: AsRef<[f32]>>(vectors: &[V]) -> Result<(), EmbeddingError> {
    match vectors
        .iter()
        .position(|v| v.as_ref().iter().any(|x| !x.is_finite()))
    {
        Some(i) => Err(EmbeddingError::NonFinite(i)),
        None => Ok(()),
    }
}

/// Settings needed to construct an [`EmbeddingModel`].
#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub model_name: String,
    pub cache_dir: PathBuf,
    pub batch_size: usize,
}

impl EmbeddingModel {
    /// Create a new embedding model with the given options.
    ///
    /// The model will be downloaded on first use if not cached.
    /// Models are cached in the `models/` subdirectory of `cache_dir`.
    pub fn new(options: &ModelOptions) -> Result<Self, EmbeddingError> {
        let model_enum = Self::parse_model_name(&options.model_name)?;

        let models_dir = options.cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("Failed to create models directory: {}", e))
        })?;

        log::info!("Loading embedding model '{}'", options.model_name);

        let init = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        let mut model =
            TextEmbedding::try_new(init).map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        let dimensions = Self::probe_dimensions(&mut model)?;
        log::debug!("Embedding model '{}' has {} dimensions", options.model_name, dimensions);

        Ok(Self {
            model: Mutex::new(model),
            dimensions,
            batch_size: options.batch_size.max(1),
        })
    }

    /// Return the process-wide model, loading it on first call.
    ///
    /// Later calls ignore `options` and hand out the already-loaded instance.
    pub fn shared(options: &ModelOptions) -> Result<Arc<EmbeddingModel>, EmbeddingError> {
        SHARED_MODEL
            .get_or_try_init(|| Self::new(options).map(Arc::new))
            .cloned()
    }

    /// Parse model name string to fastembed enum.
    fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
        match name.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "allminiml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "all-minilm-l6-v2-q" | "allminiml6v2q" => {
                Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q)
            }
            "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" | "bgebaseenv15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "paraphrase-multilingual-minilm-l12-v2" | "paraphrasemlminilml12v2" => {
                Ok(fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2)
            }
            "paraphrase-multilingual-minilm-l12-v2-q" | "paraphrasemlminilml12v2q" => {
                Ok(fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2Q)
            }
            "multilingual-e5-small" | "multilinguale5small" => {
                Ok(fastembed::EmbeddingModel::MultilingualE5Small)
            }
            "multilingual-e5-base" | "multilinguale5base" => {
                Ok(fastembed::EmbeddingModel::MultilingualE5Base)
            }
            _ => Err(EmbeddingError::InvalidModel(format!(
                "Unknown model: {}. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5, paraphrase-multilingual-MiniLM-L12-v2, multilingual-e5-small, multilingual-e5-base",
                name
            ))),
        }
    }

    /// Probe the model to determine embedding dimensions.
    fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
        let test_embeddings = model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::InitFailed(format!("Failed to probe dimensions: {}", e)))?;

        test_embeddings
            .first()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::InitFailed("Model returned no embedding".to_string()))
    }
}

impl Encoder for EmbeddingModel {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self.model.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        let embeddings = model
            .embed(texts.to_vec(), Some(self.batch_size))
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: embeddings.len(),
            });
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
