use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::corpus::SourceSettings;
use crate::semantic::embeddings::{ModelOptions, DEFAULT_BATCH_SIZE};
use crate::semantic::{SearchSettings, DEFAULT_MODEL, DEFAULT_THRESHOLD, DEFAULT_TOP_K};

const CONFIG_FILE_NAME: &str = "config.yaml";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_TOPIC_SEPARATOR: &str = ",";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("config io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is malformed: {0}")]
    Malformed(#[from] serde_yml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for semantic search functionality
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SemanticSearchConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_semantic_model")]
    pub model: String,

    /// Number of nearest neighbors fetched per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity score [-1.0, 1.0]
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Texts per model inference call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for SemanticSearchConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_THRESHOLD,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

fn default_semantic_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_min_score() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_topic_separator() -> String {
    DEFAULT_TOPIC_SEPARATOR.to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory of phrase CSV files, relative to the base path unless absolute
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_topic_separator")]
    pub topic_separator: String,
    #[serde(default)]
    pub semantic_search: SemanticSearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            topic_separator: default_topic_separator(),
            semantic_search: SemanticSearchConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

impl Config {
    /// Base path from `PHRASECHECK_DIR`, or `~/.phrasecheck`.
    pub fn default_base_path() -> Result<PathBuf, ConfigError> {
        if let Ok(dir) = std::env::var("PHRASECHECK_DIR") {
            return Ok(PathBuf::from(dir));
        }
        let home = homedir::my_home()
            .ok()
            .flatten()
            .ok_or(ConfigError::NoHome)?;
        Ok(home.join(".phrasecheck"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.topic_separator.is_empty() {
            return Err(ConfigError::Invalid(
                "topic_separator must not be empty".to_string(),
            ));
        }

        let sem = &self.semantic_search;
        check_min_score("semantic_search.min_score", sem.min_score)?;
        check_top_k("semantic_search.top_k", sem.top_k)?;
        if sem.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "semantic_search.batch_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load `config.yaml` from `base_path`, writing defaults first if it is missing.
    pub fn load_with(base_path: &Path) -> Result<Self, ConfigError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| ConfigError::Io { path, source }
        };

        std::fs::create_dir_all(base_path).map_err(io_err(base_path))?;
        let config_path = base_path.join(CONFIG_FILE_NAME);

        // create new if does not exist
        if !config_path.exists() {
            log::info!("Writing default config to {}", config_path.display());
            let defaults = serde_yml::to_string(&Self::default())?;
            std::fs::write(&config_path, defaults).map_err(io_err(&config_path))?;
        }

        let config_str = std::fs::read_to_string(&config_path).map_err(io_err(&config_path))?;
        let mut config: Self = serde_yml::from_str(&config_str)?;

        config.base_path = base_path.to_path_buf();
        config.validate()?;

        Ok(config)
    }

    /// Data directory resolved against the base path.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if self.data_dir.is_absolute() {
            self.data_dir.clone()
        } else {
            self.base_path.join(&self.data_dir)
        }
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            data_dir: self.resolved_data_dir(),
            topic_separator: self.topic_separator.clone(),
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            top_k: self.semantic_search.top_k,
            min_score: self.semantic_search.min_score,
        }
    }

    /// Search settings with per-call overrides applied on top of the config.
    ///
    /// Overrides go through the same range checks as the config file.
    pub fn search_settings_with(
        &self,
        min_score: Option<f32>,
        top_k: Option<usize>,
    ) -> Result<SearchSettings, ConfigError> {
        let mut settings = self.search_settings();
        if let Some(min_score) = min_score {
            check_min_score("min_score", min_score)?;
            settings.min_score = min_score;
        }
        if let Some(top_k) = top_k {
            check_top_k("top_k", top_k)?;
            settings.top_k = top_k;
        }
        Ok(settings)
    }

    /// Model options; downloaded models are cached under the base path.
    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            model_name: self.semantic_search.model.clone(),
            cache_dir: self.base_path.clone(),
            batch_size: self.semantic_search.batch_size,
        }
    }
}

fn check_min_score(name: &str, min_score: f32) -> Result<(), ConfigError> {
    // NaN fails the range check too
    if !(-1.0..=1.0).contains(&min_score) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be between -1.0 and 1.0, got {min_score}"
        )));
    }
    Ok(())
}

fn check_top_k(name: &str, top_k: usize) -> Result<(), ConfigError> {
    if top_k == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be greater than 0")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_writes_defaults() {
        let tmp = tempfile::tempdir().unwrap();

        let config = Config::load_with(tmp.path()).unwrap();

        assert!(tmp.path().join(CONFIG_FILE_NAME).exists());
        assert_eq!(config.semantic_search, SemanticSearchConfig::default());
        assert_eq!(config.resolved_data_dir(), tmp.path().join("data"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "semantic_search:\n  min_score: 0.7\n",
        )
        .unwrap();

        let config = Config::load_with(tmp.path()).unwrap();

        assert!((config.search_settings().min_score - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.search_settings().top_k, DEFAULT_TOP_K);
        assert_eq!(config.topic_separator, ",");
    }

    #[test]
    fn test_absolute_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("elsewhere");
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            format!("data_dir: {}\n", data.display()),
        )
        .unwrap();

        let config = Config::load_with(tmp.path()).unwrap();
        assert_eq!(config.source_settings().data_dir, data);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "semantic_search:\n  min_score: 1.5\n",
        )
        .unwrap();

        let result = Config::load_with(tmp.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "semantic_search:\n  top_k: 0\n",
        )
        .unwrap();

        let result = Config::load_with(tmp.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "semantic_search: [1, 2").unwrap();

        let result = Config::load_with(tmp.path());
        assert!(matches!(result, Err(ConfigError::Malformed(_))));
    }

    #[test]
    fn test_model_options_use_base_path_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with(tmp.path()).unwrap();

        let options = config.model_options();
        assert_eq!(options.cache_dir, tmp.path());
        assert_eq!(options.model_name, DEFAULT_MODEL);
        assert_eq!(options.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "semantic_search:\n  batch_size: 32\n  download_timeout_secs: 60\n",
        )
        .unwrap();

        let config = Config::load_with(tmp.path()).unwrap();
        assert_eq!(config.model_options().batch_size, 32);

        let written = serde_yml::to_string(&config).unwrap();
        assert!(!written.contains("download_timeout_secs"));
    }

    #[test]
    fn test_search_overrides_are_validated() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with(tmp.path()).unwrap();

        let settings = config.search_settings_with(Some(0.8), Some(3)).unwrap();
        assert!((settings.min_score - 0.8).abs() < f32::EPSILON);
        assert_eq!(settings.top_k, 3);

        let settings = config.search_settings_with(None, None).unwrap();
        assert_eq!(settings.top_k, DEFAULT_TOP_K);
        assert!((settings.min_score - DEFAULT_THRESHOLD).abs() < f32::EPSILON);

        assert!(matches!(
            config.search_settings_with(None, Some(0)),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            config.search_settings_with(Some(1.5), None),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            config.search_settings_with(Some(f32::NAN), None),
            Err(ConfigError::Invalid(_))
        ));
    }
}
