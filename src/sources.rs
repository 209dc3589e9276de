//! Raw phrase rows read from CSV files.
//!
//! Every `*.csv` file in the data directory contributes rows, in file-name
//! order. Columns are located by header name (case-insensitive):
//! `phrase` (or `phrase_full`) is required, `topics` and `comment` are optional.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One phrase row as supplied by the source files, before normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawPhrase {
    pub phrase: String,
    pub topics: Vec<String>,
    pub comment: Option<String>,
}

/// Errors that can occur while reading source files.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("data directory {} does not exist", .0.display())]
    MissingDataDir(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no .csv files found in {}", .0.display())]
    NoSources(PathBuf),

    #[error("{}: missing required column 'phrase'", .0.display())]
    MissingPhraseColumn(PathBuf),

    #[error("{}: malformed csv: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

const PHRASE_HEADERS: [&str; 2] = ["phrase", "phrase_full"];
const TOPICS_HEADER: &str = "topics";
const COMMENT_HEADER: &str = "comment";

/// Load and concatenate rows from every CSV file in `dir`.
pub fn load_dir(dir: &Path, topic_separator: &str) -> Result<Vec<RawPhrase>, SourceError> {
    let entries = std::fs::read_dir(dir).map_err(|err| match err.kind() {
        ErrorKind::NotFound => SourceError::MissingDataDir(dir.to_path_buf()),
        _ => SourceError::Io {
            path: dir.to_path_buf(),
            source: err,
        },
    })?;

    let mut files = vec![];
    for entry in entries {
        let entry = entry.map_err(|source| SourceError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv && path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(SourceError::NoSources(dir.to_path_buf()));
    }
    files.sort();

    let mut rows = vec![];
    for file in &files {
        let file_rows = read_csv(file, topic_separator)?;
        log::info!("Loaded {} phrases from {}", file_rows.len(), file.display());
        rows.extend(file_rows);
    }

    Ok(rows)
}

/// Read phrase rows from a single CSV file.
///
/// Rows with a blank phrase are skipped.
pub fn read_csv(path: &Path, topic_separator: &str) -> Result<Vec<RawPhrase>, SourceError> {
    let csv_err = |source: csv::Error| SourceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let now = Instant::now();
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = csv_reader.headers().map_err(csv_err)?.clone();
    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|name| h.eq_ignore_ascii_case(name)))
    };

    let phrase_col =
        column(&PHRASE_HEADERS).ok_or_else(|| SourceError::MissingPhraseColumn(path.to_path_buf()))?;
    let topics_col = column(&[TOPICS_HEADER]);
    let comment_col = column(&[COMMENT_HEADER]);

    let mut rows = vec![];
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.map_err(csv_err)?;

        let phrase = record.get(phrase_col).unwrap_or_default().trim();
        if phrase.is_empty() {
            log::warn!("{}: skipping row {} with empty phrase", path.display(), line + 2);
            continue;
        }

        let topics = topics_col
            .and_then(|col| record.get(col))
            .map(|raw| parse_topics(raw, topic_separator))
            .unwrap_or_default();
        let comment = comment_col
            .and_then(|col| record.get(col))
            .map(str::to_string);

        rows.push(RawPhrase {
            phrase: phrase.to_string(),
            topics,
            comment,
        });
    }

    log::debug!(
        "took {}ms to read {}",
        now.elapsed().as_micros() as f64 / 1000.0,
        path.display()
    );

    Ok(rows)
}

/// Split a topics cell into trimmed, non-empty, deduplicated topic names.
pub fn parse_topics(raw: &str, separator: &str) -> Vec<String> {
    let mut topics: Vec<String> = vec![];
    for topic in raw.split(separator).map(str::trim).filter(|t| !t.is_empty()) {
        if !topics.iter().any(|t| t == topic) {
            topics.push(topic.to_string());
        }
    }
    topics
}
