use std::path::PathBuf;

/// Failures reading or writing plan documents and schedules.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV is missing required columns (found {found:?}); need: id, type")]
    MissingColumns { found: Vec<String> },

    #[error("no valid items found ({skipped} rows skipped)")]
    NoItems { skipped: usize },
}

/// Failures loading or saving the settings file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}
