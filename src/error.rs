//! Error types for snapshot ingestion.
//!
//! Nothing here is fatal to a sync except [`SourceError`] from listing:
//! per-file failures are wrapped in [`IngestError`] and reported as
//! warnings.

use std::path::PathBuf;

/// Listing or fetching from a snapshot source failed.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("folder not found: {0}")]
    FolderNotFound(PathBuf),

    #[error("unknown file id: {0}")]
    UnknownFile(String),

    #[error("path leaves the source root: {0}")]
    OutsideRoot(String),
}

/// Bytes could not be turned into a table.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("unexpected layout: {0}")]
    Layout(String),
}

/// Why one file contributed no records to a sync.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("download failed: {0}")]
    Fetch(#[from] SourceError),

    #[error("could not read file: {0}")]
    Decode(#[from] DecodeError),

    #[error("file contains no rows")]
    NoRows,
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// The settings file exists but could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
