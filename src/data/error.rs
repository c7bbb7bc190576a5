use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce a usable table from the source file.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Data file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Row {row}: '{value}' is not a valid {column} value")]
    Malformed {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("{0}")]
    Shape(String),

    #[error("No complete rows left after dropping incomplete ones")]
    Empty,
}

/// Failure to encode the filtered subset.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Flushing CSV buffer: {0}")]
    Flush(String),
}
