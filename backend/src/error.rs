//! Error types for the csvwindow processing pipeline.
//!
//! - [`CsvError`] - CSV decoding, parsing and writing errors
//! - [`DateError`] - Date window bound errors
//! - [`PipelineError`] - Top-level processing errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! A missing `No.`/date column and an unparsable date cell are not errors:
//! the transformer falls back to a defined result for both.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading or writing delimited text.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read the source.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes could not be decoded as text.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Malformed record.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Nothing to parse.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Serialization failed.
    #[error("Failed to write CSV: {0}")]
    Write(String),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(e) => CsvError::Io(e),
            csv::ErrorKind::Utf8 { err, .. } => CsvError::Encoding(err.to_string()),
            other => CsvError::Parse {
                line,
                message: format!("{:?}", other),
            },
        }
    }
}

// =============================================================================
// Date Errors
// =============================================================================

/// Errors for user-supplied date window bounds.
#[derive(Debug, Error)]
pub enum DateError {
    /// A start/end bound that no supported format accepts.
    #[error("Invalid date bound: '{value}'")]
    InvalidBound { value: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level processing errors.
///
/// This is the error type returned by [`crate::transform::pipeline::process_bytes`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Date bound error.
    #[error("Date error: {0}")]
    Date(#[from] DateError),

    /// IO error outside of parsing (writing the output artifact).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload is neither text nor CSV.
    #[error("Unsupported file type: '{0}' (expected a .txt or .csv file)")]
    UnsupportedFileType(String),

    /// Upload exceeds the configured limit.
    #[error("File too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: usize, max: usize },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request body over the configured limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for date bound parsing.
pub type DateResult<T> = Result<T, DateError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
