//! # csvwindow - date-window filtering for CSV exports
//!
//! csvwindow takes a delimited text export, keeps the rows whose date column
//! falls in an optional inclusive window, strips a leading `100`/`200` from
//! the `No.` column and hands back a new CSV file.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV bytes  │────▶│   Parser    │────▶│  Transform  │────▶│  CSV bytes  │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (window+ID) │     │ name_ts.csv │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use csvwindow::{parse_str, transform};
//!
//! let table = parse_str("No.,Date\n100A,2024-01-05\n300C,2024-03-01", ',').unwrap();
//! let out = transform(&table, None, None);
//! assert_eq!(out.rows[1][0], "A");
//! assert_eq!(out.rows[2][0], "300C");
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Table, date window and column layout
//! - [`dates`] - Date parsing for cells and bounds
//! - [`parser`] - CSV parsing and serialization with auto-detection
//! - [`transform`] - The table transformer and the processing pipeline
//! - [`config`] - Defaults and environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod dates;
pub mod parser;

// Transformation
pub mod transform;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CsvError, DateError, PipelineError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{ColumnLayout, DateWindow, Row, Table};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use dates::{parse_bound, parse_datetime, parse_optional_bound};
pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_bytes_with,
    parse_file_auto, parse_str, serialize, ParseResult,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    filter_rows, locate_columns, strip_id_prefix, strip_prefixes, transform, transform_table,
    transform_with_stats, TransformStats,
};

pub use transform::pipeline::{
    output_base_name, output_file_name, process_bytes, process_file, CsvInfo, ProcessOptions,
    ProcessedFile,
};

// =============================================================================
// Re-exports - Config and API
// =============================================================================

pub use config::Config;
pub use api::types::{error_response, ProcessResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
