//! High-level pipeline: bytes in, processed CSV out.
//!
//! Combines parsing, the date window / identifier transformation,
//! serialization and output naming. The CLI and the HTTP server both go
//! through here.
//!
//! # Example
//!
//! ```rust,no_run
//! use csvwindow::transform::pipeline::{process_file, ProcessOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processed = process_file(Path::new("export.csv"), &ProcessOptions::default())?;
//!     let mut out = std::fs::File::create(&processed.name)?;
//!     processed.write_to(&mut out)?;
//!     Ok(())
//! }
//! ```

use std::io::Write;
use std::path::Path;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{transform_with_stats, TransformStats};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::{Config, MAX_FILE_SIZE, OUTPUT_EXTENSION, OUTPUT_MIME_TYPE, PREVIEW_CHARS};
use crate::error::{PipelineError, PipelineResult};
use crate::models::DateWindow;
use crate::parser::{parse_bytes_with, serialize};

static CSV_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.csv$").expect("static regex is valid"));

/// Content types accepted for uploads.
const ACCEPTED_CONTENT_TYPES: [&str; 2] = ["text/plain", "text/csv"];

/// Options for a processing run
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Inclusive date window applied to data rows
    pub window: DateWindow,

    /// Force a delimiter instead of detecting it
    pub delimiter: Option<char>,

    /// Reject inputs larger than this many bytes
    pub max_bytes: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            window: DateWindow::unbounded(),
            delimiter: None,
            max_bytes: MAX_FILE_SIZE,
        }
    }
}

impl From<&Config> for ProcessOptions {
    /// Defaults with the configured upload limit.
    fn from(config: &Config) -> Self {
        Self {
            max_bytes: config.max_upload_bytes,
            ..Self::default()
        }
    }
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// A processed file ready to be handed to the user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
    /// Output name, `<base>_<epoch seconds>.csv`
    pub name: String,
    /// Serialized CSV
    pub content: String,
    /// Always `text/csv`
    pub mime_type: String,
    /// Size of `content` in bytes
    pub size: usize,
    /// What the transformation did
    pub stats: TransformStats,
    /// Source file information
    pub csv_info: CsvInfo,
}

impl ProcessedFile {
    /// Write the content to any byte sink (file, stdout, response body).
    pub fn write_to<W: Write>(&self, sink: &mut W) -> std::io::Result<()> {
        sink.write_all(self.content.as_bytes())?;
        sink.flush()
    }

    /// First characters of the content, with `...` when truncated.
    pub fn preview(&self) -> String {
        let mut preview: String = self.content.chars().take(PREVIEW_CHARS).collect();
        if self.content.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        preview
    }

    /// Human readable size, e.g. `1.50 KB`.
    pub fn size_kb(&self) -> String {
        format!("{:.2} KB", self.size as f64 / 1024.0)
    }
}

/// Whether an upload looks like a text or CSV file.
pub fn is_accepted_upload(file_name: &str, content_type: Option<&str>) -> bool {
    let by_type = content_type
        .map(|ct| {
            let essence = ct.split(';').next().unwrap_or("").trim().to_lowercase();
            ACCEPTED_CONTENT_TYPES.iter().any(|accepted| *accepted == essence)
        })
        .unwrap_or(false);

    by_type || file_name.ends_with(".csv")
}

/// Reject uploads above `max` bytes.
pub fn check_upload_size(size: usize, max: usize) -> PipelineResult<()> {
    if size > max {
        return Err(PipelineError::FileTooLarge { size, max });
    }
    Ok(())
}

/// Original name without a trailing `.csv`, plus `_<timestamp>`.
///
/// ```
/// use csvwindow::transform::pipeline::output_base_name;
///
/// assert_eq!(output_base_name("sales.CSV", 1700000000), "sales_1700000000");
/// ```
pub fn output_base_name(original: &str, timestamp: i64) -> String {
    let base = CSV_EXTENSION.replace(original, "");
    format!("{}_{}", base, timestamp)
}

/// Full download name: [`output_base_name`] with the `.csv` extension.
pub fn output_file_name(original: &str, timestamp: i64) -> String {
    format!("{}.{}", output_base_name(original, timestamp), OUTPUT_EXTENSION)
}

/// Process a file on disk.
///
/// The output name is derived from the file name of `path`.
pub fn process_file(path: &Path, options: &ProcessOptions) -> PipelineResult<ProcessedFile> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("processed");
    process_bytes(&bytes, file_name, options)
}

/// Process uploaded bytes, naming the result with the current time.
pub fn process_bytes(
    bytes: &[u8],
    file_name: &str,
    options: &ProcessOptions,
) -> PipelineResult<ProcessedFile> {
    process_bytes_at(bytes, file_name, options, Utc::now().timestamp())
}

/// Process uploaded bytes with an explicit epoch-seconds timestamp.
pub fn process_bytes_at(
    bytes: &[u8],
    file_name: &str,
    options: &ProcessOptions,
    timestamp: i64,
) -> PipelineResult<ProcessedFile> {
    check_upload_size(bytes.len(), options.max_bytes)?;

    // Step 1: Parse
    log_info(format!("Reading {} ({} bytes)...", file_name, bytes.len()));
    let parsed = parse_bytes_with(bytes, options.delimiter)?;
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows", parsed.table.len()));

    let csv_info = CsvInfo {
        encoding: parsed.encoding.clone(),
        delimiter: parsed.delimiter,
        headers: parsed.table.header().cloned().unwrap_or_default(),
        row_count: parsed.table.data_rows().len(),
    };

    // Step 2: Transform
    log_info("Applying date window and identifier cleanup...");
    log_window(&options.window);
    let (table, stats) = transform_with_stats(&parsed.table, &options.window);
    print_stats(&stats, &csv_info.headers);

    // Step 3: Serialize and name
    let content = serialize(&table, parsed.delimiter)?;
    let name = output_file_name(file_name, timestamp);
    log_success(format!("Output ready: {} ({} bytes)", name, content.len()));

    Ok(ProcessedFile {
        name,
        size: content.len(),
        content,
        mime_type: OUTPUT_MIME_TYPE.to_string(),
        stats,
        csv_info,
    })
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

fn log_window(window: &DateWindow) {
    if window.is_unbounded() {
        log_info_indent("No date window, keeping every row", 1);
        return;
    }
    let fmt = |bound: Option<chrono::NaiveDateTime>| {
        bound
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "(open)".to_string())
    };
    log_info_indent(format!("Window: {} -> {}", fmt(window.start), fmt(window.end)), 1);
}

fn print_stats(stats: &TransformStats, headers: &[String]) {
    let Some(layout) = stats.layout else {
        log_warning("No 'No.' or date column found, file passed through unchanged");
        return;
    };

    let column = |i: usize| headers.get(i).map(String::as_str).unwrap_or("?");
    log_info_indent(
        format!("Identifier column: [{}] {}", layout.id_index + 1, column(layout.id_index)),
        1,
    );
    log_info_indent(
        format!("Date column: [{}] {}", layout.date_index + 1, column(layout.date_index)),
        1,
    );

    log_success(format!(
        "Kept {} of {} data rows",
        stats.output_rows.saturating_sub(1),
        stats.input_rows.saturating_sub(1)
    ));
    if stats.dropped_rows > 0 {
        log_info_indent(format!("{} rows outside the date window", stats.dropped_rows), 1);
    }
    log_success(format!("Stripped {} identifier prefixes", stats.stripped_ids));
    if stats.unparsable_dates > 0 {
        log_warning(format!(
            "{} rows have unreadable dates and were kept",
            stats.unparsable_dates
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_bound;
    use crate::error::CsvError;

    const SAMPLE: &str = "No.,Date,Val\n100A,2024-01-05,x\n200B,2024-02-10,y\n300C,2024-03-01,z\n";

    fn window(start: &str, end: &str) -> DateWindow {
        DateWindow::new(parse_bound(start).ok(), parse_bound(end).ok())
    }

    #[test]
    fn test_default_options() {
        let opts = ProcessOptions::default();
        assert!(opts.window.is_unbounded());
        assert!(opts.delimiter.is_none());
        assert_eq!(opts.max_bytes, MAX_FILE_SIZE);
    }

    #[test]
    fn test_options_follow_configured_limit() {
        let config = Config::from_lookup(|key| {
            (key == crate::config::ENV_MAX_UPLOAD).then(|| "16".to_string())
        });
        let opts = ProcessOptions::from(&config);
        assert_eq!(opts.max_bytes, 16);
        assert!(opts.window.is_unbounded());

        let result = process_bytes_at(SAMPLE.as_bytes(), "x.csv", &opts, 1);
        assert!(matches!(
            result,
            Err(PipelineError::FileTooLarge { max: 16, .. })
        ));
    }

    #[test]
    fn test_output_names() {
        assert_eq!(output_base_name("report.csv", 42), "report_42");
        assert_eq!(output_base_name("report.Csv", 42), "report_42");
        assert_eq!(output_base_name("report.txt", 42), "report.txt_42");
        assert_eq!(output_base_name("my.csv.backup", 42), "my.csv.backup_42");
        assert_eq!(output_file_name("report.csv", 42), "report_42.csv");
    }

    #[test]
    fn test_accepted_uploads() {
        assert!(is_accepted_upload("data.csv", None));
        assert!(is_accepted_upload("data.txt", Some("text/plain")));
        assert!(is_accepted_upload("blob", Some("text/csv; charset=utf-8")));
        assert!(!is_accepted_upload("image.png", Some("image/png")));
        assert!(!is_accepted_upload("data.CSV", Some("application/octet-stream")));
    }

    #[test]
    fn test_size_limit() {
        assert!(check_upload_size(10, 10).is_ok());
        assert!(matches!(
            check_upload_size(11, 10),
            Err(PipelineError::FileTooLarge { size: 11, max: 10 })
        ));
    }

    #[test]
    fn test_process_bytes_end_to_end() {
        let options = ProcessOptions {
            window: window("2024-01-01", "2024-02-28"),
            ..ProcessOptions::default()
        };
        let processed = process_bytes_at(SAMPLE.as_bytes(), "ledger.csv", &options, 1700000000).unwrap();

        assert_eq!(processed.name, "ledger_1700000000.csv");
        assert_eq!(processed.mime_type, "text/csv");
        assert_eq!(processed.content, "No.,Date,Val\nA,2024-01-05,x\nB,2024-02-10,y\n");
        assert_eq!(processed.size, processed.content.len());
        assert_eq!(processed.csv_info.row_count, 3);
        assert_eq!(processed.csv_info.headers, vec!["No.", "Date", "Val"]);
        assert_eq!(processed.stats.dropped_rows, 1);
    }

    #[test]
    fn test_semicolon_input_keeps_delimiter() {
        let input = "No.;Date\n100A;2024-01-05\n";
        let processed = process_bytes_at(input.as_bytes(), "x.csv", &ProcessOptions::default(), 1).unwrap();
        assert_eq!(processed.content, "No.;Date\nA;2024-01-05\n");
        assert_eq!(processed.csv_info.delimiter, ';');
    }

    #[test]
    fn test_passthrough_when_columns_missing() {
        let input = "ID,Date\n100A,2024-01-05\n";
        let options = ProcessOptions {
            window: window("2030-01-01", "2030-12-31"),
            ..ProcessOptions::default()
        };
        let processed = process_bytes_at(input.as_bytes(), "x.csv", &options, 1).unwrap();
        assert_eq!(processed.content, input);
        assert!(processed.stats.layout.is_none());
    }

    #[test]
    fn test_empty_upload_is_parse_error() {
        let result = process_bytes_at(b"", "empty.csv", &ProcessOptions::default(), 1);
        assert!(matches!(result, Err(PipelineError::Csv(CsvError::EmptyFile))));
    }

    #[test]
    fn test_oversized_upload_rejected() {
        let options = ProcessOptions {
            max_bytes: 4,
            ..ProcessOptions::default()
        };
        let result = process_bytes_at(SAMPLE.as_bytes(), "x.csv", &options, 1);
        assert!(matches!(result, Err(PipelineError::FileTooLarge { .. })));
    }

    #[test]
    fn test_preview_truncates() {
        let long = format!("No.,Date\n{}", "100A,2024-01-05\n".repeat(40));
        let processed = process_bytes_at(long.as_bytes(), "x.csv", &ProcessOptions::default(), 1).unwrap();

        let preview = processed.preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);

        let short = process_bytes_at(SAMPLE.as_bytes(), "x.csv", &ProcessOptions::default(), 1).unwrap();
        assert_eq!(short.preview(), short.content);
    }

    #[test]
    fn test_size_kb() {
        let processed = process_bytes_at(SAMPLE.as_bytes(), "x.csv", &ProcessOptions::default(), 1).unwrap();
        assert_eq!(processed.size_kb(), format!("{:.2} KB", processed.size as f64 / 1024.0));
    }

    #[test]
    fn test_write_to_sink() {
        let processed = process_bytes_at(SAMPLE.as_bytes(), "x.csv", &ProcessOptions::default(), 1).unwrap();
        let mut sink = Vec::new();
        processed.write_to(&mut sink).unwrap();
        assert_eq!(sink, processed.content.as_bytes());
    }

    #[test]
    fn test_process_file_names_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let processed = process_file(&path, &ProcessOptions::default()).unwrap();
        assert!(processed.name.starts_with("orders_"));
        assert!(processed.name.ends_with(".csv"));
        assert_eq!(processed.stats.stripped_ids, 2);
    }
}
