//! REST API types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::transform::pipeline::ProcessedFile;
use crate::transform::TransformStats;

/// JSON response for `POST /api/preview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready" or "unchanged" (no `No.`/date column found)
    pub status: String,

    /// Processed file, content included
    pub file: FileInfo,

    /// What the transformation did
    pub metadata: ResponseMetadata,
}

/// The downloadable artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub mime_type: String,
    pub size: usize,
    pub size_label: String,
    pub preview: String,
    pub content: String,
}

/// Metadata about the run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub csv_info: CsvMetadata,
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_rows: usize,
    pub stripped_ids: usize,
    pub unparsable_dates: usize,
    pub id_column: Option<usize>,
    pub date_column: Option<usize>,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl ResponseMetadata {
    fn from_stats(stats: &TransformStats, csv_info: CsvMetadata) -> Self {
        Self {
            csv_info,
            rows_in: stats.input_rows.saturating_sub(1),
            rows_out: stats.output_rows.saturating_sub(1),
            dropped_rows: stats.dropped_rows,
            stripped_ids: stats.stripped_ids,
            unparsable_dates: stats.unparsable_dates,
            id_column: stats.layout.map(|l| l.id_index),
            date_column: stats.layout.map(|l| l.date_index),
        }
    }
}

impl From<ProcessedFile> for ProcessResponse {
    fn from(processed: ProcessedFile) -> Self {
        let preview = processed.preview();
        let size_label = processed.size_kb();
        let status = if processed.stats.layout.is_some() { "ready" } else { "unchanged" };

        let csv_info = CsvMetadata {
            encoding: processed.csv_info.encoding,
            delimiter: processed.csv_info.delimiter.to_string(),
            row_count: processed.csv_info.row_count,
            columns: processed.csv_info.headers,
        };

        ProcessResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            metadata: ResponseMetadata::from_stats(&processed.stats, csv_info),
            file: FileInfo {
                name: processed.name,
                mime_type: processed.mime_type,
                size: processed.size,
                size_label,
                preview,
                content: processed.content,
            },
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::pipeline::{process_bytes_at, ProcessOptions};

    #[test]
    fn test_response_from_processed_file() {
        let processed = process_bytes_at(
            b"No.,Date\n100A,2024-01-05\n",
            "in.csv",
            &ProcessOptions::default(),
            99,
        )
        .unwrap();

        let response = ProcessResponse::from(processed);
        assert_eq!(response.status, "ready");
        assert_eq!(response.file.name, "in_99.csv");
        assert_eq!(response.file.mime_type, "text/csv");
        assert_eq!(response.metadata.rows_in, 1);
        assert_eq!(response.metadata.stripped_ids, 1);
        assert_eq!(response.metadata.id_column, Some(0));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["metadata"]["csvInfo"]["columns"][1], "Date");
        assert!(json["jobId"].is_string());
    }

    #[test]
    fn test_unchanged_status() {
        let processed =
            process_bytes_at(b"a,b\n1,2\n", "in.csv", &ProcessOptions::default(), 1).unwrap();
        let response = ProcessResponse::from(processed);
        assert_eq!(response.status, "unchanged");
        assert_eq!(response.metadata.date_column, None);
    }

    #[test]
    fn test_error_response_shape() {
        let value = error_response("No file provided");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "No file provided");
    }
}
