//! Domain models for tabular data and date windows.
//!
//! A [`Table`] is a grid of text cells where row 0 is the header. Rows are
//! allowed to be ragged; nothing here enforces a uniform width.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Header cell that marks the identifier column (exact, case-sensitive).
pub const ID_COLUMN: &str = "No.";

/// Substring that marks the date column (matched case-insensitively).
pub const DATE_COLUMN_MARKER: &str = "date";

/// Prefixes removed from the start of identifier cells.
pub const ID_PREFIXES: [&str; 2] = ["100", "200"];

/// A single record: cells by column index.
pub type Row = Vec<String>;

// =============================================================================
// Table
// =============================================================================

/// Parsed delimited text. Row 0 is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Build a table from string literals. Handy in tests and examples.
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Total number of rows, header included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of the header row.
    pub fn column_count(&self) -> usize {
        self.header().map(Vec::len).unwrap_or(0)
    }
}

// =============================================================================
// Column layout
// =============================================================================

/// Positions of the identifier and date columns found in a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLayout {
    pub id_index: usize,
    pub date_index: usize,
}

// =============================================================================
// Date window
// =============================================================================

/// Optional inclusive `[start, end]` bounds.
///
/// The window does not check `start <= end`; an inverted window simply
/// contains no parsable dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether a row dated `value` survives the window.
    ///
    /// `None` (an unparsable date) compares neither before nor after any
    /// bound, so it is always kept.
    pub fn contains(&self, value: Option<NaiveDateTime>) -> bool {
        let Some(date) = value else {
            return true;
        };
        if matches!(self.start, Some(start) if date < start) {
            return false;
        }
        if matches!(self.end, Some(end) if date > end) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_data_rows_skip_header() {
        let table = Table::from_rows([["No.", "Date"], ["1", "2024-01-01"]]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.data_rows().len(), 1);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_empty_table() {
        let table = Table::default();
        assert!(table.is_empty());
        assert!(table.header().is_none());
        assert!(table.data_rows().is_empty());
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = DateWindow::new(Some(at(2024, 1, 1)), Some(at(2024, 1, 31)));
        assert!(window.contains(Some(at(2024, 1, 1))));
        assert!(window.contains(Some(at(2024, 1, 31))));
        assert!(!window.contains(Some(at(2023, 12, 31))));
        assert!(!window.contains(Some(at(2024, 2, 1))));
    }

    #[test]
    fn test_window_keeps_unparsable() {
        let window = DateWindow::new(Some(at(2024, 1, 1)), Some(at(2024, 1, 31)));
        assert!(window.contains(None));
    }

    #[test]
    fn test_inverted_window_contains_nothing_parsable() {
        let window = DateWindow::new(Some(at(2024, 2, 1)), Some(at(2024, 1, 1)));
        assert!(!window.contains(Some(at(2024, 1, 15))));
        assert!(window.contains(None));
    }

    #[test]
    fn test_table_serializes_as_grid() {
        let table = Table::from_rows([["a", "b"], ["1", "2"]]);
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json, serde_json::json!([["a", "b"], ["1", "2"]]));
    }
}
