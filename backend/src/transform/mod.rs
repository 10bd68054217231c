//! Table transformation.
//!
//! The transformer takes a parsed [`Table`] and an optional inclusive
//! [`DateWindow`] and produces a new table where:
//!
//! 1. data rows dated outside the window are dropped, and
//! 2. the identifier column (`No.`) loses a leading `100` or `200`.
//!
//! The header row always passes through untouched. When the header has no
//! `No.` cell or no cell containing `date` (any case) the table is returned
//! as is. Nothing in this module fails: unparsable dates keep their row and
//! short rows without an identifier cell are left alone.
//!
//! The [`pipeline`] submodule wires parsing, transformation and output
//! naming together for the CLI and HTTP server.

pub mod pipeline;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::dates::parse_datetime;
use crate::models::{
    ColumnLayout, DateWindow, Row, Table, DATE_COLUMN_MARKER, ID_COLUMN, ID_PREFIXES,
};

/// Counters describing what a transformation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformStats {
    /// Rows in the input, header included
    pub input_rows: usize,
    /// Rows in the output, header included
    pub output_rows: usize,
    /// Data rows removed by the date window
    pub dropped_rows: usize,
    /// Identifier cells that lost a prefix
    pub stripped_ids: usize,
    /// Kept rows whose date cell could not be parsed
    pub unparsable_dates: usize,
    /// Detected columns; `None` means the table passed through unchanged
    pub layout: Option<ColumnLayout>,
}

/// Find the identifier and date columns in a header row.
///
/// The identifier column is the first cell equal to `No.`; the date column is
/// the first cell whose lowercase text contains `date`.
pub fn locate_columns(header: &[String]) -> Option<ColumnLayout> {
    let id_index = header.iter().position(|cell| cell == ID_COLUMN)?;
    let date_index = header
        .iter()
        .position(|cell| cell.to_lowercase().contains(DATE_COLUMN_MARKER))?;

    Some(ColumnLayout {
        id_index,
        date_index,
    })
}

/// Remove one leading `100` or `200` from an identifier.
pub fn strip_id_prefix(value: &str) -> &str {
    ID_PREFIXES
        .iter()
        .find_map(|prefix| value.strip_prefix(prefix))
        .unwrap_or(value)
}

/// Parse the date cell of a row. Missing cells behave like unparsable ones.
fn row_date(row: &Row, date_index: usize) -> Option<NaiveDateTime> {
    row.get(date_index).and_then(|cell| parse_datetime(cell))
}

/// Keep the header and every data row whose date falls inside `window`.
pub fn filter_rows(table: &Table, date_index: usize, window: &DateWindow) -> Table {
    let rows = table
        .rows
        .iter()
        .enumerate()
        .filter(|(idx, row)| *idx == 0 || window.contains(row_date(row, date_index)))
        .map(|(_, row)| row.clone())
        .collect();

    Table::new(rows)
}

/// Strip identifier prefixes in every data row. Other cells are untouched.
pub fn strip_prefixes(table: &Table, id_index: usize) -> Table {
    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut row = row.clone();
            if idx > 0 {
                if let Some(cell) = row.get_mut(id_index) {
                    *cell = strip_id_prefix(cell).to_string();
                }
            }
            row
        })
        .collect();

    Table::new(rows)
}

/// Apply the date window and identifier cleanup.
///
/// # Example
/// ```
/// use csvwindow::models::{DateWindow, Table};
/// use csvwindow::transform::transform_table;
///
/// let table = Table::from_rows([["No.", "Date"], ["100A", "2024-01-05"]]);
/// let out = transform_table(&table, &DateWindow::unbounded());
/// assert_eq!(out.rows[1][0], "A");
/// ```
pub fn transform_table(table: &Table, window: &DateWindow) -> Table {
    transform_with_stats(table, window).0
}

/// [`transform_table`] taking the two optional bounds directly.
pub fn transform(
    table: &Table,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Table {
    transform_table(table, &DateWindow::new(start, end))
}

/// Transform and report what changed.
pub fn transform_with_stats(table: &Table, window: &DateWindow) -> (Table, TransformStats) {
    let mut stats = TransformStats {
        input_rows: table.len(),
        output_rows: table.len(),
        ..TransformStats::default()
    };

    let Some(layout) = table.header().and_then(|header| locate_columns(header)) else {
        return (table.clone(), stats);
    };
    stats.layout = Some(layout);

    let filtered = filter_rows(table, layout.date_index, window);
    let output = strip_prefixes(&filtered, layout.id_index);

    for (before, after) in filtered.data_rows().iter().zip(output.data_rows()) {
        if before.get(layout.id_index) != after.get(layout.id_index) {
            stats.stripped_ids += 1;
        }
        if row_date(before, layout.date_index).is_none() {
            stats.unparsable_dates += 1;
        }
    }
    stats.output_rows = output.len();
    stats.dropped_rows = stats.input_rows - stats.output_rows;

    (output, stats)
}
