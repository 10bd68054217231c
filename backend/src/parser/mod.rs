//! Delimited text parser with encoding and delimiter auto-detection.
//!
//! Turns raw bytes into a [`Table`] (row 0 is the header, no header
//! interpretation happens here) and serializes a [`Table`] back to text.

use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{Row, Table};

/// Delimiters considered by [`detect_delimiter`], in priority order.
const CANDIDATE_DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed grid, header first
    pub table: Table,
    /// Detected encoding
    pub encoding: String,
    /// Detected or forced delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// A leading UTF-8 byte order mark is dropped so it never ends up glued to
/// the first header cell.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let content = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match String::from_utf8(bytes.to_vec()) {
            Ok(s) => s,
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    Ok(content
        .strip_prefix('\u{feff}')
        .map(str::to_string)
        .unwrap_or(content))
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Falls back to a comma when no candidate appears.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &CANDIDATE_DELIMITERS {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

fn delimiter_byte(delimiter: char) -> CsvResult<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CsvError::Parse {
            line: 0,
            message: format!("Delimiter '{}' is not a single ASCII character", delimiter),
        })
}

/// Line of a quoted field that is still open at end of input.
///
/// Quotes only open a field at its start; elsewhere they are literal, as in
/// the `csv` reader.
fn unterminated_quote(content: &str, delimiter: char) -> Option<u64> {
    let mut line = 1;
    let mut opened_at = None;
    let mut field_start = true;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if opened_at.is_some() {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                }
                '"' => opened_at = None,
                '\n' => line += 1,
                _ => {}
            }
            continue;
        }

        match c {
            '"' if field_start => {
                opened_at = Some(line);
                field_start = false;
            }
            '\n' => {
                line += 1;
                field_start = true;
            }
            c if c == delimiter => field_start = true,
            _ => field_start = false,
        }
    }

    opened_at
}

/// Parse text into a [`Table`] with an explicit delimiter.
///
/// Quoted fields follow RFC 4180. Records may have differing lengths and
/// blank lines are skipped. A quoted field left open at end of input is a
/// [`CsvError::Parse`] rather than a cell swallowing the rest of the file.
///
/// # Example
/// ```
/// use csvwindow::parser::parse_str;
///
/// let table = parse_str("No.,Date\n100A,2024-01-05", ',').unwrap();
/// assert_eq!(table.rows[1], vec!["100A", "2024-01-05"]);
/// ```
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<Table> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let sep = delimiter_byte(delimiter)?;
    if let Some(line) = unterminated_quote(content, delimiter) {
        return Err(CsvError::Parse {
            line,
            message: "quoted field is never closed".to_string(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sep)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows: Vec<Row> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    if rows.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    Ok(Table::new(rows))
}

/// Parse bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    parse_bytes_with(bytes, None)
}

/// Parse bytes with auto-detected encoding and an optional forced delimiter.
pub fn parse_bytes_with(bytes: &[u8], delimiter: Option<char>) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let table = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Parse a file with auto-detection of encoding and delimiter.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Serialize a [`Table`] back to delimited text.
///
/// Fields are quoted only when needed and records end with `\n`.
pub fn serialize(table: &Table, delimiter: char) -> CsvResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in &table.rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::Write(e.to_string()))
}
