//! Delimited input reader with encoding and delimiter auto-detection.
//!
//! Produces ordered string rows. The first row is the header; nothing here
//! interprets column names. Lookup tables may also come from an Excel
//! worksheet, see [`workbook`].

pub mod workbook;

pub use workbook::{is_workbook_path, read_sheet};

use std::io::Read;
use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// Rows read from one delimited source, with detection metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// First row of the source
    pub headers: Vec<String>,
    /// Remaining rows, in source order
    pub rows: Vec<Vec<String>>,
    /// Detected encoding
    pub encoding: String,
    /// Detected or configured delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the given encoding.
///
/// UTF-8 keeps a leading byte-order mark here; the csv reader drops it from
/// the first header cell.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode_without_bom_handling(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Split decoded content into rows.
///
/// Record lengths may vary; short rows are caught by the transformer, which
/// knows which positions are required. Blank lines are skipped.
pub fn parse_rows(content: &str, delimiter: char) -> CsvResult<Vec<Vec<String>>> {
    if !delimiter.is_ascii() {
        return Err(CsvError::InvalidDelimiter(delimiter));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        rows.push(record.iter().map(String::from).collect());
    }
    Ok(rows)
}

/// Parse raw bytes, detecting the encoding and (unless given) the delimiter.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));

    let mut rows = parse_rows(&content, delimiter)?.into_iter();
    let headers = rows.next().ok_or(CsvError::EmptyFile)?;

    Ok(ParseResult {
        headers,
        rows: rows.collect(),
        encoding,
        delimiter,
    })
}

/// Parse a delimited file.
pub fn parse_file<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> CsvResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| CsvError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_bytes(&bytes, delimiter)
}

/// Parse the configured input: a file path, or standard input when empty.
pub fn read_input(path: &str, delimiter: Option<char>) -> CsvResult<ParseResult> {
    if !path.is_empty() {
        return parse_file(path, delimiter);
    }

    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .map_err(|source| CsvError::Io {
            path: "<stdin>".to_string(),
            source,
        })?;
    parse_bytes(&bytes, delimiter)
}
