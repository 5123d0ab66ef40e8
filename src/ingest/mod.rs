//! Tabular ingestion: uploaded bytes to DataFrame
//!
//! Uploads are MIME-agnostic, so decoding is attempted under a fixed ladder
//! of text encodings before falling back to spreadsheet parsing. The attempt
//! order is significant: ambiguous byte sequences must decode the same way
//! on every run.

use crate::error::{DatasageError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;

/// Text encodings tried, in order, before the spreadsheet fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Strict UTF-8 (BOM stripped if present)
    Utf8,
    /// UTF-16, endianness taken from the BOM (little-endian when absent)
    Utf16,
    /// Windows-1252, the practical superset of Latin-1 used by Excel exports
    Latin1,
}

const TEXT_ENCODINGS: [TextEncoding; 3] =
    [TextEncoding::Utf8, TextEncoding::Utf16, TextEncoding::Latin1];

/// Converts an uploaded byte blob into a DataFrame
pub struct TabularIngestor {
    /// Rows used for CSV schema inference
    infer_schema_rows: usize,
}

impl Default for TabularIngestor {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularIngestor {
    /// Create a new ingestor
    pub fn new() -> Self {
        Self {
            infer_schema_rows: 100,
        }
    }

    /// Set the number of rows used for CSV schema inference
    pub fn with_infer_schema_rows(mut self, n: usize) -> Self {
        self.infer_schema_rows = n;
        self
    }

    /// Load raw bytes as a table.
    ///
    /// Tries delimited text under each supported encoding in order, accepting
    /// the first one where both the decode and the parse succeed. If no text
    /// attempt works, tries the bytes as a spreadsheet workbook. Fails with
    /// [`DatasageError::ContentUnreadable`] when neither succeeds.
    pub fn load(&self, raw_bytes: &[u8]) -> Result<DataFrame> {
        let mut last_text_error = String::from("no decodable text encoding");

        for encoding in TEXT_ENCODINGS {
            let Some(text) = decode(encoding, raw_bytes) else {
                continue;
            };
            match self.parse_csv(&text) {
                Ok(df) => {
                    tracing::debug!(?encoding, rows = df.height(), "decoded upload as delimited text");
                    return Ok(df);
                }
                Err(e) => last_text_error = e.to_string(),
            }
        }

        match self.parse_workbook(raw_bytes) {
            Ok(df) => {
                tracing::debug!(rows = df.height(), "decoded upload as spreadsheet");
                Ok(df)
            }
            Err(sheet_error) => Err(DatasageError::ContentUnreadable {
                csv_error: last_text_error,
                sheet_error,
            }),
        }
    }

    /// Read a file from disk and load it through the same attempt ladder
    pub fn load_path(&self, path: &Path) -> Result<DataFrame> {
        let bytes = std::fs::read(path)?;
        self.load(&bytes)
    }

    fn parse_csv(&self, text: &str) -> Result<DataFrame> {
        let cursor = Cursor::new(text.as_bytes().to_vec());

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_rows))
            .into_reader_with_file_handle(cursor)
            .finish()
            .map_err(|e| DatasageError::DataError(e.to_string()))?;

        // A wrong-encoding decode of a real table collapses to one header-only
        // column (the newlines vanish into multi-byte units); reject that shape.
        if df.width() == 0 || (df.height() == 0 && df.width() <= 1) {
            return Err(DatasageError::DataError(
                "parsed without tabular structure".to_string(),
            ));
        }
        Ok(df)
    }

    fn parse_workbook(&self, raw_bytes: &[u8]) -> std::result::Result<DataFrame, String> {
        let cursor = Cursor::new(raw_bytes.to_vec());
        let mut workbook = open_workbook_auto_from_rs(cursor).map_err(|e| e.to_string())?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| "workbook has no sheets".to_string())?
            .map_err(|e| e.to_string())?;

        let mut rows = range.rows();
        let header = rows.next().ok_or_else(|| "sheet is empty".to_string())?;

        let names: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let name = cell_to_string(cell);
                if name.is_empty() {
                    format!("column_{i}")
                } else {
                    name
                }
            })
            .collect();

        let data_rows: Vec<&[Data]> = rows.collect();
        let columns = names
            .iter()
            .enumerate()
            .map(|(col_idx, name)| build_column(name, col_idx, &data_rows))
            .collect::<Vec<Column>>();

        DataFrame::new(columns).map_err(|e| e.to_string())
    }
}

fn decode(encoding: TextEncoding, bytes: &[u8]) -> Option<String> {
    match encoding {
        TextEncoding::Utf8 => {
            let stripped = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
            encoding_rs::UTF_8
                .decode_without_bom_handling_and_without_replacement(stripped)
                .map(|cow| cow.into_owned())
        }
        TextEncoding::Utf16 => {
            let (codec, payload) = if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
                (encoding_rs::UTF_16LE, rest)
            } else if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
                (encoding_rs::UTF_16BE, rest)
            } else {
                (encoding_rs::UTF_16LE, bytes)
            };
            codec
                .decode_without_bom_handling_and_without_replacement(payload)
                .map(|cow| cow.into_owned())
        }
        TextEncoding::Latin1 => {
            // Windows-1252 assigns every byte, so this attempt always decodes;
            // parsing is what decides whether it was really text.
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            Some(decoded.into_owned())
        }
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Build a Series for one sheet column, numeric when every non-empty cell is
fn build_column(name: &str, col_idx: usize, data_rows: &[&[Data]]) -> Column {
    let cells: Vec<&Data> = data_rows
        .iter()
        .map(|row| row.get(col_idx).unwrap_or(&Data::Empty))
        .collect();

    let all_numeric = cells.iter().all(|cell| {
        matches!(
            cell,
            Data::Empty | Data::Float(_) | Data::Int(_) | Data::Bool(_)
        )
    });

    if all_numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Data::Float(f) => Some(*f),
                Data::Int(i) => Some(*i as f64),
                Data::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values).into()
    } else {
        let values: Vec<Option<String>> = cells
            .iter()
            .map(|cell| match cell {
                Data::Empty => None,
                other => Some(cell_to_string(other)),
            })
            .collect();
        Series::new(name.into(), values).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "name,age,city\nLéa,34,Paris\nNoé,27,Lyon\n";

    fn utf16le_bytes(s: &str) -> Vec<u8> {
        let mut out = vec![0xFF, 0xFE];
        for unit in s.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    }

    fn latin1_bytes(s: &str) -> Vec<u8> {
        // All chars in SAMPLE fit in Windows-1252's Latin range
        s.chars()
            .map(|c| {
                let code = c as u32;
                assert!(code < 256, "test fixture must stay single-byte");
                code as u8
            })
            .collect()
    }

    fn assert_sample_table(df: &DataFrame) {
        assert_eq!(df.shape(), (2, 3));
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["name", "age", "city"]);
        let first = df.column("name").unwrap().str().unwrap().get(0).unwrap();
        assert_eq!(first, "Léa");
    }

    #[test]
    fn test_load_utf8() {
        let ingestor = TabularIngestor::new();
        let df = ingestor.load(SAMPLE.as_bytes()).unwrap();
        assert_sample_table(&df);
    }

    #[test]
    fn test_load_utf16_with_bom() {
        let ingestor = TabularIngestor::new();
        let df = ingestor.load(&utf16le_bytes(SAMPLE)).unwrap();
        assert_sample_table(&df);
    }

    #[test]
    fn test_load_latin1() {
        let ingestor = TabularIngestor::new();
        let df = ingestor.load(&latin1_bytes(SAMPLE)).unwrap();
        assert_sample_table(&df);
    }

    #[test]
    fn test_unreadable_content() {
        let ingestor = TabularIngestor::new();
        let err = ingestor.load(b"").unwrap_err();
        assert!(matches!(err, DatasageError::ContentUnreadable { .. }));
    }

    #[test]
    fn test_load_path_round_trip() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{SAMPLE}").unwrap();

        let ingestor = TabularIngestor::new();
        let df = ingestor.load_path(file.path()).unwrap();
        assert_sample_table(&df);
    }

    #[test]
    fn test_missing_values_survive_ingest() {
        let csv = "a,b\n1,\n2,5\n";
        let df = TabularIngestor::new().load(csv.as_bytes()).unwrap();
        assert_eq!(df.column("b").unwrap().null_count(), 1);
    }
}
