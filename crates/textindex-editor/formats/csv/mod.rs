//! CSV export and import
//!
//! Export writes the fixed header `id,kind,timecode_in,timecode_out,text`,
//! one row per record in index order, CRLF line endings and the `text`
//! column always quoted. Import is a small RFC 4180 reader: quoted fields
//! with `""` escapes and embedded newlines, a leading UTF-8 BOM, CRLF or LF
//! line endings, and `,` `;` tab or `|` as delimiter (detected from the
//! header line unless given).
//!
//! Rows are numbered as records in the file, the header being row 1.

mod reconcile;

pub use reconcile::{
    apply_import, reconcile, DuplicateRow, ImportApplyReport, MismatchField, OrphanRow,
    PendingChange, ReconciliationReport, StructuralMismatch,
};

use super::FormatInfo;
use crate::core::{IndexError, Result, TextIndex};
use std::io::{Read, Write};
use textindex_core::{strip_bom, timecode_to_frames, FrameRate, Timecode};
use tracing::debug;

/// Column names, in order
pub const HEADER: [&str; 5] = ["id", "kind", "timecode_in", "timecode_out", "text"];

const DELIMITERS: [char; 4] = [',', '\t', ';', '|'];

/// Import options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CsvOptions {
    /// Field delimiter; detected from the header line when `None`
    pub delimiter: Option<char>,
}

/// One data row read back from a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    /// Record number in the file (header is row 1)
    pub row: usize,
    /// Raw id column; resolved against the index during reconciliation
    pub id: String,
    /// Raw kind column
    pub kind: String,
    pub timecode_in: u64,
    pub timecode_out: u64,
    /// Text with line endings normalized to `\n`
    pub text: String,
}

/// CSV table handler
#[derive(Debug)]
pub struct CsvFormat {
    info: FormatInfo,
}

impl CsvFormat {
    /// Create a new CSV format handler
    #[must_use]
    pub fn new() -> Self {
        Self {
            info: FormatInfo {
                name: "CSV".to_string(),
                extensions: vec!["csv".to_string()],
                mime_type: "text/csv".to_string(),
                description: "Comma-separated text index export".to_string(),
            },
        }
    }

    #[must_use]
    pub fn format_info(&self) -> &FormatInfo {
        &self.info
    }

    /// Render `index` as a table
    #[must_use]
    pub fn export_to_string(&self, index: &TextIndex) -> String {
        let rate = index.rate();
        let mut out = String::new();
        out.push_str(&HEADER.join(","));
        out.push_str("\r\n");

        for record in index.list() {
            let fields = [
                field(&record.id().to_string()),
                field(record.kind().as_str()),
                Timecode::new(record.start_frame(), rate).to_string(),
                Timecode::new(record.end_frame(), rate).to_string(),
                quoted(record.text()),
            ];
            out.push_str(&fields.join(","));
            out.push_str("\r\n");
        }

        debug!(rows = index.len(), "csv exported");
        out
    }

    /// Write the table for `index` to `writer`
    pub fn export_to_writer(&self, index: &TextIndex, writer: &mut dyn Write) -> Result<()> {
        writer
            .write_all(self.export_to_string(index).as_bytes())
            .map_err(|e| IndexError::Io(format!("Failed to write CSV: {e}")))
    }

    /// Parse a table, resolving timecodes under `rate`
    ///
    /// Fails with [`IndexError::MalformedCsv`] if the header is missing or
    /// not exactly the expected columns, and with
    /// [`IndexError::RowParseError`] for the first row whose column count
    /// or timecodes do not parse.
    pub fn import_from_str(
        &self,
        input: &str,
        rate: FrameRate,
        options: CsvOptions,
    ) -> Result<Vec<ParsedRow>> {
        let (input, _) = strip_bom(input);
        let delimiter = options
            .delimiter
            .unwrap_or_else(|| detect_delimiter(input.lines().next().unwrap_or_default()));

        let mut records = parse_records(input, delimiter)?.into_iter();
        let (_, header) = records
            .next()
            .ok_or_else(|| IndexError::MalformedCsv("missing header row".to_string()))?;
        let header_matches = header.len() == HEADER.len()
            && header.iter().zip(HEADER).all(|(found, expected)| found.trim() == expected);
        if !header_matches {
            return Err(IndexError::MalformedCsv(format!(
                "expected header '{}', found '{}'",
                HEADER.join(","),
                header.join(",")
            )));
        }

        let rows = records
            .map(|(row, fields)| parse_row(row, fields, rate))
            .collect::<Result<Vec<_>>>()?;
        debug!(rows = rows.len(), delimiter = ?delimiter, "csv imported");
        Ok(rows)
    }

    /// Read and parse a table from `reader`
    pub fn import_from_reader(
        &self,
        reader: &mut dyn Read,
        rate: FrameRate,
        options: CsvOptions,
    ) -> Result<Vec<ParsedRow>> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| IndexError::Io(format!("Failed to read CSV: {e}")))?;
        self.import_from_str(&content, rate, options)
    }
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the candidate delimiter occurring most often outside quotes
#[must_use]
pub fn detect_delimiter(header_line: &str) -> char {
    let mut counts = [0usize; DELIMITERS.len()];
    let mut in_quotes = false;
    for c in header_line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(slot) = DELIMITERS.iter().position(|d| *d == c) {
                counts[slot] += 1;
            }
        }
    }
    // max_by_key keeps the last maximum; iterate in reverse so ',' wins ties
    DELIMITERS
        .iter()
        .zip(counts)
        .rev()
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count > 0)
        .map_or(',', |(d, _)| *d)
}

fn parse_row(row: usize, fields: Vec<String>, rate: FrameRate) -> Result<ParsedRow> {
    let found = fields.len();
    let Ok([id, kind, tc_in, tc_out, text]) = <[String; 5]>::try_from(fields) else {
        return Err(IndexError::row(
            row,
            format!("expected {} columns, found {found}", HEADER.len()),
        ));
    };
    let timecode_in = timecode_to_frames(&tc_in, rate)
        .map_err(|e| IndexError::row(row, format!("timecode_in: {e}")))?;
    let timecode_out = timecode_to_frames(&tc_out, rate)
        .map_err(|e| IndexError::row(row, format!("timecode_out: {e}")))?;
    Ok(ParsedRow {
        row,
        id: id.trim().to_string(),
        kind: kind.trim().to_string(),
        timecode_in,
        timecode_out,
        text,
    })
}

/// Split `input` into records of fields, skipping blank lines
fn parse_records(input: &str, delimiter: char) -> Result<Vec<(usize, Vec<String>)>> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_quoted = false;
    let mut row = 1;
    let mut chars = input.chars().peekable();

    let mut end_record = |fields: &mut Vec<String>,
                          field: &mut String,
                          quoted: bool,
                          row: &mut usize| {
        let blank = fields.is_empty() && field.is_empty() && !quoted;
        fields.push(core::mem::take(field));
        if !blank {
            records.push((*row, core::mem::take(fields)));
        }
        fields.clear();
        *row += 1;
    };

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !field_quoted => {
                in_quotes = true;
                field_quoted = true;
            }
            '"' => return Err(IndexError::row(row, "unexpected quote in unquoted field")),
            c if c == delimiter => {
                fields.push(core::mem::take(&mut field));
                field_quoted = false;
            }
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                end_record(&mut fields, &mut field, field_quoted, &mut row);
                field_quoted = false;
            }
            _ if field_quoted => {
                return Err(IndexError::row(row, "characters after closing quote"));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(IndexError::row(row, "unterminated quoted field"));
    }
    if !fields.is_empty() || !field.is_empty() || field_quoted {
        end_record(&mut fields, &mut field, field_quoted, &mut row);
    }
    Ok(records)
}

fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        quoted(value)
    } else {
        value.to_string()
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use textindex_core::{ElementId, ElementKind, ElementRecord};

    fn sample_index() -> TextIndex {
        let records = vec![
            ElementRecord::new(ElementId::new(1, 0), ElementKind::Subtitle, 1, 0, 100, 150, "Hello wrold")
                .unwrap(),
            ElementRecord::new(
                ElementId::new(1, 1),
                ElementKind::MultiText,
                2,
                0,
                0,
                50,
                "She said \"hi\",\nthen left",
            )
            .unwrap(),
        ];
        TextIndex::from_records(1, FrameRate::PAL, records)
    }

    #[test]
    fn export_rows() {
        let out = CsvFormat::new().export_to_string(&sample_index());
        let expected = "id,kind,timecode_in,timecode_out,text\r\n\
                        1-0,Subtitle,00:00:04:00,00:00:06:00,\"Hello wrold\"\r\n\
                        1-1,MultiText,00:00:00:00,00:00:02:00,\"She said \"\"hi\"\",\nthen left\"\r\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn import_reads_export() {
        let format = CsvFormat::new();
        let index = sample_index();
        let rows = format
            .import_from_str(&format.export_to_string(&index), FrameRate::PAL, CsvOptions::default())
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[0].timecode_in, 100);
        assert_eq!(rows[1].row, 3);
        assert_eq!(rows[1].text, "She said \"hi\",\nthen left");
    }

    #[test]
    fn import_handles_bom_semicolons_and_blank_lines() {
        let input = "\u{feff}id;kind;timecode_in;timecode_out;text\n\n1-0;Subtitle;00:00:04:00;00:00:06:00;\"a;b\r\nc\"\n";
        let rows = CsvFormat::new()
            .import_from_str(input, FrameRate::PAL, CsvOptions::default())
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, 3);
        assert_eq!(rows[0].text, "a;b\r\nc");
    }

    #[test]
    fn quoted_line_breaks_are_kept_verbatim() {
        let input = "id,kind,timecode_in,timecode_out,text\r\n\
                     1-0,Subtitle,00:00:04:00,00:00:06:00,\"one\r\ntwo\rthree\u{2028}four\"\r\n";
        let rows = CsvFormat::new()
            .import_from_str(input, FrameRate::PAL, CsvOptions::default())
            .unwrap();
        assert_eq!(rows[0].text, "one\r\ntwo\rthree\u{2028}four");
    }

    #[test]
    fn header_must_match() {
        let err = CsvFormat::new()
            .import_from_str("id,kind,start,end,text\n", FrameRate::PAL, CsvOptions::default())
            .unwrap_err();
        assert!(matches!(err, IndexError::MalformedCsv(_)));
        assert!(matches!(
            CsvFormat::new().import_from_str("", FrameRate::PAL, CsvOptions::default()),
            Err(IndexError::MalformedCsv(_))
        ));
    }

    #[test]
    fn row_errors_carry_row_numbers() {
        let format = CsvFormat::new();
        let header = "id,kind,timecode_in,timecode_out,text\n";

        let short = format!("{header}1-0,Subtitle,00:00:04:00\n");
        assert_eq!(
            format.import_from_str(&short, FrameRate::PAL, CsvOptions::default()),
            Err(IndexError::row(2, "expected 5 columns, found 3"))
        );

        let bad_tc = format!("{header}1-0,Subtitle,00:00:04:00,00:00:06:00,ok\n1-1,Text,00:00:04:30,00:00:06:00,x\n");
        assert!(matches!(
            format.import_from_str(&bad_tc, FrameRate::PAL, CsvOptions::default()),
            Err(IndexError::RowParseError { row: 3, .. })
        ));

        let unterminated = format!("{header}1-0,Subtitle,00:00:04:00,00:00:06:00,\"open\n");
        assert!(matches!(
            format.import_from_str(&unterminated, FrameRate::PAL, CsvOptions::default()),
            Err(IndexError::RowParseError { .. })
        ));
    }

    #[test]
    fn delimiter_detection() {
        assert_eq!(detect_delimiter("id,kind,timecode_in,timecode_out,text"), ',');
        assert_eq!(detect_delimiter("id\tkind\ttimecode_in\ttimecode_out\ttext"), '\t');
        assert_eq!(detect_delimiter("id|kind|timecode_in|timecode_out|text"), '|');
        assert_eq!(detect_delimiter("\"a,b\";c;d"), ';');
        assert_eq!(detect_delimiter("nothing"), ',');
    }
}
