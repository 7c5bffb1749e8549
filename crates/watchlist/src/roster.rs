use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::debug;

use common::{Error, Result, RosterRow, WatchlistSource};

/// Header names accepted for the symbol-code column (matched case-insensitively).
pub const CODE_HEADERS: &[&str] = &["code", "コード", "銘柄コード", "証券コード"];
/// Header names accepted for the display-name column (matched case-insensitively).
pub const NAME_HEADERS: &[&str] = &["name", "銘柄名", "名前", "会社名"];

/// Keep only rows whose `column` contains `contains`, e.g. the market-segment
/// classification of an exchange listing.
#[derive(Debug, Clone)]
pub struct SegmentFilter {
    pub column: String,
    pub contains: String,
}

/// Container format of a roster payload, sniffed from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFormat {
    Csv,
    /// `.xlsx` (zip) or legacy `.xls` (OLE compound document).
    Workbook,
}

impl RosterFormat {
    pub fn sniff(bytes: &[u8]) -> Self {
        const ZIP: &[u8] = b"PK\x03\x04";
        const OLE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        if bytes.starts_with(ZIP) || bytes.starts_with(OLE) {
            RosterFormat::Workbook
        } else {
            RosterFormat::Csv
        }
    }
}

/// Parse a roster payload of either format.
pub fn parse_roster_bytes(bytes: &[u8], filter: Option<&SegmentFilter>) -> Result<Vec<RosterRow>> {
    match RosterFormat::sniff(bytes) {
        RosterFormat::Csv => parse_roster(bytes, filter),
        RosterFormat::Workbook => parse_workbook(bytes, filter),
    }
}

/// Parse a roster table from CSV.
///
/// The code column is required; the name column is optional and blank names
/// are reported as `None`.
pub fn parse_roster<R: std::io::Read>(reader: R, filter: Option<&SegmentFilter>) -> Result<Vec<RosterRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| Error::WatchlistSource(format!("unreadable header row: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| Error::WatchlistSource(e.to_string()))?;
        records.push(record.iter().map(str::to_string).collect());
    }
    rows_from_table(&headers, records, filter)
}

/// Parse the first sheet of an `.xlsx` / `.xls` workbook. The first row is
/// the header row.
pub fn parse_workbook(bytes: &[u8], filter: Option<&SegmentFilter>) -> Result<Vec<RosterRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| Error::WatchlistSource(format!("unreadable workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::WatchlistSource("workbook has no sheets".to_string()))?
        .map_err(|e| Error::WatchlistSource(format!("unreadable sheet: {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| Error::WatchlistSource("workbook sheet is empty".to_string()))?
        .iter()
        .map(cell_text)
        .collect();
    let records = rows.map(|row| row.iter().map(cell_text).collect()).collect();
    rows_from_table(&headers, records, filter)
}

/// Integral floats print without the fraction so numeric code cells read as
/// `7203`, not `7203.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Shared header matching and row extraction for every roster format.
fn rows_from_table(
    raw_headers: &[String],
    records: Vec<Vec<String>>,
    filter: Option<&SegmentFilter>,
) -> Result<Vec<RosterRow>> {
    let headers: Vec<String> = raw_headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();

    let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));

    let code_idx = find(CODE_HEADERS).ok_or_else(|| {
        Error::WatchlistSource(format!(
            "no code column (expected one of {CODE_HEADERS:?}, found {headers:?})"
        ))
    })?;
    let name_idx = find(NAME_HEADERS);
    let segment = match filter {
        Some(f) => {
            let wanted = f.column.trim().to_lowercase();
            let idx = headers.iter().position(|h| *h == wanted).ok_or_else(|| {
                Error::WatchlistSource(format!("no segment column '{}'", f.column))
            })?;
            Some((idx, f.contains.as_str()))
        }
        None => None,
    };

    let mut rows = Vec::new();
    for record in &records {
        if let Some((idx, text)) = segment {
            if !cell(record, idx).contains(text) {
                continue;
            }
        }

        let code = cell(record, code_idx);
        if code.is_empty() {
            continue;
        }
        let name = name_idx
            .map(|i| cell(record, i))
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        rows.push(RosterRow {
            code: code.to_string(),
            name,
        });
    }

    debug!(rows = rows.len(), "Parsed roster");
    Ok(rows)
}

fn cell(record: &[String], idx: usize) -> &str {
    record.get(idx).map(|s| s.trim()).unwrap_or("")
}

/// Roster kept as a local file: CSV, `.xlsx`, or `.xls`.
pub struct RosterFileSource {
    path: PathBuf,
}

impl RosterFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WatchlistSource for RosterFileSource {
    fn describe(&self) -> String {
        format!("roster file {}", self.path.display())
    }

    async fn load(&self) -> Result<Vec<RosterRow>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::WatchlistSource(format!("cannot open {}: {e}", self.path.display()))
        })?;
        parse_roster_bytes(&bytes, None)
    }
}
