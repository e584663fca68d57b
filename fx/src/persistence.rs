//! Cache snapshot encoding (JSON and CSV) and file mirroring.
//!
//! The CSV layout introduces each (base, date) block with a
//! `base,date,<BASE>,<DATE>` line followed by one `<CODE>,<RATE>` line per
//! currency.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use fxquote_common::{Currency, Rates};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::PersistenceError;

/// Full cache contents: base -> date -> rates.
pub type Snapshot = BTreeMap<Currency, BTreeMap<NaiveDate, Rates>>;

const HEADER_BASE: &str = "base";
const HEADER_DATE: &str = "date";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// On-disk snapshot encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    #[default]
    Json,
    Csv,
}

impl SnapshotFormat {
    /// Format implied by a file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotFormat::Json => write!(f, "json"),
            SnapshotFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for SnapshotFormat {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(SnapshotFormat::Json),
            "csv" => Ok(SnapshotFormat::Csv),
            other => Err(PersistenceError::Format(format!(
                "unsupported snapshot format '{}', expected 'json' or 'csv'",
                other
            ))),
        }
    }
}

/// A snapshot file location and its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub path: PathBuf,
    pub format: SnapshotFormat,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>, format: SnapshotFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn json(path: impl Into<PathBuf>) -> Self {
        Self::new(path, SnapshotFormat::Json)
    }

    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Self::new(path, SnapshotFormat::Csv)
    }
}

/// Encode a snapshot as text.
pub fn encode(snapshot: &Snapshot, format: SnapshotFormat) -> Result<String, PersistenceError> {
    match format {
        SnapshotFormat::Json => Ok(serde_json::to_string(snapshot)?),
        SnapshotFormat::Csv => encode_csv(snapshot),
    }
}

/// Decode a snapshot from text.
pub fn decode(text: &str, format: SnapshotFormat) -> Result<Snapshot, PersistenceError> {
    match format {
        SnapshotFormat::Json => Ok(serde_json::from_str(text)?),
        SnapshotFormat::Csv => decode_csv(text),
    }
}

/// Overwrite `file` with the encoded snapshot.
pub fn write_snapshot(file: &SnapshotFile, snapshot: &Snapshot) -> Result<(), PersistenceError> {
    let encoded = encode(snapshot, file.format)?;
    std::fs::write(&file.path, encoded)?;
    debug!(path = %file.path.display(), format = %file.format, "Snapshot written");
    Ok(())
}

/// Read and decode a snapshot file.
pub fn read_snapshot(file: &SnapshotFile) -> Result<Snapshot, PersistenceError> {
    let text = std::fs::read_to_string(&file.path)?;
    decode(&text, file.format)
}

fn encode_csv(snapshot: &Snapshot) -> Result<String, PersistenceError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for (base, dates) in snapshot {
        for (date, rates) in dates {
            let date = date.format(DATE_FORMAT).to_string();
            writer.write_record([HEADER_BASE, HEADER_DATE, base.code(), date.as_str()])?;
            for (code, rate) in rates {
                writer.write_record([code.code(), rate.to_string().as_str()])?;
            }
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PersistenceError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| PersistenceError::Format(e.to_string()))
}

fn decode_csv(text: &str) -> Result<Snapshot, PersistenceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut snapshot = Snapshot::new();
    let mut block: Option<(Currency, NaiveDate)> = None;

    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let line = line + 1;

        if is_block_header(&record) {
            let base = Currency::new(&record[2]);
            let date = NaiveDate::parse_from_str(&record[3], DATE_FORMAT).map_err(|_| {
                PersistenceError::Format(format!("record {}: invalid date '{}'", line, &record[3]))
            })?;
            snapshot
                .entry(base.clone())
                .or_default()
                .entry(date)
                .or_default();
            block = Some((base, date));
            continue;
        }

        if record.len() != 2 {
            return Err(PersistenceError::Format(format!(
                "record {}: expected '<CODE>,<RATE>' or a base,date header",
                line
            )));
        }

        let Some((base, date)) = &block else {
            return Err(PersistenceError::Format(format!(
                "record {}: rate precedes any base,date header",
                line
            )));
        };

        let rate = Decimal::from_str(&record[1]).map_err(|_| {
            PersistenceError::Format(format!("record {}: invalid rate '{}'", line, &record[1]))
        })?;

        snapshot
            .entry(base.clone())
            .or_default()
            .entry(*date)
            .or_default()
            .insert(Currency::new(&record[0]), rate);
    }

    Ok(snapshot)
}

fn is_block_header(record: &csv::StringRecord) -> bool {
    record.len() == 4 && &record[0] == HEADER_BASE && &record[1] == HEADER_DATE
}
