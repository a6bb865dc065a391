//! Dataset Loader: delimited text with a header row -> [`Dataset`].

use crate::record::{Dataset, Record};
use crate::value::FieldValue;
use csv::ReaderBuilder;
use std::path::PathBuf;
use survey_core::{Result, SurveyError};
use survey_telemetry::{dataset_load_span, debug, warn};

/// Where survey responses come from.
pub trait DatasetSource: Send + Sync {
    /// Read and parse the full dataset. Blocking.
    fn load(&self) -> Result<Dataset>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}

/// A CSV file on disk, read in full on every load.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetSource for CsvFileSource {
    fn load(&self) -> Result<Dataset> {
        let _span = dataset_load_span(&self.describe()).entered();
        let bytes = std::fs::read(&self.path)?;
        let text = String::from_utf8(bytes).map_err(|e| {
            SurveyError::Parse(format!("{} is not valid UTF-8: {e}", self.path.display()))
        })?;
        let dataset = parse_csv(&text)?;
        debug!(records = dataset.len(), columns = dataset.headers().len(), "Parsed responses");
        Ok(dataset)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// CSV text held in memory.
#[derive(Debug, Clone)]
pub struct CsvTextSource {
    text: String,
}

impl CsvTextSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl DatasetSource for CsvTextSource {
    fn load(&self) -> Result<Dataset> {
        parse_csv(&self.text)
    }

    fn describe(&self) -> String {
        "<in-memory csv>".to_string()
    }
}

/// Parse CSV text. The first row names the fields; empty lines are skipped; cells are
/// typed with [`FieldValue::infer`]. Short rows omit their missing trailing fields and
/// cells beyond the header are dropped.
pub fn parse_csv(text: &str) -> Result<Dataset> {
    let mut reader =
        ReaderBuilder::new().has_headers(true).flexible(true).from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SurveyError::Parse(format!("failed to read header row: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| SurveyError::Parse(format!("row {index}: {e}")))?;
        if row.len() > headers.len() {
            warn!(row = index, cells = row.len(), columns = headers.len(), "Dropping extra cells");
        }
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header.as_str(), FieldValue::infer(cell)))
            .collect();
        records.push(record);
    }

    Ok(Dataset::new(headers, records))
}
