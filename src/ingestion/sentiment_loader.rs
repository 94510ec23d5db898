use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use super::{require_headers, LoadReport};
use crate::errors::{PipelineError, RowError};
use crate::models::{Classification, SentimentRecord};

const REQUIRED_COLUMNS: [&str; 3] = ["date", "value", "classification"];

#[derive(Debug, Deserialize)]
struct RawSentimentRow {
    date: String,
    value: String,
    classification: String,
}

/// Daily sentiment keyed by calendar date.
#[derive(Debug, Clone, Default)]
pub struct SentimentTable {
    records: BTreeMap<NaiveDate, SentimentRecord>,
}

impl SentimentTable {
    pub fn get(&self, date: &NaiveDate) -> Option<&SentimentRecord> {
        self.records.get(date)
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.records.contains_key(date)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert keeping the first record seen for a date. Returns false on a duplicate.
    fn insert_first(&mut self, record: SentimentRecord) -> bool {
        use std::collections::btree_map::Entry;

        match self.records.entry(record.date) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            Entry::Occupied(_) => false,
        }
    }
}

impl FromIterator<SentimentRecord> for SentimentTable {
    fn from_iter<I: IntoIterator<Item = SentimentRecord>>(iter: I) -> Self {
        let mut table = SentimentTable::default();
        for record in iter {
            table.insert_first(record);
        }
        table
    }
}

#[derive(Debug)]
pub struct SentimentLoad {
    pub table: SentimentTable,
    pub report: LoadReport,
}

pub fn load_sentiment_file(path: impl AsRef<Path>) -> Result<SentimentLoad, PipelineError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        PipelineError::Configuration(format!("cannot open sentiment file {}: {e}", path.display()))
    })?;

    tracing::info!(path = %path.display(), "Loading sentiment history");
    load_sentiment(file).map_err(|e| match e {
        PipelineError::InputFile { source, .. } => PipelineError::input_file(path, source),
        other => other,
    })
}

/// Parse a Fear/Greed CSV.
///
/// Rows with a malformed date, an index value outside 0..=100, or an unknown
/// classification are dropped and counted. When a date repeats, the first
/// row wins and every later one is dropped as a duplicate.
pub fn load_sentiment<R: io::Read>(reader: R) -> Result<SentimentLoad, PipelineError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::input_file("<sentiment>", e))?
        .clone();
    require_headers(&headers, &REQUIRED_COLUMNS, "sentiment file")?;

    let mut table = SentimentTable::default();
    let mut report = LoadReport::new("sentiment");

    for (idx, result) in rdr.records().enumerate() {
        report.rows_read += 1;
        // Header is line 1.
        let fallback_line = idx as u64 + 2;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(fallback_line);
                report.record(RowError::parse(line, "row", e.to_string()));
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);

        let parsed = record
            .deserialize::<RawSentimentRow>(Some(&headers))
            .map_err(|e| RowError::parse(line, "row", e.to_string()))
            .and_then(|raw| parse_row(&raw, line));

        match parsed {
            Ok(sentiment) => {
                let date = sentiment.date;
                if table.insert_first(sentiment) {
                    report.rows_loaded += 1;
                } else {
                    report.record(RowError::DuplicateDate { line, date });
                }
            }
            Err(err) => report.record(err),
        }
    }

    metrics::counter!("rows_read_total", "source" => "sentiment")
        .increment(report.rows_read as u64);

    if report.duplicates > 0 {
        tracing::warn!(
            duplicates = report.duplicates,
            "Duplicate sentiment dates dropped (first occurrence kept)"
        );
    }
    if report.parse_errors > 0 {
        tracing::warn!(malformed = report.parse_errors, "Malformed sentiment rows dropped");
    }
    tracing::info!(
        days = table.len(),
        rows_read = report.rows_read,
        "Sentiment history loaded"
    );

    Ok(SentimentLoad { table, report })
}

fn parse_row(raw: &RawSentimentRow, line: u64) -> Result<SentimentRecord, RowError> {
    let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d")
        .map_err(|e| RowError::parse(line, "date", format!("{:?}: {e}", raw.date)))?;

    let index_value: u8 = raw
        .value
        .parse()
        .map_err(|_| {
            RowError::parse(
                line,
                "value",
                format!("{:?} is not an integer 0-100", raw.value),
            )
        })?;
    if index_value > 100 {
        return Err(RowError::parse(line, "value", format!("{index_value} is above 100")));
    }

    let classification = Classification::from_label(&raw.classification).ok_or_else(|| {
        RowError::parse(
            line,
            "classification",
            format!("unknown label {:?}", raw.classification),
        )
    })?;

    Ok(SentimentRecord {
        date,
        index_value,
        classification,
    })
}
