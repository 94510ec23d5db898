pub mod sentiment_loader;
pub mod timezone;
pub mod trade_loader;

pub use sentiment_loader::{load_sentiment, load_sentiment_file, SentimentLoad, SentimentTable};
pub use trade_loader::{load_trades, load_trades_file, TradeLoad, TradeLoadOptions};

use serde::Serialize;

use crate::errors::{PipelineError, RowError};

/// How many row errors are kept verbatim for diagnostics.
const MAX_ERROR_SAMPLES: usize = 20;

/// Outcome counts for one input file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub source: &'static str,
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub parse_errors: usize,
    pub duplicates: usize,
    #[serde(skip)]
    pub samples: Vec<RowError>,
}

impl LoadReport {
    pub fn new(source: &'static str) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }

    pub fn record(&mut self, err: RowError) {
        match err {
            RowError::DuplicateDate { .. } => self.duplicates += 1,
            _ => self.parse_errors += 1,
        }
        metrics::counter!("rows_dropped_total", "source" => self.source, "reason" => err.kind())
            .increment(1);
        tracing::debug!(source = self.source, error = %err, "Row dropped");
        if self.samples.len() < MAX_ERROR_SAMPLES {
            self.samples.push(err);
        }
    }

    pub fn rows_dropped(&self) -> usize {
        self.parse_errors + self.duplicates
    }

    /// Fraction of read rows that were dropped, 0 for an empty file.
    pub fn drop_rate(&self) -> f64 {
        if self.rows_read == 0 {
            return 0.0;
        }
        self.rows_dropped() as f64 / self.rows_read as f64
    }
}

/// Make sure every column a loader relies on is present before reading rows.
fn require_headers(
    headers: &csv::StringRecord,
    required: &[&str],
    source: &str,
) -> Result<(), PipelineError> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !headers.iter().any(|h| h.trim() == *name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Configuration(format!(
            "{source} is missing required column(s): {}",
            missing.join(", ")
        )))
    }
}
