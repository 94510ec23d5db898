use std::path::PathBuf;

use chrono::NaiveDate;

/// Structural failures that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot read input file {path}: {source}")]
    InputFile {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(
        "Insufficient data: {accounts} distinct accounts, need at least {clusters} for clustering"
    )]
    InsufficientData { accounts: usize, clusters: usize },

    #[error("Export failed: {0}")]
    Export(String),
}

impl PipelineError {
    pub fn input_file(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        PipelineError::InputFile {
            path: path.into(),
            source,
        }
    }

    /// Whether the error stems from missing/unreadable inputs or bad settings.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration(_) | PipelineError::InputFile { .. }
        )
    }
}

/// Row-level failures. The offending row is excluded and the run continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error("line {line}: {field}: {reason}")]
    Parse {
        line: u64,
        field: &'static str,
        reason: String,
    },

    #[error("line {line}: duplicate sentiment date {date}")]
    DuplicateDate { line: u64, date: NaiveDate },

    #[error("{account_id} on {date}: no sentiment record for date")]
    JoinMismatch { account_id: String, date: NaiveDate },

    #[error("{account_id} on {date}: amounts overflow the decimal range")]
    AmountOverflow { account_id: String, date: NaiveDate },
}

impl RowError {
    pub fn parse(line: u64, field: &'static str, reason: impl Into<String>) -> Self {
        RowError::Parse {
            line,
            field,
            reason: reason.into(),
        }
    }

    /// Short label used as the `reason` tag on drop counters.
    pub fn kind(&self) -> &'static str {
        match self {
            RowError::Parse { .. } => "parse",
            RowError::DuplicateDate { .. } => "duplicate",
            RowError::JoinMismatch { .. } => "join_mismatch",
            RowError::AmountOverflow { .. } => "overflow",
        }
    }
}
