pub mod config;
pub mod errors;
pub mod export;
pub mod ingestion;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod segmentation;

pub use errors::{PipelineError, RowError};
pub use pipeline::{analyze, run_pipeline, PipelineConfig, PipelineOutput, PipelineWarning};
