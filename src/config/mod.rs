use std::env;
use std::path::PathBuf;

use crate::ingestion::timezone::{parse_zone, DEFAULT_TIMESTAMP_FORMAT};
use crate::ingestion::TradeLoadOptions;
use crate::pipeline::PipelineConfig;
use crate::segmentation::{ArchetypeMapping, KMeansConfig};

const DEFAULT_SENTIMENT_PATH: &str = "data/fear_greed_index.csv";
const DEFAULT_TRADES_PATH: &str = "data/historical_data.csv";
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_SOURCE_TIMEZONE: &str = "Asia/Kolkata";

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Inputs / outputs
    pub sentiment_path: PathBuf,
    pub trades_path: PathBuf,
    pub output_dir: PathBuf,
    pub archetype_mapping_path: Option<PathBuf>,
    pub metrics_path: Option<PathBuf>,

    // Trade timestamps
    pub source_timezone: String,
    pub trade_timestamp_format: String,

    // Clustering
    pub cluster_count: usize,
    pub cluster_seed: u64,
    pub cluster_max_iterations: usize,
    pub cluster_tolerance: f64,

    pub max_drop_rate: f64,
    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = KMeansConfig::default();

        Ok(Self {
            sentiment_path: env::var("SENTIMENT_PATH")
                .unwrap_or_else(|_| DEFAULT_SENTIMENT_PATH.into())
                .into(),
            trades_path: env::var("TRADES_PATH")
                .unwrap_or_else(|_| DEFAULT_TRADES_PATH.into())
                .into(),
            output_dir: env::var("OUTPUT_DIR")
                .unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.into())
                .into(),
            archetype_mapping_path: non_empty_var("ARCHETYPE_MAPPING_PATH").map(PathBuf::from),
            metrics_path: non_empty_var("METRICS_PATH").map(PathBuf::from),

            source_timezone: env::var("SOURCE_TIMEZONE")
                .unwrap_or_else(|_| DEFAULT_SOURCE_TIMEZONE.into()),
            trade_timestamp_format: env::var("TRADE_TIMESTAMP_FORMAT")
                .unwrap_or_else(|_| DEFAULT_TIMESTAMP_FORMAT.into()),

            cluster_count: parse_var("CLUSTER_COUNT", defaults.k)?,
            cluster_seed: parse_var("CLUSTER_SEED", defaults.seed)?,
            cluster_max_iterations: parse_var("CLUSTER_MAX_ITERATIONS", defaults.max_iterations)?,
            cluster_tolerance: parse_var("CLUSTER_TOLERANCE", defaults.tolerance)?,

            max_drop_rate: parse_var("MAX_DROP_RATE", 0.25)?,
            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    /// Build the library-level config, reading the archetype mapping if one is configured.
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        if !(0.0..=1.0).contains(&self.max_drop_rate) {
            anyhow::bail!("MAX_DROP_RATE must be between 0 and 1, got {}", self.max_drop_rate);
        }
        if self.cluster_count == 0 {
            anyhow::bail!("CLUSTER_COUNT must be at least 1");
        }
        if self.cluster_max_iterations == 0 {
            anyhow::bail!("CLUSTER_MAX_ITERATIONS must be at least 1");
        }

        let mapping = self
            .archetype_mapping_path
            .as_ref()
            .map(ArchetypeMapping::from_json_file)
            .transpose()?;

        Ok(PipelineConfig {
            trade_options: TradeLoadOptions {
                source_zone: parse_zone(&self.source_timezone)?,
                timestamp_format: self.trade_timestamp_format.clone(),
            },
            kmeans: KMeansConfig {
                k: self.cluster_count,
                seed: self.cluster_seed,
                max_iterations: self.cluster_max_iterations,
                tolerance: self.cluster_tolerance,
            },
            max_drop_rate: self.max_drop_rate,
            mapping,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        AppConfig {
            sentiment_path: DEFAULT_SENTIMENT_PATH.into(),
            trades_path: DEFAULT_TRADES_PATH.into(),
            output_dir: DEFAULT_OUTPUT_DIR.into(),
            archetype_mapping_path: None,
            metrics_path: None,
            source_timezone: DEFAULT_SOURCE_TIMEZONE.into(),
            trade_timestamp_format: DEFAULT_TIMESTAMP_FORMAT.into(),
            cluster_count: 4,
            cluster_seed: 7,
            cluster_max_iterations: 50,
            cluster_tolerance: 1e-6,
            max_drop_rate: 0.1,
            json_logs: false,
        }
    }

    #[test]
    fn test_pipeline_config_from_app_config() {
        let config = base().pipeline_config().unwrap();
        assert_eq!(config.kmeans.seed, 7);
        assert_eq!(config.kmeans.max_iterations, 50);
        assert_eq!(config.trade_options.source_zone, chrono_tz::Asia::Kolkata);
        assert!(config.mapping.is_none());
    }

    #[test]
    fn test_bad_timezone_rejected() {
        let mut cfg = base();
        cfg.source_timezone = "Nowhere/Special".into();
        assert!(cfg.pipeline_config().is_err());
    }

    #[test]
    fn test_bad_drop_rate_rejected() {
        let mut cfg = base();
        cfg.max_drop_rate = 1.5;
        assert!(cfg.pipeline_config().is_err());
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let mut cfg = base();
        cfg.cluster_count = 0;
        let err = cfg.pipeline_config().unwrap_err();
        assert!(err.to_string().contains("CLUSTER_COUNT"));

        let mut cfg = base();
        cfg.cluster_max_iterations = 0;
        assert!(cfg.pipeline_config().is_err());
    }

    #[test]
    fn test_missing_mapping_file_rejected() {
        let mut cfg = base();
        cfg.archetype_mapping_path = Some("/nonexistent/mapping.json".into());
        assert!(cfg.pipeline_config().is_err());
    }
}
