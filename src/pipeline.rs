use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use metrics::histogram;
use serde::Serialize;

use crate::errors::PipelineError;
use crate::ingestion::{self, LoadReport, SentimentLoad, TradeLoad, TradeLoadOptions};
use crate::intelligence::{self, JoinOutcome, RegimeSummary, Trendline};
use crate::models::{DailyMarketStats, JoinedFeatureColumns, JoinedFeatureRow, Regime};
use crate::segmentation::{self, ArchetypeMapping, KMeansConfig, SegmentationResult};

/// Tunables for one batch run. Input locations are passed separately.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub trade_options: TradeLoadOptions,
    pub kmeans: KMeansConfig,
    /// Drop rate (0..=1) above which a run reports a warning.
    pub max_drop_rate: f64,
    pub mapping: Option<ArchetypeMapping>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            trade_options: TradeLoadOptions::default(),
            kmeans: KMeansConfig::default(),
            max_drop_rate: 0.25,
            mapping: None,
        }
    }
}

/// Conditions a caller must see even though the run succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    HighParseFailureRate {
        source: &'static str,
        dropped: usize,
        rows_read: usize,
        rate: f64,
    },
    HighJoinDropRate {
        dropped_trades: usize,
        dropped_buckets: usize,
        rate: f64,
    },
    DuplicateSentimentDates {
        count: usize,
    },
    OverflowedBuckets {
        count: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinSummary {
    pub joined_buckets: usize,
    pub dropped_buckets: usize,
    pub joined_trades: usize,
    pub dropped_trades: usize,
    pub overflowed_buckets: usize,
    pub drop_rate: f64,
}

impl From<&JoinOutcome> for JoinSummary {
    fn from(j: &JoinOutcome) -> Self {
        Self {
            joined_buckets: j.joined_buckets,
            dropped_buckets: j.dropped_buckets,
            joined_trades: j.joined_trades,
            dropped_trades: j.dropped_trades,
            overflowed_buckets: j.overflowed_buckets,
            drop_rate: j.drop_rate(),
        }
    }
}

/// Everything one run produces. Built fresh on every call.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub joined: Vec<JoinedFeatureRow>,
    pub daily: Vec<DailyMarketStats>,
    pub regimes: BTreeMap<Regime, RegimeSummary>,
    pub taker_trend: Option<Trendline>,
    pub segmentation: SegmentationResult,
    pub sentiment_report: LoadReport,
    pub trade_report: LoadReport,
    pub join: JoinSummary,
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineOutput {
    pub fn joined_columns(&self) -> JoinedFeatureColumns {
        JoinedFeatureColumns::from(self.joined.as_slice())
    }

    /// KPIs over the days whose regime is selected.
    pub fn summary_for(&self, regimes: &[Regime]) -> RegimeSummary {
        intelligence::summarize(intelligence::filter_by_regime(&self.daily, regimes))
    }
}

/// Read both input files and run the whole analysis.
pub fn run_pipeline(
    sentiment_path: impl AsRef<Path>,
    trades_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    let sentiment = ingestion::load_sentiment_file(sentiment_path)?;
    let trades = ingestion::load_trades_file(trades_path, &config.trade_options)?;
    analyze(sentiment, trades, config)
}

/// Run every stage after loading. Each stage only sees the previous stage's output.
pub fn analyze(
    sentiment: SentimentLoad,
    trades: TradeLoad,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    if sentiment.report.duplicates > 0 {
        warnings.push(PipelineWarning::DuplicateSentimentDates {
            count: sentiment.report.duplicates,
        });
    }
    for report in [&sentiment.report, &trades.report] {
        if report.drop_rate() > config.max_drop_rate {
            tracing::warn!(
                source = report.source,
                dropped = report.rows_dropped(),
                rows_read = report.rows_read,
                "Parse failure rate above threshold"
            );
            warnings.push(PipelineWarning::HighParseFailureRate {
                source: report.source,
                dropped: report.rows_dropped(),
                rows_read: report.rows_read,
                rate: report.drop_rate(),
            });
        }
    }

    let join = intelligence::derive_features(&trades.trades, &sentiment.table);
    if join.drop_rate() > config.max_drop_rate {
        tracing::warn!(
            dropped_trades = join.dropped_trades,
            rate = join.drop_rate(),
            "Join drop rate above threshold; check sentiment coverage"
        );
        warnings.push(PipelineWarning::HighJoinDropRate {
            dropped_trades: join.dropped_trades,
            dropped_buckets: join.dropped_buckets,
            rate: join.drop_rate(),
        });
    }

    if join.overflowed_buckets > 0 {
        warnings.push(PipelineWarning::OverflowedBuckets {
            count: join.overflowed_buckets,
        });
    }

    let daily = intelligence::daily_market_stats(&trades.trades, &sentiment.table);
    let regimes = intelligence::compare_regimes(&daily);
    let taker_trend = intelligence::taker_ratio_vs_sentiment(&daily);

    let segmentation =
        segmentation::segment_accounts(&join.rows, &config.kmeans, config.mapping.as_ref())?;

    histogram!("pipeline_duration_seconds").record(start.elapsed().as_secs_f64());
    tracing::info!(
        joined_rows = join.rows.len(),
        days = daily.len(),
        accounts = segmentation.assignments.len(),
        warnings = warnings.len(),
        "Pipeline finished"
    );

    Ok(PipelineOutput {
        join: JoinSummary::from(&join),
        joined: join.rows,
        daily,
        regimes,
        taker_trend,
        segmentation,
        sentiment_report: sentiment.report,
        trade_report: trades.report,
        warnings,
    })
}
