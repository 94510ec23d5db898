use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::PipelineError;
use crate::ingestion::LoadReport;
use crate::intelligence::{RegimeSummary, Trendline};
use crate::models::{AccountFeatures, Regime};
use crate::pipeline::{JoinSummary, PipelineOutput, PipelineWarning};
use crate::segmentation::ArchetypeMapping;

pub const JOINED_FILE: &str = "joined_features.csv";
pub const DAILY_FILE: &str = "daily_market_stats.csv";
pub const ARCHETYPES_FILE: &str = "archetypes.csv";
pub const REPORT_FILE: &str = "report.json";

/// Flat row for `archetypes.csv`; CSV cannot hold nested structs.
#[derive(Serialize)]
struct ArchetypeRow<'a> {
    account_id: &'a str,
    cluster: usize,
    archetype: &'static str,
    archetype_name: &'static str,
    mean_daily_net_pnl: f64,
    mean_maker_ratio: f64,
    trades_per_active_day: f64,
    mean_trade_size_usd: f64,
}

/// Run-level metadata without the per-row tables.
#[derive(Serialize)]
struct RunReport<'a> {
    sentiment: &'a LoadReport,
    trades: &'a LoadReport,
    join: &'a JoinSummary,
    regimes: &'a BTreeMap<Regime, RegimeSummary>,
    taker_trend: &'a Option<Trendline>,
    feature_names: [&'static str; AccountFeatures::COUNT],
    centroids: Vec<Vec<f64>>,
    raw_centroids: Vec<Vec<f64>>,
    cluster_sizes: &'a [usize],
    iterations: usize,
    converged: bool,
    inertia: f64,
    mapping_version: &'a Option<String>,
    proposed_mapping: &'a Option<ArchetypeMapping>,
    warnings: &'a [PipelineWarning],
}

/// Write the output tables and a JSON run report into `dir`.
/// Returns the paths written.
pub fn write_outputs(
    output: &PipelineOutput,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, PipelineError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .map_err(|e| PipelineError::Export(format!("cannot create {}: {e}", dir.display())))?;

    let mut written = Vec::with_capacity(4);

    written.push(write_csv(dir.join(JOINED_FILE), &output.joined)?);
    written.push(write_csv(dir.join(DAILY_FILE), &output.daily)?);

    let archetype_rows: Vec<ArchetypeRow<'_>> = output
        .segmentation
        .assignments
        .iter()
        .map(|a| ArchetypeRow {
            account_id: &a.account_id,
            cluster: a.cluster,
            archetype: a.archetype.map(|t| t.as_str()).unwrap_or(""),
            archetype_name: a.archetype.map(|t| t.display_name()).unwrap_or(""),
            mean_daily_net_pnl: a.features.mean_daily_net_pnl,
            mean_maker_ratio: a.features.mean_maker_ratio,
            trades_per_active_day: a.features.trades_per_active_day,
            mean_trade_size_usd: a.features.mean_trade_size_usd,
        })
        .collect();
    written.push(write_csv(dir.join(ARCHETYPES_FILE), &archetype_rows)?);

    let seg = &output.segmentation;
    let report = RunReport {
        sentiment: &output.sentiment_report,
        trades: &output.trade_report,
        join: &output.join,
        regimes: &output.regimes,
        taker_trend: &output.taker_trend,
        feature_names: AccountFeatures::NAMES,
        centroids: seg.centroids.outer_iter().map(|r| r.to_vec()).collect(),
        raw_centroids: seg.raw_centroids.outer_iter().map(|r| r.to_vec()).collect(),
        cluster_sizes: &seg.cluster_sizes,
        iterations: seg.iterations,
        converged: seg.converged,
        inertia: seg.inertia,
        mapping_version: &seg.mapping_version,
        proposed_mapping: &seg.proposed_mapping,
        warnings: &output.warnings,
    };
    let report_path = dir.join(REPORT_FILE);
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| PipelineError::Export(format!("cannot encode report: {e}")))?;
    fs::write(&report_path, json)
        .map_err(|e| {
            PipelineError::Export(format!("cannot write {}: {e}", report_path.display()))
        })?;
    written.push(report_path);

    tracing::info!(dir = %dir.display(), files = written.len(), "Outputs written");
    Ok(written)
}

fn write_csv<T: Serialize>(path: PathBuf, rows: &[T]) -> Result<PathBuf, PipelineError> {
    let export_err = |e: csv::Error| PipelineError::Export(format!("{}: {e}", path.display()));

    let mut wtr = csv::Writer::from_path(&path).map_err(export_err)?;
    for row in rows {
        wtr.serialize(row).map_err(export_err)?;
    }
    wtr.flush()
        .map_err(|e| PipelineError::Export(format!("{}: {e}", path.display())))?;
    Ok(path)
}
