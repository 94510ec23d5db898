use std::path::Path;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and register all pipeline metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// Prometheus text exposition of everything recorded during the run.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))?;

    // Pre-register counters so they appear even when nothing is dropped.
    counter!("rows_read_total", "source" => "sentiment").absolute(0);
    counter!("rows_read_total", "source" => "trades").absolute(0);
    counter!("join_trades_dropped_total").absolute(0);

    gauge!("accounts_segmented").set(0.0);
    gauge!("kmeans_iterations").set(0.0);

    Ok(handle)
}

/// Write the rendered metrics for a node-exporter style textfile collector.
pub fn write_textfile(handle: &PrometheusHandle, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, handle.render())
        .map_err(|e| anyhow::anyhow!("failed to write metrics to {}: {e}", path.display()))
}
