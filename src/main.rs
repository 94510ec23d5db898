use trader_sentiment::config::AppConfig;
use trader_sentiment::models::Regime;
use trader_sentiment::metrics as run_metrics;
use trader_sentiment::{export, run_pipeline, PipelineWarning};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing(config.json_logs);

    let metrics_handle = match &config.metrics_path {
        Some(_) => Some(run_metrics::init_metrics()?),
        None => None,
    };

    let pipeline_config = config.pipeline_config()?;
    if pipeline_config.mapping.is_none() {
        tracing::info!(
            "No ARCHETYPE_MAPPING_PATH set; clusters will be reported without archetype names"
        );
    }

    tracing::info!(
        sentiment = %config.sentiment_path.display(),
        trades = %config.trades_path.display(),
        clusters = pipeline_config.kmeans.k,
        seed = pipeline_config.kmeans.seed,
        "Starting analysis"
    );

    let output = run_pipeline(
        &config.sentiment_path,
        &config.trades_path,
        &pipeline_config,
    )?;

    for warning in &output.warnings {
        match warning {
            PipelineWarning::HighParseFailureRate { source, rate, .. } => {
                tracing::warn!(source, rate, "Many input rows could not be parsed");
            }
            PipelineWarning::HighJoinDropRate { rate, .. } => {
                tracing::warn!(rate, "Many trades fell on days without sentiment data");
            }
            PipelineWarning::DuplicateSentimentDates { count } => {
                tracing::warn!(count, "Sentiment file repeats dates");
            }
            PipelineWarning::OverflowedBuckets { count } => {
                tracing::warn!(count, "Account days dropped: PnL or volume totals overflow");
            }
        }
    }

    for regime in Regime::ALL {
        let summary = &output.regimes[&regime];
        tracing::info!(
            regime = %regime,
            days = summary.days,
            total_net_pnl = %summary.total_net_pnl,
            avg_win_rate = %summary.avg_win_rate.round_dp(4),
            avg_taker_ratio = %summary.avg_taker_ratio.round_dp(4),
            "Regime summary"
        );
    }
    if let Some(trend) = &output.taker_trend {
        tracing::info!(
            slope = trend.slope,
            r_squared = trend.r_squared,
            days = trend.n,
            "Taker ratio vs sentiment index"
        );
    }

    export::write_outputs(&output, &config.output_dir)?;

    if let (Some(handle), Some(path)) = (&metrics_handle, &config.metrics_path) {
        run_metrics::write_textfile(handle, path)?;
    }

    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
