pub mod daily;
pub mod deriver;
pub mod regime;
pub mod trend;

pub use daily::daily_market_stats;
pub use deriver::{aggregate_buckets, derive_features, Bucket, JoinOutcome};
pub use regime::{compare_regimes, filter_by_regime, summarize, RegimeSummary};
pub use trend::{ols_trendline, taker_ratio_vs_sentiment, Trendline};
