pub mod archetype;
pub mod features;
pub mod sentiment;
pub mod trade;

pub use archetype::{AccountFeatures, Archetype, ArchetypeAssignment};
pub use features::{DailyMarketStats, JoinedFeatureColumns, JoinedFeatureRow};
pub use sentiment::{Classification, Regime, SentimentRecord};
pub use trade::{ExecutionSide, TradeRecord, TradeRejection};
