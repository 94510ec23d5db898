use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable trader archetype attached to a cluster by an explicit mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    /// Large notional per trade, mostly taking liquidity.
    AggressiveWhale,
    /// Small, infrequent traders.
    Retail,
    /// Mostly resting orders.
    PassiveMaker,
    /// Many trades per active day.
    HighFrequencyScalper,
}

impl Archetype {
    pub const ALL: [Archetype; 4] = [
        Archetype::AggressiveWhale,
        Archetype::Retail,
        Archetype::PassiveMaker,
        Archetype::HighFrequencyScalper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::AggressiveWhale => "aggressive_whale",
            Archetype::Retail => "retail",
            Archetype::PassiveMaker => "passive_maker",
            Archetype::HighFrequencyScalper => "high_frequency_scalper",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Archetype::AggressiveWhale => "Aggressive Whales",
            Archetype::Retail => "Retail",
            Archetype::PassiveMaker => "Passive Makers",
            Archetype::HighFrequencyScalper => "High-Frequency Scalpers",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-account summary features, in clustering column order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountFeatures {
    pub mean_daily_net_pnl: f64,
    pub mean_maker_ratio: f64,
    pub trades_per_active_day: f64,
    pub mean_trade_size_usd: f64,
}

impl AccountFeatures {
    pub const COUNT: usize = 4;
    pub const NAMES: [&'static str; 4] = [
        "mean_daily_net_pnl",
        "mean_maker_ratio",
        "trades_per_active_day",
        "mean_trade_size_usd",
    ];

    pub fn to_array(&self) -> [f64; 4] {
        [
            self.mean_daily_net_pnl,
            self.mean_maker_ratio,
            self.trades_per_active_day,
            self.mean_trade_size_usd,
        ]
    }

    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [pnl, maker, freq, size] => Some(Self {
                mean_daily_net_pnl: *pnl,
                mean_maker_ratio: *maker,
                trades_per_active_day: *freq,
                mean_trade_size_usd: *size,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchetypeAssignment {
    pub account_id: String,
    pub cluster: usize,
    /// `None` until a mapping for this run's clusters is supplied.
    pub archetype: Option<Archetype>,
    pub features: AccountFeatures,
    /// Standardized vector the clustering actually ran on.
    pub feature_vector: Vec<f64>,
}
