use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::sentiment::{Classification, Regime};

/// One `(account_id, UTC date)` bucket joined to that day's sentiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedFeatureRow {
    pub account_id: String,
    pub date: NaiveDate,
    pub net_pnl_sum: Decimal,
    pub maker_count: u32,
    pub taker_count: u32,
    pub trade_count: u32,
    pub maker_ratio: Decimal,
    pub taker_ratio: Decimal,
    pub volume_usd: Decimal,
    pub win_count: u32,
    pub loss_count: u32,
    pub index_value: u8,
    pub classification: Classification,
}

/// Column-oriented view of the joined table for tabular consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinedFeatureColumns {
    pub account_id: Vec<String>,
    pub date: Vec<NaiveDate>,
    pub net_pnl_sum: Vec<Decimal>,
    pub maker_ratio: Vec<Decimal>,
    pub taker_ratio: Vec<Decimal>,
    pub trade_count: Vec<u32>,
    pub volume_usd: Vec<Decimal>,
    pub index_value: Vec<u8>,
    pub classification: Vec<Classification>,
}

impl JoinedFeatureColumns {
    pub fn len(&self) -> usize {
        self.account_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.account_id.is_empty()
    }
}

impl From<&[JoinedFeatureRow]> for JoinedFeatureColumns {
    fn from(rows: &[JoinedFeatureRow]) -> Self {
        let mut cols = JoinedFeatureColumns::default();
        for row in rows {
            cols.account_id.push(row.account_id.clone());
            cols.date.push(row.date);
            cols.net_pnl_sum.push(row.net_pnl_sum);
            cols.maker_ratio.push(row.maker_ratio);
            cols.taker_ratio.push(row.taker_ratio);
            cols.trade_count.push(row.trade_count);
            cols.volume_usd.push(row.volume_usd);
            cols.index_value.push(row.index_value);
            cols.classification.push(row.classification);
        }
        cols
    }
}

/// Market-wide aggregate for one UTC day, joined to sentiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMarketStats {
    pub date: NaiveDate,
    pub total_net_pnl: Decimal,
    pub avg_trade_size: Decimal,
    pub total_trades: u32,
    pub unique_accounts: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub taker_trades: u32,
    pub win_rate: Decimal,
    pub taker_ratio: Decimal,
    pub index_value: u8,
    pub classification: Classification,
    pub regime: Regime,
}
