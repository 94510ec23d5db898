use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::RowError;
use crate::ingestion::SentimentTable;
use crate::models::{ExecutionSide, JoinedFeatureRow, TradeRecord};

const MAX_MISMATCH_SAMPLES: usize = 20;

/// Running totals for one `(account, UTC date)` bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bucket {
    pub net_pnl: Decimal,
    pub maker_count: u32,
    pub taker_count: u32,
    pub volume_usd: Decimal,
    pub win_count: u32,
    pub loss_count: u32,
    /// A PnL or volume sum left the `Decimal` range; totals are unusable.
    pub overflowed: bool,
}

impl Bucket {
    fn add(&mut self, trade: &TradeRecord) {
        let net = trade.net_pnl();
        match trade.side() {
            ExecutionSide::Maker => self.maker_count += 1,
            ExecutionSide::Taker => self.taker_count += 1,
        }
        if net > Decimal::ZERO {
            self.win_count += 1;
        } else if net < Decimal::ZERO {
            self.loss_count += 1;
        }

        match (
            self.net_pnl.checked_add(net),
            self.volume_usd.checked_add(trade.size_usd()),
        ) {
            (Some(pnl), Some(volume)) => {
                self.net_pnl = pnl;
                self.volume_usd = volume;
            }
            _ => self.overflowed = true,
        }
    }

    pub fn trade_count(&self) -> u32 {
        self.maker_count + self.taker_count
    }

    /// `(maker_ratio, taker_ratio)`; the two always sum to exactly one.
    pub fn ratios(&self) -> (Decimal, Decimal) {
        let total = self.trade_count();
        if total == 0 {
            return (Decimal::ZERO, Decimal::ZERO);
        }
        let maker = Decimal::from(self.maker_count) / Decimal::from(total);
        (maker, Decimal::ONE - maker)
    }
}

/// Group trades by `(account_id, UTC date)`, ordered by account then date.
pub fn aggregate_buckets(trades: &[TradeRecord]) -> BTreeMap<(String, NaiveDate), Bucket> {
    let mut buckets: BTreeMap<(String, NaiveDate), Bucket> = BTreeMap::new();
    for trade in trades {
        buckets
            .entry((trade.account_id().to_string(), trade.utc_date()))
            .or_default()
            .add(trade);
    }
    buckets
}

/// Result of joining per-account daily buckets to the sentiment table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinOutcome {
    pub rows: Vec<JoinedFeatureRow>,
    pub joined_buckets: usize,
    pub dropped_buckets: usize,
    pub joined_trades: usize,
    pub dropped_trades: usize,
    /// Buckets excluded because their sums overflowed. Not part of the drop rate.
    pub overflowed_buckets: usize,
    #[serde(skip)]
    pub samples: Vec<RowError>,
}

impl JoinOutcome {
    /// Share of trades that fell on a date without sentiment.
    pub fn drop_rate(&self) -> f64 {
        let total = self.joined_trades + self.dropped_trades;
        if total == 0 {
            return 0.0;
        }
        self.dropped_trades as f64 / total as f64
    }
}

/// Compute per-account daily features and inner-join them to sentiment.
///
/// Buckets whose date has no sentiment record are dropped and counted;
/// they are never joined against a default classification. Buckets whose
/// sums overflow are dropped and counted separately.
pub fn derive_features(trades: &[TradeRecord], sentiment: &SentimentTable) -> JoinOutcome {
    let mut outcome = JoinOutcome::default();

    for ((account_id, date), bucket) in aggregate_buckets(trades) {
        let trade_count = bucket.trade_count() as usize;

        let Some(record) = sentiment.get(&date) else {
            outcome.dropped_buckets += 1;
            outcome.dropped_trades += trade_count;
            let err = RowError::JoinMismatch { account_id, date };
            tracing::debug!(error = %err, "Bucket dropped");
            if outcome.samples.len() < MAX_MISMATCH_SAMPLES {
                outcome.samples.push(err);
            }
            continue;
        };

        if bucket.overflowed {
            outcome.overflowed_buckets += 1;
            let err = RowError::AmountOverflow { account_id, date };
            tracing::warn!(error = %err, "Bucket dropped");
            if outcome.samples.len() < MAX_MISMATCH_SAMPLES {
                outcome.samples.push(err);
            }
            continue;
        }

        let (maker_ratio, taker_ratio) = bucket.ratios();
        outcome.joined_buckets += 1;
        outcome.joined_trades += trade_count;
        outcome.rows.push(JoinedFeatureRow {
            account_id,
            date,
            net_pnl_sum: bucket.net_pnl,
            maker_count: bucket.maker_count,
            taker_count: bucket.taker_count,
            trade_count: bucket.trade_count(),
            maker_ratio,
            taker_ratio,
            volume_usd: bucket.volume_usd,
            win_count: bucket.win_count,
            loss_count: bucket.loss_count,
            index_value: record.index_value,
            classification: record.classification,
        });
    }

    metrics::counter!("join_trades_dropped_total").increment(outcome.dropped_trades as u64);
    if outcome.overflowed_buckets > 0 {
        metrics::counter!("amount_overflow_total", "stage" => "bucket")
            .increment(outcome.overflowed_buckets as u64);
    }

    if outcome.dropped_buckets > 0 {
        tracing::info!(
            dropped_buckets = outcome.dropped_buckets,
            dropped_trades = outcome.dropped_trades,
            "Buckets without sentiment dropped from join"
        );
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, SentimentRecord};
    use chrono::{DateTime, TimeZone, Utc};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn make_trade(
        account: &str,
        ts: DateTime<Utc>,
        side: ExecutionSide,
        gross: i64,
        fee: i64,
    ) -> TradeRecord {
        TradeRecord::new(
            account,
            ts,
            side,
            Decimal::from(gross),
            Decimal::from(fee),
            Decimal::from(100),
        )
        .unwrap()
    }

    fn sentiment(days: &[(NaiveDate, Classification)]) -> SentimentTable {
        days.iter()
            .map(|(date, classification)| SentimentRecord {
                date: *date,
                index_value: 25,
                classification: *classification,
            })
            .collect()
    }

    #[test]
    fn test_maker_taker_example_bucket() {
        let trades = vec![
            make_trade("A1", at(2024, 1, 1, 9), ExecutionSide::Maker, 11, 1),
            make_trade("A1", at(2024, 1, 1, 15), ExecutionSide::Taker, -4, 1),
        ];
        let table = sentiment(&[(day(2024, 1, 1), Classification::Fear)]);

        let outcome = derive_features(&trades, &table);

        assert_eq!(outcome.rows.len(), 1);
        let row = &outcome.rows[0];
        assert_eq!(row.account_id, "A1");
        assert_eq!(row.date, day(2024, 1, 1));
        assert_eq!(row.net_pnl_sum, Decimal::from(5));
        assert_eq!(row.maker_ratio, Decimal::new(5, 1));
        assert_eq!(row.taker_ratio, Decimal::new(5, 1));
        assert_eq!(row.trade_count, 2);
        assert_eq!(row.win_count, 1);
        assert_eq!(row.loss_count, 1);
        assert_eq!(row.classification, Classification::Fear);
    }

    #[test]
    fn test_ratios_sum_to_one() {
        let trades: Vec<TradeRecord> = (0..7)
            .map(|i| {
                let side = if i % 3 == 0 { ExecutionSide::Maker } else { ExecutionSide::Taker };
                make_trade("A2", at(2024, 1, 2, i), side, 1, 0)
            })
            .collect();

        for bucket in aggregate_buckets(&trades).values() {
            let (maker, taker) = bucket.ratios();
            assert_eq!(maker + taker, Decimal::ONE);
        }
    }

    #[test]
    fn test_unmatched_dates_are_dropped() {
        let trades = vec![
            make_trade("A1", at(2024, 1, 1, 9), ExecutionSide::Maker, 5, 0),
            make_trade("A1", at(2024, 1, 2, 9), ExecutionSide::Maker, 5, 0),
            make_trade("A1", at(2024, 1, 2, 10), ExecutionSide::Taker, 5, 0),
        ];
        let table = sentiment(&[(day(2024, 1, 1), Classification::Greed)]);

        let outcome = derive_features(&trades, &table);

        assert_eq!(outcome.rows.len(), 1);
        assert!(outcome.rows.iter().all(|r| table.contains(&r.date)));
        assert_eq!(outcome.dropped_buckets, 1);
        assert_eq!(outcome.dropped_trades, 2);
        assert!((outcome.drop_rate() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(
            outcome.samples,
            vec![RowError::JoinMismatch {
                account_id: "A1".into(),
                date: day(2024, 1, 2)
            }]
        );
    }

    #[test]
    fn test_rows_ordered_by_account_then_date() {
        let trades = vec![
            make_trade("B", at(2024, 1, 2, 1), ExecutionSide::Maker, 1, 0),
            make_trade("A", at(2024, 1, 2, 1), ExecutionSide::Maker, 1, 0),
            make_trade("A", at(2024, 1, 1, 1), ExecutionSide::Maker, 1, 0),
        ];
        let table = sentiment(&[
            (day(2024, 1, 1), Classification::Neutral),
            (day(2024, 1, 2), Classification::Neutral),
        ]);

        let keys: Vec<(String, NaiveDate)> = derive_features(&trades, &table)
            .rows
            .into_iter()
            .map(|r| (r.account_id, r.date))
            .collect();

        assert_eq!(
            keys,
            vec![
                ("A".to_string(), day(2024, 1, 1)),
                ("A".to_string(), day(2024, 1, 2)),
                ("B".to_string(), day(2024, 1, 2)),
            ]
        );
    }

    #[test]
    fn test_overflowing_bucket_is_dropped() {
        // Each trade is representable; their sum is not.
        let huge = Decimal::MIN / Decimal::from(2) - Decimal::from(10);
        let big_loss = |h| {
            let ts = at(2024, 1, 1, h);
            let (fee, size) = (Decimal::ZERO, Decimal::ONE);
            TradeRecord::new("W", ts, ExecutionSide::Taker, huge, fee, size).unwrap()
        };
        let trades = vec![
            big_loss(9),
            big_loss(10),
            make_trade("A", at(2024, 1, 1, 9), ExecutionSide::Maker, 3, 1),
        ];
        let table = sentiment(&[(day(2024, 1, 1), Classification::Fear)]);

        let outcome = derive_features(&trades, &table);

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].account_id, "A");
        assert_eq!(outcome.overflowed_buckets, 1);
        assert_eq!(outcome.dropped_buckets, 0);
        assert_eq!(
            outcome.samples,
            vec![RowError::AmountOverflow {
                account_id: "W".into(),
                date: day(2024, 1, 1)
            }]
        );
    }

    #[test]
    fn test_empty_input() {
        let outcome = derive_features(&[], &SentimentTable::default());
        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.drop_rate(), 0.0);
    }
}
