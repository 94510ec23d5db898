use std::collections::BTreeMap;

use ndarray::Array2;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{AccountFeatures, JoinedFeatureRow};

#[derive(Default)]
struct AccountTotals {
    active_days: u32,
    net_pnl: Decimal,
    maker_ratio_sum: Decimal,
    trades: u32,
    volume_usd: Decimal,
    overflowed: bool,
}

/// Collapse each account's daily rows into one feature vector.
///
/// Features, in column order:
/// 1. mean daily net PnL (sum of daily `net_pnl_sum` / active days)
/// 2. mean daily maker ratio
/// 3. trades per active day
/// 4. mean trade size in USD (total volume / total trades)
///
/// Accounts are returned sorted by id. An account whose PnL or volume sum
/// overflows is left out.
pub fn account_features(rows: &[JoinedFeatureRow]) -> BTreeMap<String, AccountFeatures> {
    let mut totals: BTreeMap<&str, AccountTotals> = BTreeMap::new();

    for row in rows {
        let t = totals.entry(row.account_id.as_str()).or_default();
        t.active_days += 1;
        t.maker_ratio_sum += row.maker_ratio;
        t.trades += row.trade_count;
        match (
            t.net_pnl.checked_add(row.net_pnl_sum),
            t.volume_usd.checked_add(row.volume_usd),
        ) {
            (Some(pnl), Some(volume)) => {
                t.net_pnl = pnl;
                t.volume_usd = volume;
            }
            _ => t.overflowed = true,
        }
    }

    let overflowed: Vec<&str> = totals
        .iter()
        .filter(|(_, t)| t.overflowed)
        .map(|(account, _)| *account)
        .collect();
    if !overflowed.is_empty() {
        metrics::counter!("amount_overflow_total", "stage" => "account")
            .increment(overflowed.len() as u64);
        tracing::warn!(
            accounts = ?overflowed,
            "Accounts with overflowing totals left out of clustering"
        );
    }

    totals
        .into_iter()
        .filter(|(_, t)| !t.overflowed)
        .map(|(account, t)| {
            let days = Decimal::from(t.active_days.max(1));
            let trades = Decimal::from(t.trades.max(1));

            let features = AccountFeatures {
                mean_daily_net_pnl: to_f64(t.net_pnl / days),
                mean_maker_ratio: to_f64(t.maker_ratio_sum / days),
                trades_per_active_day: f64::from(t.trades) / f64::from(t.active_days.max(1)),
                mean_trade_size_usd: to_f64(t.volume_usd / trades),
            };
            (account.to_string(), features)
        })
        .collect()
}

/// Stack feature vectors into an `(accounts x features)` matrix, row order
/// following the iterator.
pub fn feature_matrix<'a, I>(features: I) -> Array2<f64>
where
    I: IntoIterator<Item = &'a AccountFeatures>,
{
    let flat: Vec<f64> = features.into_iter().flat_map(|f| f.to_array()).collect();
    let rows = flat.len() / AccountFeatures::COUNT;
    Array2::from_shape_vec((rows, AccountFeatures::COUNT), flat)
        .unwrap_or_else(|_| Array2::zeros((0, AccountFeatures::COUNT)))
}

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}
