use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::ingestion::SentimentTable;
use crate::models::{DailyMarketStats, TradeRecord};

#[derive(Default)]
struct DayTotals<'a> {
    net_pnl: Decimal,
    size_usd: Decimal,
    trades: u32,
    accounts: BTreeSet<&'a str>,
    wins: u32,
    losses: u32,
    takers: u32,
    overflowed: bool,
}

/// Market-wide statistics per UTC day, inner-joined to sentiment and
/// sorted by date.
///
/// Win rate counts only decisive trades: `wins / (wins + losses)`, with a
/// day of only break-even trades reporting zero. A day whose PnL or volume
/// sum overflows is left out.
pub fn daily_market_stats(
    trades: &[TradeRecord],
    sentiment: &SentimentTable,
) -> Vec<DailyMarketStats> {
    let mut days: BTreeMap<NaiveDate, DayTotals<'_>> = BTreeMap::new();

    for trade in trades {
        let totals = days.entry(trade.utc_date()).or_default();
        let net = trade.net_pnl();
        match (
            totals.net_pnl.checked_add(net),
            totals.size_usd.checked_add(trade.size_usd()),
        ) {
            (Some(pnl), Some(size)) => {
                totals.net_pnl = pnl;
                totals.size_usd = size;
            }
            _ => totals.overflowed = true,
        }
        totals.trades += 1;
        totals.accounts.insert(trade.account_id());
        if net > Decimal::ZERO {
            totals.wins += 1;
        } else if net < Decimal::ZERO {
            totals.losses += 1;
        }
        if trade.side().is_taker() {
            totals.takers += 1;
        }
    }

    let overflowed: Vec<NaiveDate> = days
        .iter()
        .filter(|(_, t)| t.overflowed)
        .map(|(date, _)| *date)
        .collect();
    if !overflowed.is_empty() {
        metrics::counter!("amount_overflow_total", "stage" => "day")
            .increment(overflowed.len() as u64);
        tracing::warn!(
            days = ?overflowed,
            "Days with overflowing totals left out of market stats"
        );
    }

    days.into_iter()
        .filter(|(_, t)| !t.overflowed)
        .filter_map(|(date, t)| {
            let record = sentiment.get(&date)?;
            let trades = Decimal::from(t.trades.max(1));
            let decisive = Decimal::from((t.wins + t.losses).max(1));

            Some(DailyMarketStats {
                date,
                total_net_pnl: t.net_pnl,
                avg_trade_size: t.size_usd / trades,
                total_trades: t.trades,
                unique_accounts: t.accounts.len() as u32,
                winning_trades: t.wins,
                losing_trades: t.losses,
                taker_trades: t.takers,
                win_rate: Decimal::from(t.wins) / decisive,
                taker_ratio: Decimal::from(t.takers) / trades,
                index_value: record.index_value,
                classification: record.classification,
                regime: record.regime(),
            })
        })
        .collect()
}
