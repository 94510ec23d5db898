use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{DailyMarketStats, Regime};

/// Headline KPIs over a selection of days.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegimeSummary {
    pub days: usize,
    pub total_net_pnl: Decimal,
    pub avg_win_rate: Decimal,
    pub avg_taker_ratio: Decimal,
}

/// Days whose regime is in `regimes`. An empty selection yields no days.
pub fn filter_by_regime<'a>(
    stats: &'a [DailyMarketStats],
    regimes: &[Regime],
) -> Vec<&'a DailyMarketStats> {
    stats.iter().filter(|s| regimes.contains(&s.regime)).collect()
}

/// Days that would push the PnL total out of the `Decimal` range are skipped.
pub fn summarize<'a, I>(days: I) -> RegimeSummary
where
    I: IntoIterator<Item = &'a DailyMarketStats>,
{
    let mut summary = RegimeSummary::default();
    let mut win_rate_sum = Decimal::ZERO;
    let mut taker_ratio_sum = Decimal::ZERO;

    for day in days {
        let Some(total) = summary.total_net_pnl.checked_add(day.total_net_pnl) else {
            metrics::counter!("amount_overflow_total", "stage" => "regime").increment(1);
            tracing::warn!(date = %day.date, "Day left out of summary: PnL total overflows");
            continue;
        };
        summary.total_net_pnl = total;
        summary.days += 1;
        win_rate_sum += day.win_rate;
        taker_ratio_sum += day.taker_ratio;
    }

    if summary.days > 0 {
        let n = Decimal::from(summary.days as u64);
        summary.avg_win_rate = win_rate_sum / n;
        summary.avg_taker_ratio = taker_ratio_sum / n;
    }

    summary
}

/// One summary per regime, for comparing behavior across sentiment phases.
pub fn compare_regimes(stats: &[DailyMarketStats]) -> BTreeMap<Regime, RegimeSummary> {
    Regime::ALL
        .iter()
        .map(|regime| (*regime, summarize(filter_by_regime(stats, &[*regime]))))
        .collect()
}
