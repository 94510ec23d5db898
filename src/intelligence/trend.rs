use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::models::DailyMarketStats;

/// Ordinary least squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trendline {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub pearson_r: f64,
    pub n: usize,
}

impl Trendline {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line through paired samples.
/// `None` with fewer than two points, mismatched lengths, or constant `x`.
pub fn ols_trendline(xs: &[f64], ys: &[f64]) -> Option<Trendline> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    // Constant y fits perfectly with a flat line.
    let pearson_r = if syy == 0.0 { 0.0 } else { sxy / (sxx * syy).sqrt() };
    let r_squared = if syy == 0.0 { 1.0 } else { pearson_r * pearson_r };

    Some(Trendline {
        slope,
        intercept,
        r_squared,
        pearson_r,
        n: xs.len(),
    })
}

/// Execution urgency against sentiment: taker ratio regressed on index value.
pub fn taker_ratio_vs_sentiment(stats: &[DailyMarketStats]) -> Option<Trendline> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = stats
        .iter()
        .filter_map(|s| Some((f64::from(s.index_value), s.taker_ratio.to_f64()?)))
        .unzip();
    ols_trendline(&xs, &ys)
}
