use std::io;
use std::path::Path;
use std::str::FromStr;

use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::timezone::{source_to_utc, DEFAULT_SOURCE_ZONE, DEFAULT_TIMESTAMP_FORMAT};
use super::{require_headers, LoadReport};
use crate::errors::{PipelineError, RowError};
use crate::models::{ExecutionSide, TradeRecord};

const REQUIRED_COLUMNS: [&str; 6] = [
    "Account",
    "Timestamp IST",
    "Closed PnL",
    "Fee",
    "Crossed",
    "Size USD",
];

/// Subset of the exchange's trade-history export this crate reads.
#[derive(Debug, Deserialize)]
struct RawTradeRow {
    #[serde(rename = "Account")]
    account: String,
    #[serde(rename = "Timestamp IST")]
    timestamp: String,
    #[serde(rename = "Closed PnL")]
    closed_pnl: String,
    #[serde(rename = "Fee")]
    fee: String,
    #[serde(rename = "Crossed")]
    crossed: String,
    #[serde(rename = "Size USD")]
    size_usd: String,
    #[serde(rename = "Coin", default)]
    coin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TradeLoadOptions {
    pub source_zone: Tz,
    pub timestamp_format: String,
}

impl Default for TradeLoadOptions {
    fn default() -> Self {
        Self {
            source_zone: DEFAULT_SOURCE_ZONE,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct TradeLoad {
    pub trades: Vec<TradeRecord>,
    pub report: LoadReport,
}

pub fn load_trades_file(
    path: impl AsRef<Path>,
    opts: &TradeLoadOptions,
) -> Result<TradeLoad, PipelineError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        PipelineError::Configuration(format!("cannot open trade file {}: {e}", path.display()))
    })?;

    tracing::info!(
        path = %path.display(),
        zone = %opts.source_zone,
        "Loading trade history"
    );
    load_trades(file, opts).map_err(|e| match e {
        PipelineError::InputFile { source, .. } => PipelineError::input_file(path, source),
        other => other,
    })
}

/// Parse the trade export, converting every timestamp to UTC.
///
/// Rows that fail to parse (bad timestamp, bad number, negative fee or size,
/// unknown `Crossed` flag, empty account) are excluded and counted. They are
/// never defaulted.
pub fn load_trades<R: io::Read>(
    reader: R,
    opts: &TradeLoadOptions,
) -> Result<TradeLoad, PipelineError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::input_file("<trades>", e))?
        .clone();
    require_headers(&headers, &REQUIRED_COLUMNS, "trade file")?;

    let mut trades = Vec::new();
    let mut report = LoadReport::new("trades");

    for (idx, result) in rdr.records().enumerate() {
        report.rows_read += 1;
        let fallback_line = idx as u64 + 2;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(fallback_line);
                report.record(RowError::parse(line, "row", e.to_string()));
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);

        let parsed = record
            .deserialize::<RawTradeRow>(Some(&headers))
            .map_err(|e| RowError::parse(line, "row", e.to_string()))
            .and_then(|raw| parse_row(raw, line, opts));

        match parsed {
            Ok(trade) => {
                report.rows_loaded += 1;
                trades.push(trade);
            }
            Err(err) => report.record(err),
        }
    }

    metrics::counter!("rows_read_total", "source" => "trades").increment(report.rows_read as u64);

    if report.parse_errors > 0 {
        tracing::warn!(
            malformed = report.parse_errors,
            rows_read = report.rows_read,
            "Malformed trade rows dropped"
        );
    }
    tracing::info!(trades = trades.len(), "Trade history loaded");

    Ok(TradeLoad { trades, report })
}

fn parse_row(
    raw: RawTradeRow,
    line: u64,
    opts: &TradeLoadOptions,
) -> Result<TradeRecord, RowError> {
    let timestamp = source_to_utc(&raw.timestamp, &opts.timestamp_format, opts.source_zone)
        .map_err(|reason| RowError::parse(line, "Timestamp IST", reason))?;

    let gross_pnl =
        parse_decimal(&raw.closed_pnl).map_err(|r| RowError::parse(line, "Closed PnL", r))?;
    let fee = parse_decimal(&raw.fee).map_err(|r| RowError::parse(line, "Fee", r))?;
    let size_usd = parse_decimal(&raw.size_usd).map_err(|r| RowError::parse(line, "Size USD", r))?;

    let side = ExecutionSide::from_crossed_str(&raw.crossed)
        .ok_or_else(|| {
            RowError::parse(
                line,
                "Crossed",
                format!("{:?} is not a boolean", raw.crossed),
            )
        })?;

    let trade = TradeRecord::new(raw.account, timestamp, side, gross_pnl, fee, size_usd)
        .map_err(|rejection| RowError::parse(line, "row", rejection.to_string()))?;

    Ok(match raw.coin {
        Some(coin) => trade.with_coin(coin),
        None => trade,
    })
}

/// Plain or scientific notation (`1.2e-05` shows up in fee columns).
fn parse_decimal(s: &str) -> Result<Decimal, String> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|e| format!("{s:?} is not a number: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str =
        "Account,Coin,Execution Price,Size USD,Side,Timestamp IST,Closed PnL,Fee,Crossed\n";

    fn load(body: &str) -> TradeLoad {
        let csv = format!("{HEADER}{body}");
        load_trades(csv.as_bytes(), &TradeLoadOptions::default()).expect("load should succeed")
    }

    #[test]
    fn test_load_converts_to_utc() {
        let loaded = load("0xabc,BTC,42000,1000,BUY,02-01-2024 02:00,12.5,0.5,true\n");

        assert_eq!(loaded.trades.len(), 1);
        let trade = &loaded.trades[0];
        assert_eq!(trade.account_id(), "0xabc");
        assert_eq!(trade.side(), ExecutionSide::Taker);
        assert_eq!(trade.net_pnl(), Decimal::from(12));
        assert_eq!(trade.coin(), Some("BTC"));
        // 02:00 IST on Jan 2 belongs to Jan 1 in UTC.
        assert_eq!(
            trade.utc_date(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_bad_rows_are_excluded_not_defaulted() {
        let loaded = load(
            "0xabc,BTC,1,100,BUY,not-a-time,1,0.1,false\n\
             0xabc,BTC,1,100,BUY,01-01-2024 10:00,abc,0.1,false\n\
             0xabc,BTC,1,100,BUY,01-01-2024 10:00,1,-0.1,false\n\
             0xabc,BTC,1,100,BUY,01-01-2024 10:00,1,0.1,sometimes\n\
             ,BTC,1,100,BUY,01-01-2024 10:00,1,0.1,false\n\
             0xdef,ETH,1,100,SELL,01-01-2024 10:00,1,0.1,false\n",
        );

        assert_eq!(loaded.trades.len(), 1);
        assert_eq!(loaded.trades[0].account_id(), "0xdef");
        assert_eq!(loaded.report.parse_errors, 5);
        assert_eq!(loaded.report.rows_read, 6);
        assert!(matches!(
            &loaded.report.samples[0],
            RowError::Parse { field: "Timestamp IST", line: 2, .. }
        ));
    }

    #[test]
    fn test_unrepresentable_net_pnl_is_dropped() {
        let loaded = load(
            "A,BTC,1,10,BUY,01-01-2024 12:00,-79228162514264337593543950335,1,true\n\
             B,BTC,1,10,BUY,01-01-2024 12:00,2,1,true\n",
        );

        assert_eq!(loaded.trades.len(), 1);
        assert_eq!(loaded.trades[0].account_id(), "B");
        assert_eq!(loaded.report.parse_errors, 1);
        assert!(matches!(
            &loaded.report.samples[0],
            RowError::Parse { line: 2, reason, .. } if reason.contains("overflow")
        ));
    }

    #[test]
    fn test_scientific_fee() {
        let loaded = load("0xabc,BTC,1,100,BUY,01-01-2024 10:00,0,1.5e-03,false\n");
        assert_eq!(loaded.trades[0].fee(), Decimal::new(15, 4));
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "Account,Timestamp IST,Closed PnL,Fee\n0xabc,01-01-2024 10:00,1,0\n";
        let err = load_trades(csv.as_bytes(), &TradeLoadOptions::default()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Crossed"));
    }
}
