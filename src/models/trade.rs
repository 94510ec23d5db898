use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ExecutionSide
// ---------------------------------------------------------------------------

/// Order-book role of a fill. Taker fills crossed the spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionSide {
    Maker,
    Taker,
}

impl ExecutionSide {
    /// Map the exchange's `Crossed` flag: crossed the book means taker.
    pub fn from_crossed_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(ExecutionSide::Taker),
            "false" | "0" | "no" => Some(ExecutionSide::Maker),
            _ => None,
        }
    }

    pub fn is_taker(&self) -> bool {
        matches!(self, ExecutionSide::Taker)
    }
}

// ---------------------------------------------------------------------------
// TradeRecord
// ---------------------------------------------------------------------------

/// A validated fill. Fields are private so `fee >= 0`, `size_usd >= 0` and
/// a representable net PnL hold for every constructed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    account_id: String,
    timestamp: DateTime<Utc>,
    side: ExecutionSide,
    gross_pnl: Decimal,
    fee: Decimal,
    size_usd: Decimal,
    coin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeRejection {
    EmptyAccount,
    NegativeFee(Decimal),
    NegativeSize(Decimal),
    /// `gross_pnl - fee` does not fit in a `Decimal`.
    PnlOverflow,
}

impl fmt::Display for TradeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeRejection::EmptyAccount => write!(f, "empty account id"),
            TradeRejection::NegativeFee(v) => write!(f, "negative fee {v}"),
            TradeRejection::NegativeSize(v) => write!(f, "negative size {v}"),
            TradeRejection::PnlOverflow => write!(f, "net pnl overflows"),
        }
    }
}

impl TradeRecord {
    pub fn new(
        account_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        side: ExecutionSide,
        gross_pnl: Decimal,
        fee: Decimal,
        size_usd: Decimal,
    ) -> Result<Self, TradeRejection> {
        let account_id = account_id.into();
        if account_id.trim().is_empty() {
            return Err(TradeRejection::EmptyAccount);
        }
        if fee < Decimal::ZERO {
            return Err(TradeRejection::NegativeFee(fee));
        }
        if size_usd < Decimal::ZERO {
            return Err(TradeRejection::NegativeSize(size_usd));
        }
        if gross_pnl.checked_sub(fee).is_none() {
            return Err(TradeRejection::PnlOverflow);
        }

        Ok(Self {
            account_id,
            timestamp,
            side,
            gross_pnl,
            fee,
            size_usd,
            coin: None,
        })
    }

    pub fn with_coin(mut self, coin: impl Into<String>) -> Self {
        let coin = coin.into();
        self.coin = if coin.trim().is_empty() { None } else { Some(coin) };
        self
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn side(&self) -> ExecutionSide {
        self.side
    }

    pub fn fee(&self) -> Decimal {
        self.fee
    }

    pub fn size_usd(&self) -> Decimal {
        self.size_usd
    }

    pub fn coin(&self) -> Option<&str> {
        self.coin.as_deref()
    }

    /// Fee-inclusive PnL, the only profitability figure reported downstream.
    pub fn net_pnl(&self) -> Decimal {
        self.gross_pnl - self.fee
    }

    /// Calendar day of the trade in UTC. Used as the join key.
    pub fn utc_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_net_pnl_subtracts_fee() {
        let trade = TradeRecord::new(
            "A1",
            at(),
            ExecutionSide::Maker,
            Decimal::new(1050, 2),
            Decimal::new(50, 2),
            Decimal::from(100),
        )
        .unwrap();

        assert_eq!(trade.net_pnl(), Decimal::from(10));
        assert_eq!(
            trade.utc_date(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_negative_fee_rejected() {
        let err = TradeRecord::new(
            "A1",
            at(),
            ExecutionSide::Taker,
            Decimal::ZERO,
            Decimal::new(-1, 2),
            Decimal::from(100),
        )
        .unwrap_err();

        assert_eq!(err, TradeRejection::NegativeFee(Decimal::new(-1, 2)));
    }

    #[test]
    fn test_zero_fee_accepted() {
        let trade = TradeRecord::new(
            "A1",
            at(),
            ExecutionSide::Taker,
            Decimal::from(-3),
            Decimal::ZERO,
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(trade.net_pnl(), Decimal::from(-3));
    }

    #[test]
    fn test_empty_account_rejected() {
        let err = TradeRecord::new(
            "  ",
            at(),
            ExecutionSide::Maker,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
        )
        .unwrap_err();
        assert_eq!(err, TradeRejection::EmptyAccount);
    }

    #[test]
    fn test_unrepresentable_net_pnl_rejected() {
        let err = TradeRecord::new(
            "A1",
            at(),
            ExecutionSide::Taker,
            Decimal::MIN,
            Decimal::ONE,
            Decimal::from(10),
        )
        .unwrap_err();
        assert_eq!(err, TradeRejection::PnlOverflow);
    }

    #[test]
    fn test_side_from_crossed() {
        assert_eq!(
            ExecutionSide::from_crossed_str("True"),
            Some(ExecutionSide::Taker)
        );
        assert_eq!(
            ExecutionSide::from_crossed_str("false"),
            Some(ExecutionSide::Maker)
        );
        assert_eq!(ExecutionSide::from_crossed_str("maybe"), None);
    }
}
