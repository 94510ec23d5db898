use std::path::PathBuf;

use tempfile::TempDir;

pub const TRADE_HEADER: &str = concat!(
    "Account,Coin,Execution Price,Size Tokens,Size USD,Side,Timestamp IST,",
    "Start Position,Direction,Closed PnL,Transaction Hash,Order ID,Crossed,Fee,",
    "Trade ID,Timestamp\n",
);

/// Temporary directory holding one sentiment file and one trade file.
#[allow(dead_code)]
pub struct Fixture {
    pub dir: TempDir,
    pub sentiment_path: PathBuf,
    pub trades_path: PathBuf,
}

/// One trade row in the exchange's export layout.
#[allow(dead_code)]
pub fn trade_line(
    account: &str,
    ist: &str,
    closed_pnl: &str,
    fee: &str,
    crossed: bool,
    size_usd: &str,
) -> String {
    format!(
        "{account},BTC,42000,0.01,{size_usd},BUY,{ist},0,Open Long,{closed_pnl},\
         0xhash,1,{crossed},{fee},1,0\n"
    )
}

/// Write fixture files. `sentiment_rows` are `date,value,classification` lines.
#[allow(dead_code)]
pub fn write_fixture(sentiment_rows: &[&str], trade_lines: &[String]) -> Fixture {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let sentiment_path = dir.path().join("fear_greed_index.csv");
    let mut sentiment = String::from("timestamp,value,classification,date\n");
    for row in sentiment_rows {
        let mut parts = row.splitn(3, ',');
        let date = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default();
        let classification = parts.next().unwrap_or_default();
        sentiment.push_str(&format!("0,{value},{classification},{date}\n"));
    }
    std::fs::write(&sentiment_path, sentiment).expect("Failed to write sentiment fixture");

    let trades_path = dir.path().join("historical_data.csv");
    let mut trades = String::from(TRADE_HEADER);
    for line in trade_lines {
        trades.push_str(line);
    }
    std::fs::write(&trades_path, trades).expect("Failed to write trade fixture");

    Fixture {
        dir,
        sentiment_path,
        trades_path,
    }
}

/// Eight accounts in four clearly different behavioral groups, trading on
/// 2024-01-01 and 2024-01-02 (IST midday, so the UTC date is the same).
#[allow(dead_code)]
pub fn segmented_population() -> Vec<String> {
    let mut lines = Vec::new();
    for day in ["01-01-2024", "02-01-2024"] {
        let ts = format!("{day} 12:00");
        // Whales: few huge taker trades.
        for account in ["0xwhale1", "0xwhale2"] {
            lines.push(trade_line(account, &ts, "5000", "25", true, "2500000"));
        }
        // Retail: a couple of small taker trades that lose a little.
        for account in ["0xretail1", "0xretail2"] {
            lines.push(trade_line(account, &ts, "-3", "0.05", true, "80"));
            lines.push(trade_line(account, &ts, "1", "0.05", true, "90"));
        }
        // Makers: resting orders only.
        for account in ["0xmaker1", "0xmaker2"] {
            for _ in 0..8 {
                lines.push(trade_line(account, &ts, "4", "0", false, "2000"));
            }
        }
        // Scalpers: many small trades per day.
        for account in ["0xscalp1", "0xscalp2"] {
            for _ in 0..60 {
                lines.push(trade_line(account, &ts, "0.5", "0.1", true, "150"));
            }
        }
    }
    lines
}
