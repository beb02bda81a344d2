use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// Normalised candlestick interval period.
///
/// Covers the full Binance spot interval set, including the `1s` interval the
/// standard set often omits.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Interval {
    S1,
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H8,
    H12,
    D1,
    D3,
    W1,
    Month1,
}

impl Interval {
    /// Wire string for this interval, as used in REST query parameters,
    /// stream names and storage paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::S1 => "1s",
            Interval::M1 => "1m",
            Interval::M3 => "3m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H2 => "2h",
            Interval::H4 => "4h",
            Interval::H6 => "6h",
            Interval::H8 => "8h",
            Interval::H12 => "12h",
            Interval::D1 => "1d",
            Interval::D3 => "3d",
            Interval::W1 => "1w",
            Interval::Month1 => "1M",
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::M1
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1s" => Ok(Interval::S1),
            "1m" => Ok(Interval::M1),
            "3m" => Ok(Interval::M3),
            "5m" => Ok(Interval::M5),
            "15m" => Ok(Interval::M15),
            "30m" => Ok(Interval::M30),
            "1h" => Ok(Interval::H1),
            "2h" => Ok(Interval::H2),
            "4h" => Ok(Interval::H4),
            "6h" => Ok(Interval::H6),
            "8h" => Ok(Interval::H8),
            "12h" => Ok(Interval::H12),
            "1d" => Ok(Interval::D1),
            "3d" => Ok(Interval::D3),
            "1w" => Ok(Interval::W1),
            "1M" => Ok(Interval::Month1),
            other => Err(format!("unknown interval: {other}")),
        }
    }
}

/// Response detail level for the trading-day ticker endpoint.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub enum TickerType {
    Full,
    Mini,
}

impl TickerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickerType::Full => "FULL",
            TickerType::Mini => "MINI",
        }
    }
}

impl Default for TickerType {
    fn default() -> Self {
        TickerType::Full
    }
}

impl fmt::Display for TickerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalised OHLCV kline record.
///
/// `exchange_time` is the candle open time; `turnover` is the quote-asset
/// volume; `local_time` is stamped when the payload is received.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct KlineRecord {
    pub symbol: SmolStr,
    pub interval: Interval,
    pub exchange_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub turnover: f64,
    pub trade_count: u64,
    pub taker_buy_volume: f64,
    pub taker_buy_turnover: f64,
    pub close_time: DateTime<Utc>,
    pub local_time: DateTime<Utc>,
}

/// Normalised aggregate trade record.
///
/// `turnover` is derived as `price * volume`; the upstream payload does not
/// carry it.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct AggTradeRecord {
    pub agg_trade_id: u64,
    pub price: f64,
    pub volume: f64,
    pub turnover: f64,
    pub first_trade_id: u64,
    pub last_trade_id: u64,
    pub trade_time: DateTime<Utc>,
    pub is_buyer_maker: bool,
    pub is_best_price_match: bool,
    pub local_time: DateTime<Utc>,
}

/// Normalised individual historical trade record.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct TradeRecord {
    pub id: u64,
    pub price: f64,
    pub quantity: f64,
    pub quote_quantity: f64,
    pub time: DateTime<Utc>,
    pub is_buyer_maker: bool,
    pub is_best_match: bool,
    pub local_time: DateTime<Utc>,
}

/// Normalised trading-day ticker snapshot.
///
/// The three change/average fields are only present in `FULL` responses and
/// are zero when the snapshot was requested as `MINI`.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct TradingDayTicker {
    pub symbol: SmolStr,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub weighted_avg_price: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub last_price: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub first_trade_id: i64,
    pub last_trade_id: i64,
    pub trade_count: u64,
    pub local_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_wire_strings() {
        assert_eq!(Interval::S1.as_str(), "1s");
        assert_eq!(Interval::M1.as_str(), "1m");
        assert_eq!(Interval::M3.as_str(), "3m");
        assert_eq!(Interval::M5.as_str(), "5m");
        assert_eq!(Interval::M15.as_str(), "15m");
        assert_eq!(Interval::M30.as_str(), "30m");
        assert_eq!(Interval::H1.as_str(), "1h");
        assert_eq!(Interval::H2.as_str(), "2h");
        assert_eq!(Interval::H4.as_str(), "4h");
        assert_eq!(Interval::H6.as_str(), "6h");
        assert_eq!(Interval::H8.as_str(), "8h");
        assert_eq!(Interval::H12.as_str(), "12h");
        assert_eq!(Interval::D1.as_str(), "1d");
        assert_eq!(Interval::D3.as_str(), "3d");
        assert_eq!(Interval::W1.as_str(), "1w");
        assert_eq!(Interval::Month1.as_str(), "1M");
    }

    #[test]
    fn test_interval_parses_own_wire_string() {
        for interval in [
            Interval::S1,
            Interval::M1,
            Interval::M15,
            Interval::H8,
            Interval::D1,
            Interval::W1,
            Interval::Month1,
        ] {
            assert_eq!(interval.as_str().parse::<Interval>(), Ok(interval));
        }
        assert!("7x".parse::<Interval>().is_err());
    }

    #[test]
    fn test_ticker_type_wire_strings() {
        assert_eq!(TickerType::Full.as_str(), "FULL");
        assert_eq!(TickerType::Mini.as_str(), "MINI");
        assert_eq!(TickerType::default(), TickerType::Full);
    }
}
