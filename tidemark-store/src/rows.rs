use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tidemark_data::{AggTradeRecord, KlineRecord, TradeRecord, TradingDayTicker};

/// Exchange stamped into every stored row.
pub const EXCHANGE: &str = "BINANCE";

/// One stored kline, flattened for CSV and ClickHouse.
///
/// Column order is the serialisation order of the fields below. Timestamps are
/// stored as epoch milliseconds. The close time is not stored since it is
/// derivable from the open time and the interval.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KlineRow {
    pub exchange_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub turnover: f64,
    pub trade_count: u64,
    pub taker_buy_volume: f64,
    pub taker_buy_turnover: f64,
    pub local_time: i64,
    pub symbol: SmolStr,
    pub exchange: SmolStr,
    pub interval: SmolStr,
    /// Always zero for spot. The column keeps the schema shared with futures
    /// tables, where open interest is populated.
    pub open_interest: u64,
    pub trading_day: NaiveDate,
}

impl KlineRow {
    pub fn from_record(record: &KlineRecord, trading_day: NaiveDate) -> Self {
        Self {
            exchange_time: record.exchange_time.timestamp_millis(),
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
            turnover: record.turnover,
            trade_count: record.trade_count,
            taker_buy_volume: record.taker_buy_volume,
            taker_buy_turnover: record.taker_buy_turnover,
            local_time: record.local_time.timestamp_millis(),
            symbol: record.symbol.clone(),
            exchange: SmolStr::new_static(EXCHANGE),
            interval: SmolStr::new_static(record.interval.as_str()),
            open_interest: 0,
            trading_day,
        }
    }
}

/// One stored aggregated trade.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AggTradeRow {
    pub agg_trade_id: u64,
    pub price: f64,
    pub volume: f64,
    pub turnover: f64,
    pub first_trade_id: u64,
    pub last_trade_id: u64,
    pub trade_time: i64,
    pub is_buyer_maker: bool,
    pub is_best_price_match: bool,
    pub local_time: i64,
    pub symbol: SmolStr,
    pub exchange: SmolStr,
    pub trading_day: NaiveDate,
}

impl AggTradeRow {
    pub fn from_record(record: &AggTradeRecord, symbol: &str, trading_day: NaiveDate) -> Self {
        Self {
            agg_trade_id: record.agg_trade_id,
            price: record.price,
            volume: record.volume,
            turnover: record.turnover,
            first_trade_id: record.first_trade_id,
            last_trade_id: record.last_trade_id,
            trade_time: record.trade_time.timestamp_millis(),
            is_buyer_maker: record.is_buyer_maker,
            is_best_price_match: record.is_best_price_match,
            local_time: record.local_time.timestamp_millis(),
            symbol: SmolStr::new(symbol),
            exchange: SmolStr::new_static(EXCHANGE),
            trading_day,
        }
    }
}

/// One stored raw trade.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TradeRow {
    pub id: u64,
    pub price: f64,
    pub quantity: f64,
    pub quote_quantity: f64,
    pub time: i64,
    pub is_buyer_maker: bool,
    pub is_best_match: bool,
    pub local_time: i64,
    pub symbol: SmolStr,
    pub exchange: SmolStr,
    pub trading_day: NaiveDate,
}

impl TradeRow {
    pub fn from_record(record: &TradeRecord, symbol: &str, trading_day: NaiveDate) -> Self {
        Self {
            id: record.id,
            price: record.price,
            quantity: record.quantity,
            quote_quantity: record.quote_quantity,
            time: record.time.timestamp_millis(),
            is_buyer_maker: record.is_buyer_maker,
            is_best_match: record.is_best_match,
            local_time: record.local_time.timestamp_millis(),
            symbol: SmolStr::new(symbol),
            exchange: SmolStr::new_static(EXCHANGE),
            trading_day,
        }
    }
}

/// One stored trading-day ticker snapshot.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TickerRow {
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
    pub open_time: i64,
    pub close_time: i64,
    pub first_trade_id: i64,
    pub last_trade_id: i64,
    pub trade_count: u64,
    pub local_time: i64,
    pub exchange: SmolStr,
    pub trading_day: NaiveDate,
}

impl TickerRow {
    pub fn from_record(record: &TradingDayTicker, trading_day: NaiveDate) -> Self {
        Self {
            symbol: record.symbol.clone(),
            price_change: record.price_change,
            price_change_percent: record.price_change_percent,
            weighted_avg_price: record.weighted_avg_price,
            open_price: record.open_price,
            high_price: record.high_price,
            low_price: record.low_price,
            last_price: record.last_price,
            volume: record.volume,
            quote_volume: record.quote_volume,
            open_time: record.open_time.timestamp_millis(),
            close_time: record.close_time.timestamp_millis(),
            first_trade_id: record.first_trade_id,
            last_trade_id: record.last_trade_id,
            trade_count: record.trade_count,
            local_time: record.local_time.timestamp_millis(),
            exchange: SmolStr::new_static(EXCHANGE),
            trading_day,
        }
    }
}
