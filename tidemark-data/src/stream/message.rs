use crate::de::{de_str, de_u64_epoch_ms_as_datetime_utc};
use crate::model::{Interval, KlineRecord};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use smol_str::SmolStr;

/// Combined-stream envelope wrapping every data message.
///
/// Control acknowledgements (eg/ the response to a `SUBSCRIBE` frame) arrive
/// without a `stream` field and carry no market data.
///
/// ### Raw Payload Examples
/// #### Data message
/// ```json
/// {
///     "stream": "btcusdt@ticker",
///     "data": { "e": "24hrTicker", "...": "..." }
/// }
/// ```
///
/// #### Control acknowledgement
/// ```json
/// {
///     "result": null,
///     "id": 1
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEnvelope {
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Rolling 24h ticker statistics message.
///
/// Only the fields folded into the live tick are modelled; the remainder of
/// the payload is ignored.
///
/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#individual-symbol-ticker-streams>
/// ```json
/// {
///     "e": "24hrTicker",
///     "E": 1672515782136,
///     "s": "BTCUSDT",
///     "c": "0.0025",
///     "o": "0.0010",
///     "h": "0.0025",
///     "l": "0.0010",
///     "v": "10000",
///     "q": "18"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TickerMessage {
    #[serde(
        alias = "E",
        deserialize_with = "de_u64_epoch_ms_as_datetime_utc"
    )]
    pub event_time: DateTime<Utc>,
    #[serde(alias = "c", deserialize_with = "de_str")]
    pub last_price: f64,
    #[serde(alias = "o", deserialize_with = "de_str")]
    pub open_price: f64,
    #[serde(alias = "h", deserialize_with = "de_str")]
    pub high_price: f64,
    #[serde(alias = "l", deserialize_with = "de_str")]
    pub low_price: f64,
    #[serde(alias = "v", deserialize_with = "de_str")]
    pub volume: f64,
    #[serde(alias = "q", deserialize_with = "de_str")]
    pub turnover: f64,
}

/// One `[price, quantity]` order-book level, string-encoded on the wire.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawLevel(
    #[serde(deserialize_with = "de_str")] pub f64,
    #[serde(deserialize_with = "de_str")] pub f64,
);

/// Partial book depth snapshot message.
///
/// Pushed as a complete top-of-book snapshot, not a diff, so levels can be
/// written straight over the previous state. Carries no event time.
///
/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#partial-book-depth-streams>
/// ```json
/// {
///     "lastUpdateId": 160,
///     "bids": [["0.0024", "10"]],
///     "asks": [["0.0026", "100"]]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthMessage {
    pub last_update_id: u64,
    pub bids: Vec<RawLevel>,
    pub asks: Vec<RawLevel>,
}

/// Candlestick update message.
///
/// Pushed on every trade of the open candle; `kline.is_closed` flips to true
/// exactly once per interval, on the final update of that candle.
///
/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#klinecandlestick-streams-for-utc>
/// ```json
/// {
///     "e": "kline",
///     "E": 1672515782136,
///     "s": "BTCUSDT",
///     "k": {
///         "t": 1672515780000,
///         "T": 1672515839999,
///         "s": "BTCUSDT",
///         "i": "1m",
///         "f": 100,
///         "L": 200,
///         "o": "0.0010",
///         "c": "0.0020",
///         "h": "0.0025",
///         "l": "0.0015",
///         "v": "1000",
///         "n": 100,
///         "x": false,
///         "q": "1.0000",
///         "V": "500",
///         "Q": "0.500",
///         "B": "123456"
///     }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct KlineMessage {
    #[serde(
        alias = "E",
        deserialize_with = "de_u64_epoch_ms_as_datetime_utc"
    )]
    pub event_time: DateTime<Utc>,
    #[serde(alias = "k")]
    pub kline: KlinePayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KlinePayload {
    #[serde(
        alias = "t",
        deserialize_with = "de_u64_epoch_ms_as_datetime_utc"
    )]
    pub start_time: DateTime<Utc>,
    #[serde(
        alias = "T",
        deserialize_with = "de_u64_epoch_ms_as_datetime_utc"
    )]
    pub close_time: DateTime<Utc>,
    #[serde(alias = "i")]
    pub interval: String,
    #[serde(alias = "o", deserialize_with = "de_str")]
    pub open: f64,
    #[serde(alias = "c", deserialize_with = "de_str")]
    pub close: f64,
    #[serde(alias = "h", deserialize_with = "de_str")]
    pub high: f64,
    #[serde(alias = "l", deserialize_with = "de_str")]
    pub low: f64,
    #[serde(alias = "v", deserialize_with = "de_str")]
    pub volume: f64,
    #[serde(alias = "n")]
    pub trade_count: u64,
    #[serde(alias = "x")]
    pub is_closed: bool,
    #[serde(alias = "q", deserialize_with = "de_str")]
    pub turnover: f64,
    #[serde(alias = "V", deserialize_with = "de_str")]
    pub taker_buy_volume: f64,
    #[serde(alias = "Q", deserialize_with = "de_str")]
    pub taker_buy_turnover: f64,
}

impl KlinePayload {
    /// Build the normalised record for this candle.
    ///
    /// Fails when the payload names an interval outside the supported set.
    pub fn into_record(
        self,
        symbol: SmolStr,
        local_time: DateTime<Utc>,
    ) -> Result<KlineRecord, String> {
        let interval: Interval = self.interval.parse()?;

        Ok(KlineRecord {
            symbol,
            interval,
            exchange_time: self.start_time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            turnover: self.turnover,
            trade_count: self.trade_count,
            taker_buy_volume: self.taker_buy_volume,
            taker_buy_turnover: self.taker_buy_turnover,
            close_time: self.close_time,
            local_time,
        })
    }
}
