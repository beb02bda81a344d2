use crate::model::Interval;
use serde_json::json;
use smol_str::{format_smolstr, SmolStr};

/// Type that defines how to translate a subscription into a Binance
/// combined-stream channel suffix.
///
/// eg/ "ticker", "depth10", "kline_1m"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamChannel(pub SmolStr);

impl StreamChannel {
    /// Rolling 24h ticker statistics.
    ///
    /// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#individual-symbol-ticker-streams>
    pub const TICKER: Self = Self(SmolStr::new_static("ticker"));

    /// Top ten levels of the order book, pushed as full snapshots.
    ///
    /// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#partial-book-depth-streams>
    pub const DEPTH10: Self = Self(SmolStr::new_static("depth10"));

    /// Candlestick updates for the provided [`Interval`].
    ///
    /// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#klinecandlestick-streams-for-utc>
    pub fn kline(interval: Interval) -> Self {
        Self(format_smolstr!("kline_{interval}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Combined-stream name for one symbol and channel pair, eg/ "btcusdt@ticker".
///
/// Binance requires stream names in lowercase; callers are expected to have
/// normalised `symbol` already.
pub fn stream_name(symbol: &str, channel: &StreamChannel) -> SmolStr {
    format_smolstr!("{}@{}", symbol, channel.as_str())
}

/// The three stream names maintained for every tracked symbol.
pub fn symbol_stream_names(symbol: &str, interval: Interval) -> [SmolStr; 3] {
    [
        stream_name(symbol, &StreamChannel::TICKER),
        stream_name(symbol, &StreamChannel::DEPTH10),
        stream_name(symbol, &StreamChannel::kline(interval)),
    ]
}

/// `SUBSCRIBE` control frame listing the provided stream names.
///
/// ### Request
/// ```json
/// {
///     "method": "SUBSCRIBE",
///     "params": ["btcusdt@ticker", "btcusdt@depth10"],
///     "id": 1
/// }
/// ```
pub fn subscribe_message(streams: &[SmolStr], id: u64) -> String {
    json!({
        "method": "SUBSCRIBE",
        "params": streams,
        "id": id,
    })
    .to_string()
}
