use super::record::KlineRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Number of order-book levels tracked per side.
pub const DEPTH_LEVELS: usize = 10;

/// One price level of the order book.
#[derive(Copy, Clone, Default, PartialEq, Debug, Deserialize, Serialize)]
pub struct BookLevel {
    pub price: f64,
    pub volume: f64,
}

/// Live market state for one subscribed symbol.
///
/// A `Tick` is overwritten in place as ticker, depth and kline messages
/// arrive. Completed candles are attached as a [`KlineRecord`] snapshot in
/// `last_candle` rather than merged into the tick fields, so a reader can
/// always distinguish "latest quote state" from "latest closed candle".
/// Reads through the streaming client return point-in-time copies.
#[derive(Clone, Default, PartialEq, Debug, Deserialize, Serialize)]
pub struct Tick {
    pub symbol: SmolStr,
    pub exchange_time: DateTime<Utc>,
    pub local_time: DateTime<Utc>,
    pub last_price: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub volume: f64,
    pub turnover: f64,
    pub bids: [BookLevel; DEPTH_LEVELS],
    pub asks: [BookLevel; DEPTH_LEVELS],
    /// Most recent closed candle for the subscribed kline interval, if any
    /// has completed since the subscription was registered.
    pub last_candle: Option<KlineRecord>,
}

impl Tick {
    /// An empty tick for `symbol`, timestamped now, with zeroed market fields.
    ///
    /// Created as soon as a subscription is registered, before any message
    /// has arrived, so snapshot reads never race the first update.
    pub fn new(symbol: SmolStr) -> Self {
        let now = Utc::now();
        Self {
            symbol,
            exchange_time: now,
            local_time: now,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tick_is_zeroed_apart_from_identity() {
        let tick = Tick::new(SmolStr::new("btcusdt"));

        assert_eq!(tick.symbol, "btcusdt");
        assert_eq!(tick.last_price, 0.0);
        assert_eq!(tick.volume, 0.0);
        assert_eq!(tick.bids, [BookLevel::default(); DEPTH_LEVELS]);
        assert_eq!(tick.asks, [BookLevel::default(); DEPTH_LEVELS]);
        assert!(tick.last_candle.is_none());
        assert_eq!(tick.exchange_time, tick.local_time);
    }
}
