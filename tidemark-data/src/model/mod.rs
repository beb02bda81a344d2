/// Normalised market-data records produced by the REST series fetchers and
/// the live stream.
pub mod record;

/// Live per-symbol market state maintained by the streaming client.
pub mod tick;

pub use record::{
    AggTradeRecord, Interval, KlineRecord, TickerType, TradeRecord, TradingDayTicker,
};
pub use tick::{BookLevel, DEPTH_LEVELS, Tick};
