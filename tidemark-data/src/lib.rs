//! High-fidelity Binance spot market data acquisition.
//!
//! Split into two halves:
//! - [`rest`]: paginated historical series (klines, aggregate trades,
//!   individual trades) and point-in-time snapshots over HTTP, with
//!   retry, bounded request queueing and server clock measurement.
//! - [`stream`]: live ticker, order-book depth and candle state over the
//!   combined WebSocket stream, maintained in place across reconnects.
//!
//! Every payload normalises into the types in [`model`], carrying both the
//! exchange timestamp and the local receive timestamp.

/// Custom deserialisation helpers for exchange payload quirks.
pub mod de;
/// Error taxonomy shared by the REST and stream halves.
pub mod error;
/// Normalised market data types.
pub mod model;
/// HTTP client, pagination and request queueing.
pub mod rest;
/// Live combined-stream client.
pub mod stream;

pub use error::DataError;
pub use model::{
    AggTradeRecord, Interval, KlineRecord, Tick, TickerType, TradeRecord, TradingDayTicker,
};
pub use rest::paginate::TimeRange;
pub use rest::queue::RequestQueue;
pub use rest::{BinanceRestClient, StatusPolicy};
pub use stream::{BinanceMarketStream, ReconnectionBackoffPolicy, StreamStatus};
