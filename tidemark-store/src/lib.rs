//! Trading-day partitioned persistence for tidemark market data.
//!
//! Collected series land in two sinks:
//! - [`csv`]: one file per symbol, series and trading day, under a fixed
//!   directory layout.
//! - [`clickhouse`]: the same rows mirrored into ClickHouse over its HTTP
//!   interface, replaced day-by-day.
//!
//! [`job::DailyJob`] drives both, pulling one trading day at a time from the
//! [`tidemark_data`] REST client.

/// ClickHouse HTTP client and kline table mapping.
pub mod clickhouse;
/// Partitioned CSV sink.
pub mod csv;
/// Storage error taxonomy.
pub mod error;
/// Day-by-day collection jobs.
pub mod job;
/// Flattened row schemas shared by both sinks.
pub mod rows;

pub use clickhouse::{kline_table, ClickHouseClient, ClickHouseConfig};
pub use error::StoreError;
pub use job::{day_window, trading_days, DailyJob};
pub use rows::{AggTradeRow, KlineRow, TickerRow, TradeRow};
pub use self::csv::CsvStore;
