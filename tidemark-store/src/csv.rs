use crate::error::StoreError;
use crate::rows::{AggTradeRow, KlineRow, TickerRow, TradeRow};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tidemark_data::{AggTradeRecord, Interval, KlineRecord, TradeRecord, TradingDayTicker};
use tracing::info;

/// Trading-day partitioned CSV sink.
///
/// Every series of every symbol gets its own directory, and every trading day
/// gets its own file inside it:
///
/// ```text
/// <root>/BINANCE/spot/BTCUSDT/1d/2021-01-01_klines.csv
/// <root>/BINANCE/spot/BTCUSDT/agg_trades/2021-01-01_agg_trades.csv
/// <root>/BINANCE/spot/BTCUSDT/trades/2021-01-01_trades.csv
/// <root>/BINANCE/spot/BTCUSDT/trading_day_ticker/2021-01-01_trading_day_ticker.csv
/// ```
///
/// Files start with a header row naming the columns of the row structs in
/// [`crate::rows`]. Rewriting a day replaces the whole file, which keeps the
/// sink idempotent per trading day.
#[derive(Debug, Clone)]
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write one trading day of klines, one row per candle.
    pub fn write_klines(
        &self,
        symbol: &str,
        interval: Interval,
        day: NaiveDate,
        records: &[KlineRecord],
    ) -> Result<PathBuf, StoreError> {
        let rows = records
            .iter()
            .map(|record| KlineRow::from_record(record, day))
            .collect::<Vec<_>>();
        self.write_rows(self.day_file(symbol, interval.as_str(), day, "klines"), &rows)
    }

    /// Write one trading day of aggregated trades.
    pub fn write_agg_trades(
        &self,
        symbol: &str,
        day: NaiveDate,
        records: &[AggTradeRecord],
    ) -> Result<PathBuf, StoreError> {
        let rows = records
            .iter()
            .map(|record| AggTradeRow::from_record(record, symbol, day))
            .collect::<Vec<_>>();
        self.write_rows(self.day_file(symbol, "agg_trades", day, "agg_trades"), &rows)
    }

    /// Write one trading day of raw trades.
    pub fn write_trades(
        &self,
        symbol: &str,
        day: NaiveDate,
        records: &[TradeRecord],
    ) -> Result<PathBuf, StoreError> {
        let rows = records
            .iter()
            .map(|record| TradeRow::from_record(record, symbol, day))
            .collect::<Vec<_>>();
        self.write_rows(self.day_file(symbol, "trades", day, "trades"), &rows)
    }

    /// Write a trading-day ticker snapshot as a single-row file.
    pub fn write_ticker(
        &self,
        day: NaiveDate,
        ticker: &TradingDayTicker,
    ) -> Result<PathBuf, StoreError> {
        let row = TickerRow::from_record(ticker, day);
        let path = self.day_file(
            ticker.symbol.as_str(),
            "trading_day_ticker",
            day,
            "trading_day_ticker",
        );
        self.write_rows(path, std::slice::from_ref(&row))
    }

    fn day_file(&self, symbol: &str, series: &str, day: NaiveDate, kind: &str) -> PathBuf {
        self.root
            .join("BINANCE")
            .join("spot")
            .join(symbol.to_uppercase())
            .join(series)
            .join(format!("{day}_{kind}.csv"))
    }

    fn write_rows<Row>(&self, path: PathBuf, rows: &[Row]) -> Result<PathBuf, StoreError>
    where
        Row: Serialize,
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = rows.len(), "wrote csv partition");
        Ok(path)
    }
}
