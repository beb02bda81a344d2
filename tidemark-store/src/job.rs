use crate::clickhouse::{kline_table, ClickHouseClient};
use crate::csv::CsvStore;
use crate::error::StoreError;
use crate::rows::KlineRow;
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use std::path::PathBuf;
use tidemark_data::{BinanceRestClient, Interval, TickerType, TimeRange};
use tracing::{debug, info, warn};

/// Inclusive sequence of trading days from `first` to `last`.
///
/// Empty when `first > last`.
pub fn trading_days(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = first;
    while day <= last {
        days.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

/// Fetch window covering one whole trading day.
///
/// Spans `[00:00:00.000, 23:59:59.999]` UTC, so consecutive day windows never
/// overlap and never leave a gap.
pub fn day_window(day: NaiveDate) -> TimeRange {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = start + TimeDelta::milliseconds(86_400_000 - 1);
    TimeRange::new(start, end)
}

/// Day-by-day collection job: fetch one trading day at a time from the REST
/// api and persist it through the configured sinks.
///
/// CSV is always written. ClickHouse mirroring is opt-in via
/// [`Self::with_clickhouse`] and currently covers klines only.
///
/// Every collect method walks its day range in order and stops at the first
/// day the exchange returns no data for, on the assumption that later days
/// are no better. The number of persisted days is returned, so a caller can
/// tell a partial run from a complete one.
#[derive(Debug, Clone)]
pub struct DailyJob {
    client: BinanceRestClient,
    store: CsvStore,
    clickhouse: Option<ClickHouseClient>,
}

impl DailyJob {
    pub fn new(client: BinanceRestClient, store: CsvStore) -> Self {
        Self {
            client,
            store,
            clickhouse: None,
        }
    }

    /// Mirror kline days into ClickHouse as well as CSV.
    pub fn with_clickhouse(mut self, clickhouse: ClickHouseClient) -> Self {
        self.clickhouse = Some(clickhouse);
        self
    }

    /// Collect and persist klines for every day in `[first_day, last_day]`.
    ///
    /// ClickHouse days are deleted before insertion, so re-running a range
    /// replaces it instead of duplicating it.
    pub async fn collect_daily_klines(
        &self,
        symbol: &str,
        interval: Interval,
        first_day: NaiveDate,
        last_day: NaiveDate,
    ) -> Result<usize, StoreError> {
        let mut persisted = 0;
        for day in trading_days(first_day, last_day) {
            let records = self
                .client
                .kline_series(symbol, interval, day_window(day))
                .await?;
            if records.is_empty() {
                warn!(symbol, %day, "no klines for day, stopping collection");
                break;
            }

            self.store.write_klines(symbol, interval, day, &records)?;

            if let Some(clickhouse) = &self.clickhouse {
                match kline_table(interval) {
                    Some(table) => {
                        let rows = records
                            .iter()
                            .map(|record| KlineRow::from_record(record, day))
                            .collect::<Vec<_>>();
                        clickhouse.delete_trading_day(table, day).await?;
                        clickhouse.insert_rows(table, &rows).await?;
                    }
                    None => {
                        debug!(symbol, interval = %interval.as_str(), "interval not mirrored to clickhouse");
                    }
                }
            }

            info!(symbol, %day, records = records.len(), "persisted kline day");
            persisted += 1;
        }
        Ok(persisted)
    }

    /// Collect and persist aggregated trades for every day in
    /// `[first_day, last_day]`.
    pub async fn collect_daily_agg_trades(
        &self,
        symbol: &str,
        first_day: NaiveDate,
        last_day: NaiveDate,
    ) -> Result<usize, StoreError> {
        let mut persisted = 0;
        for day in trading_days(first_day, last_day) {
            let records = self
                .client
                .agg_trade_series(symbol, day_window(day))
                .await?;
            if records.is_empty() {
                warn!(symbol, %day, "no agg trades for day, stopping collection");
                break;
            }

            self.store.write_agg_trades(symbol, day, &records)?;
            info!(symbol, %day, records = records.len(), "persisted agg trade day");
            persisted += 1;
        }
        Ok(persisted)
    }

    /// Collect and persist raw historical trades for every day in
    /// `[first_day, last_day]`.
    ///
    /// The trades endpoint pages backwards from the most recent trade, so
    /// only days still inside the exchange's retention window come back
    /// non-empty.
    pub async fn collect_daily_trades(
        &self,
        symbol: &str,
        first_day: NaiveDate,
        last_day: NaiveDate,
    ) -> Result<usize, StoreError> {
        let mut persisted = 0;
        for day in trading_days(first_day, last_day) {
            let records = self
                .client
                .historical_trade_series(symbol, day_window(day))
                .await?;
            if records.is_empty() {
                warn!(symbol, %day, "no trades for day, stopping collection");
                break;
            }

            self.store.write_trades(symbol, day, &records)?;
            info!(symbol, %day, records = records.len(), "persisted trade day");
            persisted += 1;
        }
        Ok(persisted)
    }

    /// Fetch the current trading-day ticker and persist it as a one-row
    /// snapshot file, keyed by the day the ticker window opened on.
    ///
    /// Returns the written path, or `None` when the exchange has no ticker
    /// for the symbol.
    pub async fn snapshot_trading_day_ticker(
        &self,
        symbol: &str,
        ticker_type: TickerType,
    ) -> Result<Option<PathBuf>, StoreError> {
        let Some(ticker) = self.client.trading_day_ticker(symbol, ticker_type).await? else {
            warn!(symbol, "no trading-day ticker to snapshot");
            return Ok(None);
        };

        let day = ticker.open_time.date_naive();
        let path = self.store.write_ticker(day, &ticker)?;
        info!(symbol, %day, "persisted trading-day ticker");
        Ok(Some(path))
    }
}
