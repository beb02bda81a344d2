use crate::error::StoreError;
use chrono::NaiveDate;
use serde::Serialize;
use tidemark_data::Interval;
use tracing::debug;

/// Rows per `INSERT` statement. ClickHouse prefers few large inserts over
/// many small ones.
pub const INSERT_BATCH_SIZE: usize = 100_000;

/// Connection parameters for the ClickHouse HTTP interface.
#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8123,
            username: None,
            password: None,
            database: "kline".to_string(),
        }
    }
}

/// ClickHouse table that mirrors klines of the given interval, if any.
///
/// Only a subset of intervals is mirrored into ClickHouse. The rest stay
/// CSV-only.
pub fn kline_table(interval: Interval) -> Option<&'static str> {
    match interval {
        Interval::S1 => Some("one_second_binance"),
        Interval::M1 => Some("one_minute_binance"),
        Interval::H1 => Some("one_hour_binance"),
        Interval::D1 => Some("daily_binance"),
        _ => None,
    }
}

/// Minimal ClickHouse client speaking the HTTP interface on port 8123.
///
/// Statements travel in the `query` parameter; insert payloads travel in the
/// request body as headerless CSV (`FORMAT CSV`).
#[derive(Debug, Clone)]
pub struct ClickHouseClient {
    http: reqwest::Client,
    base_url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
    insert_batch_size: usize,
}

impl ClickHouseClient {
    pub fn new(config: ClickHouseConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{}:{}", config.host, config.port),
            database: config.database,
            username: config.username,
            password: config.password,
            insert_batch_size: INSERT_BATCH_SIZE,
        }
    }

    /// Replace the server url. Useful for testing against a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the rows-per-insert batch size.
    pub fn with_insert_batch_size(mut self, insert_batch_size: usize) -> Self {
        self.insert_batch_size = insert_batch_size;
        self
    }

    /// Delete rows matching `condition` from `table`.
    ///
    /// Issued as a mutation (`ALTER TABLE .. DELETE`), which ClickHouse
    /// applies asynchronously.
    pub async fn delete(&self, table: &str, condition: &str) -> Result<(), StoreError> {
        let statement = format!(
            "ALTER TABLE {}.{} DELETE WHERE {}",
            self.database, table, condition
        );
        self.execute(&statement, Vec::new()).await
    }

    /// Delete every row of one trading day, making a following insert
    /// idempotent per day.
    pub async fn delete_trading_day(&self, table: &str, day: NaiveDate) -> Result<(), StoreError> {
        self.delete(table, &format!("TradingDay = '{day}'")).await
    }

    /// Insert rows in batches of [`Self::with_insert_batch_size`], encoded as
    /// headerless CSV in the serialisation order of `Row`.
    pub async fn insert_rows<Row>(&self, table: &str, rows: &[Row]) -> Result<(), StoreError>
    where
        Row: Serialize,
    {
        let statement = format!("INSERT INTO {}.{} FORMAT CSV", self.database, table);
        for batch in rows.chunks(self.insert_batch_size) {
            let body = csv_body(batch)?;
            self.execute(&statement, body).await?;
            debug!(table, rows = batch.len(), "inserted batch");
        }
        Ok(())
    }

    async fn execute(&self, statement: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let mut request = self
            .http
            .post(&self.base_url)
            .query(&[("query", statement)])
            .body(body);
        if let Some(username) = &self.username {
            request = request.header("X-ClickHouse-User", username.as_str());
        }
        if let Some(password) = &self.password {
            request = request.header("X-ClickHouse-Key", password.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::ClickHouse { status, body });
        }
        Ok(())
    }
}

fn csv_body<Row>(rows: &[Row]) -> Result<Vec<u8>, StoreError>
where
    Row: Serialize,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| StoreError::Io(err.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::KlineRow;
    use smol_str::SmolStr;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn kline_row(index: i64) -> KlineRow {
        KlineRow {
            exchange_time: 1609459200000 + index * 60_000,
            open: 100.0 + index as f64,
            high: 101.0 + index as f64,
            low: 99.0 + index as f64,
            close: 100.5 + index as f64,
            volume: 12.5,
            turnover: 1256.25,
            trade_count: 42,
            taker_buy_volume: 6.25,
            taker_buy_turnover: 628.12,
            local_time: 1609459260000 + index * 60_000,
            symbol: SmolStr::new_static("BTCUSDT"),
            exchange: SmolStr::new_static("BINANCE"),
            interval: SmolStr::new_static("1m"),
            open_interest: 0,
            trading_day: date("2021-01-01"),
        }
    }

    #[test]
    fn test_kline_table_mapping() {
        assert_eq!(kline_table(Interval::S1), Some("one_second_binance"));
        assert_eq!(kline_table(Interval::M1), Some("one_minute_binance"));
        assert_eq!(kline_table(Interval::H1), Some("one_hour_binance"));
        assert_eq!(kline_table(Interval::D1), Some("daily_binance"));
        assert_eq!(kline_table(Interval::M15), None);
        assert_eq!(kline_table(Interval::W1), None);
    }

    #[tokio::test]
    async fn test_delete_trading_day_issues_alter_delete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(query_param(
                "query",
                "ALTER TABLE kline.daily_binance DELETE WHERE TradingDay = '2021-01-01'",
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            ClickHouseClient::new(ClickHouseConfig::default()).with_base_url(server.uri());
        client
            .delete_trading_day("daily_binance", date("2021-01-01"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_insert_rows_chunks_into_headerless_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param(
                "query",
                "INSERT INTO kline.one_minute_binance FORMAT CSV",
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;

        let rows = (0..5).map(kline_row).collect::<Vec<_>>();
        let client = ClickHouseClient::new(ClickHouseConfig::default())
            .with_base_url(server.uri())
            .with_insert_batch_size(2);
        client.insert_rows("one_minute_binance", &rows).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        let first = String::from_utf8(requests[0].body.clone()).unwrap();
        assert_eq!(first.lines().count(), 2, "first batch should hold two rows");
        assert!(
            first.starts_with("1609459200000,100"),
            "insert bodies carry no header: {first}"
        );
        let last = String::from_utf8(requests[2].body.clone()).unwrap();
        assert_eq!(last.lines().count(), 1, "final batch holds the remainder");
    }

    #[tokio::test]
    async fn test_credentials_travel_as_clickhouse_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-ClickHouse-User", "reader"))
            .and(header("X-ClickHouse-Key", "hunter2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClickHouseConfig {
            username: Some("reader".to_string()),
            password: Some("hunter2".to_string()),
            ..ClickHouseConfig::default()
        };
        let client = ClickHouseClient::new(config).with_base_url(server.uri());
        client
            .delete_trading_day("daily_binance", date("2021-01-01"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_response_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string("Code: 60. DB::Exception: Table kline.daily_binance does not exist"),
            )
            .mount(&server)
            .await;

        let client =
            ClickHouseClient::new(ClickHouseConfig::default()).with_base_url(server.uri());
        let error = client
            .delete_trading_day("daily_binance", date("2021-01-01"))
            .await
            .unwrap_err();

        match error {
            StoreError::ClickHouse { status, body } => {
                assert_eq!(status.as_u16(), 404);
                assert!(body.contains("does not exist"));
            }
            other => panic!("expected clickhouse error, got: {other:?}"),
        }
    }
}
