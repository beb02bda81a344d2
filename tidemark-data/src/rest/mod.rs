use crate::{
    error::DataError,
    model::record::{
        AggTradeRecord, Interval, KlineRecord, TickerType, TradeRecord, TradingDayTicker,
    },
    rest::{
        paginate::{MAX_PAGE_LIMIT, TimeRange, collect_backward, collect_forward},
        queue::RequestQueue,
        retry::{RetryPolicy, is_retriable_data_error, retry_with_backoff},
    },
};
use chrono::Utc;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use smol_str::SmolStr;
use std::{
    borrow::Cow,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};
use tracing::{Instrument, debug, info, warn};

/// Binance aggregate-trades REST request and raw DTO.
pub mod agg_trades;
/// Binance kline/candlestick REST request, raw DTO, and conversion to
/// [`KlineRecord`].
pub mod klines;
/// Forward and backward pagination over single-page fetch primitives.
pub mod paginate;
/// Bounded FIFO request queue with a background worker.
pub mod queue;
/// Exponential backoff retry for transient REST failures.
pub mod retry;
/// Binance server-clock REST request.
pub mod server_time;
/// Binance trading-day ticker REST request and raw DTO.
pub mod ticker;
/// Binance historical-trades REST request and raw DTO.
pub mod trades;

/// Production REST base URL for Binance spot market data.
pub const REST_BASE_URL: &str = "https://api.binance.com";

/// Timeout applied to each individual HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Binance REST API error payload.
///
/// Returned by the Binance API when a request fails, e.g.:
/// ```json
/// { "code": -1121, "msg": "Invalid symbol." }
/// ```
#[derive(Debug, Deserialize)]
pub struct BinanceApiError {
    pub code: i64,
    pub msg: String,
}

/// How non-2xx upstream responses are surfaced to series callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Log the status and request detail and absorb the failure; the caller
    /// observes an empty or missing result.
    #[default]
    LogAndDiscard,
    /// Propagate the failure as
    /// [`DataError::UpstreamStatus`](crate::error::DataError::UpstreamStatus).
    Fatal,
}

/// A typed REST request: endpoint path, HTTP method, query parameters and the
/// response type it decodes to.
pub trait RestRequest {
    type Response: DeserializeOwned;
    type QueryParams: Serialize;

    fn path(&self) -> Cow<'static, str>;

    fn method() -> reqwest::Method;

    fn query_params(&self) -> Option<&Self::QueryParams> {
        None
    }
}

/// REST client for Binance spot market data.
///
/// Explicitly constructed and passed by reference; holds its own connection
/// pool and no ambient global state. Cloning is cheap and clones share the
/// connection pool and the measured server-time offset.
#[derive(Debug, Clone)]
pub struct BinanceRestClient {
    http: reqwest::Client,
    base_url: String,
    status_policy: StatusPolicy,
    retry_policy: RetryPolicy,
    request_timeout: Duration,
    time_offset: Arc<AtomicI64>,
}

impl Default for BinanceRestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BinanceRestClient {
    /// Construct a client against the production base URL.
    pub fn new() -> Self {
        Self::with_base_url(REST_BASE_URL.to_string())
    }

    /// Construct a client with a custom base URL.
    ///
    /// Useful for testing with a mock server where the URL is not known at
    /// compile time.
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            status_policy: StatusPolicy::default(),
            retry_policy: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            time_offset: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Override how non-2xx upstream responses are surfaced.
    pub fn with_status_policy(mut self, status_policy: StatusPolicy) -> Self {
        self.status_policy = status_policy;
        self
    }

    /// Override the retry policy applied around each page fetch.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Override the per-request HTTP timeout.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Execute a typed request once and decode its response.
    pub async fn execute<Request>(&self, request: &Request) -> Result<Request::Response, DataError>
    where
        Request: RestRequest,
    {
        let url = format!("{}{}", self.base_url, request.path());
        let mut builder = self
            .http
            .request(Request::method(), url)
            .timeout(self.request_timeout);
        if let Some(params) = request.query_params() {
            builder = builder.query(params);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        parse_response(status, &body)
    }

    /// Execute a typed request with exponential-backoff retry on transient
    /// failures.
    pub async fn execute_with_retry<Request>(
        &self,
        request: &Request,
    ) -> Result<Request::Response, DataError>
    where
        Request: RestRequest,
    {
        retry_with_backoff(&self.retry_policy, is_retriable_data_error, || {
            self.execute(request)
        })
        .await
    }

    /// Fetch a complete kline series for `range`, paginating forward one page
    /// at a time until the range is exhausted.
    ///
    /// Output is deduplicated by open time and ascending. Transport failures
    /// abort the whole fetch; upstream status failures follow the client's
    /// [`StatusPolicy`].
    pub async fn kline_series(
        &self,
        symbol: &str,
        interval: Interval,
        range: TimeRange,
    ) -> Result<Vec<KlineRecord>, DataError> {
        let span = tracing::info_span!(
            "kline_series",
            exchange = "binance",
            symbol,
            interval = %interval,
        );

        async move {
            let symbol_key = SmolStr::new(symbol);

            let result = collect_forward(range, |cursor| {
                let request = klines::GetKlines {
                    params: klines::GetKlinesParams {
                        symbol: symbol.to_string(),
                        interval: interval.as_str().to_string(),
                        start_time: Some(cursor.timestamp_millis()),
                        end_time: Some(range.end.timestamp_millis()),
                        limit: Some(MAX_PAGE_LIMIT),
                    },
                };
                let client = self;
                let symbol_key = symbol_key.clone();
                async move {
                    let page = client.execute_with_retry(&request).await?;
                    let received = Utc::now();
                    page.into_iter()
                        .map(|raw| raw.into_record(symbol_key.clone(), interval, received))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|err| DataError::malformed(err, "klines response"))
                }
            })
            .await;

            let result = self.absorb_status(result);
            if let Ok(records) = &result {
                debug!(count = records.len(), "kline series complete");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Fetch a complete aggregate-trade series for `range`, paginating
    /// forward one page at a time until the range is exhausted.
    pub async fn agg_trade_series(
        &self,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<AggTradeRecord>, DataError> {
        let span = tracing::info_span!("agg_trade_series", exchange = "binance", symbol);

        async move {
            let result = collect_forward(range, |cursor| {
                let request = agg_trades::GetAggTrades {
                    params: agg_trades::GetAggTradesParams {
                        symbol: symbol.to_string(),
                        start_time: Some(cursor.timestamp_millis()),
                        end_time: Some(range.end.timestamp_millis()),
                        limit: Some(MAX_PAGE_LIMIT),
                    },
                };
                let client = self;
                async move {
                    let page = client.execute_with_retry(&request).await?;
                    let received = Utc::now();
                    Ok(page
                        .into_iter()
                        .map(|raw| raw.into_record(received))
                        .collect())
                }
            })
            .await;

            let result = self.absorb_status(result);
            if let Ok(records) = &result {
                debug!(count = records.len(), "aggregate trade series complete");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Fetch individual historical trades for `range` by walking the trade-id
    /// space backward from the most recent page.
    ///
    /// Output is deduplicated and sorted ascending by trade id. This code
    /// path is known-incomplete: the live endpoint also requires an
    /// `X-MBX-APIKEY` header this client does not send, so a 401 surfaces as
    /// [`DataError::EndpointIncomplete`](crate::error::DataError::EndpointIncomplete)
    /// regardless of the status policy.
    pub async fn historical_trade_series(
        &self,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<TradeRecord>, DataError> {
        let span = tracing::info_span!("historical_trade_series", exchange = "binance", symbol);

        async move {
            let result = collect_backward(range, |from_id| {
                let request = trades::GetHistoricalTrades {
                    params: trades::GetHistoricalTradesParams {
                        symbol: symbol.to_string(),
                        from_id,
                        limit: Some(MAX_PAGE_LIMIT),
                    },
                };
                let client = self;
                async move {
                    let page = client
                        .execute_with_retry(&request)
                        .await
                        .map_err(flag_missing_auth)?;
                    let received = Utc::now();
                    Ok(page
                        .into_iter()
                        .map(|raw| raw.into_record(received))
                        .collect())
                }
            })
            .await;

            self.absorb_status(result)
        }
        .instrument(span)
        .await
    }

    /// Fetch the trading-day ticker snapshot for one symbol.
    ///
    /// Returns `Ok(None)` when an upstream status failure was absorbed by the
    /// default [`StatusPolicy`].
    pub async fn trading_day_ticker(
        &self,
        symbol: &str,
        ticker_type: TickerType,
    ) -> Result<Option<TradingDayTicker>, DataError> {
        let span = tracing::info_span!(
            "trading_day_ticker",
            exchange = "binance",
            symbol,
            ticker_type = %ticker_type,
        );

        async move {
            let request = ticker::GetTradingDayTicker::new(symbol.to_string(), ticker_type);
            let result = match self.execute_with_retry(&request).await {
                Ok(raw) => raw
                    .into_record(Utc::now())
                    .map(Some)
                    .map_err(|err| DataError::malformed(err, "tradingDay ticker response")),
                Err(err) => Err(err),
            };
            self.absorb_status(result)
        }
        .instrument(span)
        .await
    }

    /// Current exchange server time in epoch milliseconds.
    pub async fn server_time(&self) -> Result<i64, DataError> {
        let response = self.execute_with_retry(&server_time::GetServerTime).await?;
        Ok(response.server_time)
    }

    /// Submit a server-time request through `queue`. The queue worker
    /// measures the clock offset (`local - server`, in milliseconds) and
    /// stores it on this client as soon as the response arrives.
    ///
    /// Submission failures surface immediately. The returned future only
    /// reports the measured offset, so dropping it turns the sync into
    /// fire-and-forget without losing the measurement.
    pub fn sync_server_time(
        &self,
        queue: &RequestQueue,
    ) -> Result<impl Future<Output = Result<i64, DataError>>, DataError> {
        let offset_store = Arc::clone(&self.time_offset);

        queue.submit_map(server_time::GetServerTime, move |response| {
            let offset = Utc::now().timestamp_millis() - response.server_time;
            offset_store.store(offset, Ordering::Relaxed);
            info!(offset_ms = offset, "synchronised server time");
            offset
        })
    }

    /// Most recently measured clock offset (`local - server`) in
    /// milliseconds, zero until the first sync completes.
    pub fn time_offset_ms(&self) -> i64 {
        self.time_offset.load(Ordering::Relaxed)
    }

    /// Apply the client's [`StatusPolicy`] to a finished operation: upstream
    /// status failures are either logged and absorbed into a default (empty)
    /// result, or propagated. Every other error propagates regardless.
    fn absorb_status<T: Default>(&self, result: Result<T, DataError>) -> Result<T, DataError> {
        match result {
            Err(DataError::UpstreamStatus { status, message })
                if self.status_policy == StatusPolicy::LogAndDiscard =>
            {
                warn!(%status, message, "upstream rejected request, discarding result");
                Ok(T::default())
            }
            other => other,
        }
    }
}

/// Decode a REST response body: 2xx decodes as `Response`, anything else
/// decodes the Binance `{"code","msg"}` error payload into
/// [`DataError::UpstreamStatus`].
fn parse_response<Response>(status: StatusCode, body: &[u8]) -> Result<Response, DataError>
where
    Response: DeserializeOwned,
{
    if status.is_success() {
        return serde_json::from_slice(body)
            .map_err(|err| DataError::malformed(err, String::from_utf8_lossy(body)));
    }

    let message = match serde_json::from_slice::<BinanceApiError>(body) {
        Ok(api_error) => format!("code {}: {}", api_error.code, api_error.msg),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    };

    Err(DataError::UpstreamStatus { status, message })
}

/// Map a 401 from historicalTrades to [`DataError::EndpointIncomplete`]: the
/// endpoint requires an X-MBX-APIKEY header this client does not send.
fn flag_missing_auth(error: DataError) -> DataError {
    match error {
        DataError::UpstreamStatus { status, .. } if status == StatusCode::UNAUTHORIZED => {
            DataError::EndpointIncomplete(
                "historicalTrades requires an X-MBX-APIKEY header this client does not send",
            )
        }
        other => other,
    }
}

pub(crate) fn parse_f64(field: &'static str, value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|err| format!("failed to parse {field} '{value}': {err}"))
}
