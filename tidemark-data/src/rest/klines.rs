use crate::{
    de::extract_next,
    model::record::{Interval, KlineRecord},
    rest::{RestRequest, parse_f64},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use smol_str::SmolStr;
use std::borrow::Cow;

/// REST request to fetch kline/candlestick data for one spot symbol.
///
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/rest-api#klinecandlestick-data>
#[derive(Debug, Clone)]
pub struct GetKlines {
    pub params: GetKlinesParams,
}

/// Query parameters for a klines REST request.
#[derive(Debug, Clone, Serialize)]
pub struct GetKlinesParams {
    pub symbol: String,
    pub interval: String,
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl RestRequest for GetKlines {
    type Response = Vec<BinanceKline>;
    type QueryParams = GetKlinesParams;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/klines")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.params)
    }
}

/// Raw kline row returned by the Binance REST API.
///
/// Binance returns klines as positional arrays of mixed types:
/// `[open_time, open, high, low, close, volume, close_time, quote_volume,
/// trade_count, taker_buy_base, taker_buy_quote, ignore]`
///
/// Deserialized with a sequence visitor so each positional element lands in a
/// named field; the trailing "ignore" element is dropped.
#[derive(Debug, Clone)]
pub struct BinanceKline {
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub close_time: i64,
    pub quote_volume: String,
    pub trade_count: u64,
    pub taker_buy_base_volume: String,
    pub taker_buy_quote_volume: String,
}

impl<'de> serde::Deserialize<'de> for BinanceKline {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        struct BinanceKlineVisitor;

        impl<'de> serde::de::Visitor<'de> for BinanceKlineVisitor {
            type Value = BinanceKline;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a Binance kline array with at least 11 elements")
            }

            fn visit_seq<SeqAccessor>(
                self,
                mut seq: SeqAccessor,
            ) -> Result<Self::Value, SeqAccessor::Error>
            where
                SeqAccessor: serde::de::SeqAccess<'de>,
            {
                // Binance kline array layout (12 elements):
                // [0]  open_time               (i64 ms)
                // [1]  open                    (String)
                // [2]  high                    (String)
                // [3]  low                     (String)
                // [4]  close                   (String)
                // [5]  volume                  (String)
                // [6]  close_time              (i64 ms)
                // [7]  quote_volume            (String)
                // [8]  trade_count             (u64)
                // [9]  taker_buy_base_volume   (String)
                // [10] taker_buy_quote_volume  (String)
                // [11] unused                  (ignored)
                let open_time = extract_next(&mut seq, "open_time")?;
                let open = extract_next(&mut seq, "open")?;
                let high = extract_next(&mut seq, "high")?;
                let low = extract_next(&mut seq, "low")?;
                let close = extract_next(&mut seq, "close")?;
                let volume = extract_next(&mut seq, "volume")?;
                let close_time = extract_next(&mut seq, "close_time")?;
                let quote_volume = extract_next(&mut seq, "quote_volume")?;
                let trade_count = extract_next(&mut seq, "trade_count")?;
                let taker_buy_base_volume = extract_next(&mut seq, "taker_buy_base_volume")?;
                let taker_buy_quote_volume = extract_next(&mut seq, "taker_buy_quote_volume")?;

                // Skip the trailing unused element
                while seq.next_element::<serde::de::IgnoredAny>()?.is_some() {}

                Ok(BinanceKline {
                    open_time,
                    open,
                    high,
                    low,
                    close,
                    volume,
                    close_time,
                    quote_volume,
                    trade_count,
                    taker_buy_base_volume,
                    taker_buy_quote_volume,
                })
            }
        }

        deserializer.deserialize_seq(BinanceKlineVisitor)
    }
}

impl BinanceKline {
    /// Convert into a [`KlineRecord`], renaming open time to exchange time
    /// and quote volume to turnover.
    pub fn into_record(
        self,
        symbol: SmolStr,
        interval: Interval,
        local_time: DateTime<Utc>,
    ) -> Result<KlineRecord, String> {
        let exchange_time = DateTime::from_timestamp_millis(self.open_time)
            .ok_or_else(|| format!("invalid open_time millis: {}", self.open_time))?;

        let close_time = DateTime::from_timestamp_millis(self.close_time)
            .ok_or_else(|| format!("invalid close_time millis: {}", self.close_time))?;

        Ok(KlineRecord {
            symbol,
            interval,
            exchange_time,
            open: parse_f64("open", &self.open)?,
            high: parse_f64("high", &self.high)?,
            low: parse_f64("low", &self.low)?,
            close: parse_f64("close", &self.close)?,
            volume: parse_f64("volume", &self.volume)?,
            turnover: parse_f64("quote_volume", &self.quote_volume)?,
            trade_count: self.trade_count,
            taker_buy_volume: parse_f64("taker_buy_base_volume", &self.taker_buy_base_volume)?,
            taker_buy_turnover: parse_f64("taker_buy_quote_volume", &self.taker_buy_quote_volume)?,
            close_time,
            local_time,
        })
    }
}
