use crate::{
    de::de_str,
    de::de_u64_epoch_ms_as_datetime_utc,
    model::record::{TickerType, TradingDayTicker},
    rest::{RestRequest, parse_f64},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Cow;

/// REST request to fetch the trading-day ticker snapshot for one spot symbol.
///
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/rest-api#trading-day-ticker>
#[derive(Debug, Clone)]
pub struct GetTradingDayTicker {
    pub params: GetTradingDayTickerParams,
}

/// Query parameters for a trading-day ticker REST request.
#[derive(Debug, Clone, Serialize)]
pub struct GetTradingDayTickerParams {
    pub symbol: String,
    /// Response detail level, `FULL` or `MINI`.
    #[serde(rename = "type")]
    pub ticker_type: String,
}

impl RestRequest for GetTradingDayTicker {
    type Response = BinanceTradingDayTicker;
    type QueryParams = GetTradingDayTickerParams;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/ticker/tradingDay")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.params)
    }
}

/// Raw trading-day ticker returned by the Binance REST API.
///
/// The change and weighted-average fields are only present in `FULL`
/// responses; `MINI` responses omit them entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceTradingDayTicker {
    pub symbol: String,
    #[serde(default)]
    pub price_change: Option<String>,
    #[serde(default)]
    pub price_change_percent: Option<String>,
    #[serde(default)]
    pub weighted_avg_price: Option<String>,
    #[serde(deserialize_with = "de_str")]
    pub open_price: f64,
    #[serde(deserialize_with = "de_str")]
    pub high_price: f64,
    #[serde(deserialize_with = "de_str")]
    pub low_price: f64,
    #[serde(deserialize_with = "de_str")]
    pub last_price: f64,
    #[serde(deserialize_with = "de_str")]
    pub volume: f64,
    #[serde(deserialize_with = "de_str")]
    pub quote_volume: f64,
    #[serde(deserialize_with = "de_u64_epoch_ms_as_datetime_utc")]
    pub open_time: DateTime<Utc>,
    #[serde(deserialize_with = "de_u64_epoch_ms_as_datetime_utc")]
    pub close_time: DateTime<Utc>,
    #[serde(rename = "firstId")]
    pub first_trade_id: i64,
    #[serde(rename = "lastId")]
    pub last_trade_id: i64,
    pub count: u64,
}

impl BinanceTradingDayTicker {
    /// Convert into a [`TradingDayTicker`], coercing the string-encoded
    /// numeric fields. Fields absent from `MINI` responses become zero.
    pub fn into_record(self, local_time: DateTime<Utc>) -> Result<TradingDayTicker, String> {
        Ok(TradingDayTicker {
            symbol: SmolStr::new(&self.symbol),
            price_change: parse_full_only("price_change", self.price_change.as_deref())?,
            price_change_percent: parse_full_only(
                "price_change_percent",
                self.price_change_percent.as_deref(),
            )?,
            weighted_avg_price: parse_full_only(
                "weighted_avg_price",
                self.weighted_avg_price.as_deref(),
            )?,
            open_price: self.open_price,
            high_price: self.high_price,
            low_price: self.low_price,
            last_price: self.last_price,
            volume: self.volume,
            quote_volume: self.quote_volume,
            open_time: self.open_time,
            close_time: self.close_time,
            first_trade_id: self.first_trade_id,
            last_trade_id: self.last_trade_id,
            trade_count: self.count,
            local_time,
        })
    }
}

fn parse_full_only(field: &'static str, value: Option<&str>) -> Result<f64, String> {
    match value {
        Some(value) => parse_f64(field, value),
        None => Ok(0.0),
    }
}

impl GetTradingDayTicker {
    pub fn new(symbol: String, ticker_type: TickerType) -> Self {
        Self {
            params: GetTradingDayTickerParams {
                symbol,
                ticker_type: ticker_type.as_str().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_payload() -> &'static str {
        r#"{
            "symbol": "BTCUSDT",
            "priceChange": "-83.13000000",
            "priceChangePercent": "-0.317",
            "weightedAvgPrice": "26234.58803036",
            "openPrice": "26304.80000000",
            "highPrice": "26397.46000000",
            "lowPrice": "26088.34000000",
            "lastPrice": "26221.67000000",
            "volume": "18495.35066000",
            "quoteVolume": "485217905.04210480",
            "openTime": 1695686400000,
            "closeTime": 1695772799999,
            "firstId": 3220151555,
            "lastId": 3220849281,
            "count": 697727
        }"#
    }

    #[test]
    fn test_full_ticker_coerces_nine_numeric_fields() {
        let raw: BinanceTradingDayTicker = serde_json::from_str(full_payload()).unwrap();
        let record = raw.into_record(Utc::now()).unwrap();

        assert_eq!(record.symbol, "BTCUSDT");
        assert!((record.price_change - -83.13).abs() < 1e-9);
        assert!((record.price_change_percent - -0.317).abs() < 1e-9);
        assert!((record.weighted_avg_price - 26234.58803036).abs() < 1e-6);
        assert!((record.open_price - 26304.8).abs() < 1e-9);
        assert!((record.high_price - 26397.46).abs() < 1e-9);
        assert!((record.low_price - 26088.34).abs() < 1e-9);
        assert!((record.last_price - 26221.67).abs() < 1e-9);
        assert!((record.volume - 18495.35066).abs() < 1e-6);
        assert!((record.quote_volume - 485217905.0421048).abs() < 1e-3);
        assert_eq!(record.open_time.timestamp_millis(), 1695686400000);
        assert_eq!(record.close_time.timestamp_millis(), 1695772799999);
        assert_eq!(record.first_trade_id, 3220151555);
        assert_eq!(record.last_trade_id, 3220849281);
        assert_eq!(record.trade_count, 697727);
    }

    #[test]
    fn test_mini_ticker_defaults_absent_fields_to_zero() {
        let json = r#"{
            "symbol": "ETHUSDT",
            "openPrice": "1650.00000000",
            "highPrice": "1700.00000000",
            "lowPrice": "1620.00000000",
            "lastPrice": "1688.50000000",
            "volume": "120000.00000000",
            "quoteVolume": "200000000.00000000",
            "openTime": 1695686400000,
            "closeTime": 1695772799999,
            "firstId": 100,
            "lastId": 200,
            "count": 101
        }"#;

        let raw: BinanceTradingDayTicker = serde_json::from_str(json).unwrap();
        let record = raw.into_record(Utc::now()).unwrap();

        assert_eq!(record.price_change, 0.0);
        assert_eq!(record.price_change_percent, 0.0);
        assert_eq!(record.weighted_avg_price, 0.0);
        assert_eq!(record.last_price, 1688.5);
    }

    #[test]
    fn test_type_param_serializes_as_type() {
        let request = GetTradingDayTicker::new("BTCUSDT".to_string(), TickerType::Mini);
        let query = serde_json::to_value(request.params).unwrap();
        assert_eq!(query["symbol"], "BTCUSDT");
        assert_eq!(query["type"], "MINI");
    }
}
