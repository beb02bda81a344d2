use crate::{
    de::de_str, de::de_u64_epoch_ms_as_datetime_utc, model::record::AggTradeRecord,
    rest::RestRequest,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// REST request to fetch aggregate trades for one spot symbol.
///
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/rest-api#compressedaggregate-trades-list>
#[derive(Debug, Clone)]
pub struct GetAggTrades {
    pub params: GetAggTradesParams,
}

/// Query parameters for an aggregate-trades REST request.
#[derive(Debug, Clone, Serialize)]
pub struct GetAggTradesParams {
    pub symbol: String,
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl RestRequest for GetAggTrades {
    type Response = Vec<BinanceAggTrade>;
    type QueryParams = GetAggTradesParams;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/aggTrades")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.params)
    }
}

/// Raw aggregate trade returned by the Binance REST API, e.g.:
/// ```json
/// {
///   "a": 26129,
///   "p": "0.01633102",
///   "q": "4.70443515",
///   "f": 27781,
///   "l": 27781,
///   "T": 1498793709153,
///   "m": true,
///   "M": true
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceAggTrade {
    #[serde(rename = "a")]
    pub agg_trade_id: u64,
    #[serde(rename = "p", deserialize_with = "de_str")]
    pub price: f64,
    #[serde(rename = "q", deserialize_with = "de_str")]
    pub quantity: f64,
    #[serde(rename = "f")]
    pub first_trade_id: u64,
    #[serde(rename = "l")]
    pub last_trade_id: u64,
    #[serde(rename = "T", deserialize_with = "de_u64_epoch_ms_as_datetime_utc")]
    pub time: DateTime<Utc>,
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
    #[serde(rename = "M")]
    pub is_best_price_match: bool,
}

impl BinanceAggTrade {
    /// Convert into an [`AggTradeRecord`], deriving `turnover` from price and
    /// quantity since the payload does not carry it.
    pub fn into_record(self, local_time: DateTime<Utc>) -> AggTradeRecord {
        AggTradeRecord {
            agg_trade_id: self.agg_trade_id,
            price: self.price,
            volume: self.quantity,
            turnover: self.price * self.quantity,
            first_trade_id: self.first_trade_id,
            last_trade_id: self.last_trade_id,
            trade_time: self.time,
            is_buyer_maker: self.is_buyer_maker,
            is_best_price_match: self.is_best_price_match,
            local_time,
        }
    }
}
