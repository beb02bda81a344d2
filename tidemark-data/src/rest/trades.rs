use crate::{
    de::de_str, de::de_u64_epoch_ms_as_datetime_utc, model::record::TradeRecord,
    rest::RestRequest,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// REST request to fetch older individual trades for one spot symbol, walking
/// backward from `from_id` (or from the most recent trades when absent).
///
/// The live endpoint additionally requires an `X-MBX-APIKEY` header that this
/// client does not send, so the whole path is surfaced as
/// [`DataError::EndpointIncomplete`](crate::error::DataError::EndpointIncomplete)
/// when the exchange rejects it.
///
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/rest-api#old-trade-lookup>
#[derive(Debug, Clone)]
pub struct GetHistoricalTrades {
    pub params: GetHistoricalTradesParams,
}

/// Query parameters for a historical-trades REST request.
#[derive(Debug, Clone, Serialize)]
pub struct GetHistoricalTradesParams {
    pub symbol: String,
    #[serde(rename = "fromId", skip_serializing_if = "Option::is_none")]
    pub from_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl RestRequest for GetHistoricalTrades {
    type Response = Vec<BinanceHistoricalTrade>;
    type QueryParams = GetHistoricalTradesParams;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/historicalTrades")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.params)
    }
}

/// Raw individual trade returned by the Binance REST API, e.g.:
/// ```json
/// {
///   "id": 28457,
///   "price": "4.00000100",
///   "qty": "12.00000000",
///   "quoteQty": "48.000012",
///   "time": 1499865549590,
///   "isBuyerMaker": true,
///   "isBestMatch": true
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceHistoricalTrade {
    pub id: u64,
    #[serde(deserialize_with = "de_str")]
    pub price: f64,
    #[serde(deserialize_with = "de_str")]
    pub qty: f64,
    #[serde(deserialize_with = "de_str")]
    pub quote_qty: f64,
    #[serde(deserialize_with = "de_u64_epoch_ms_as_datetime_utc")]
    pub time: DateTime<Utc>,
    pub is_buyer_maker: bool,
    pub is_best_match: bool,
}

impl BinanceHistoricalTrade {
    pub fn into_record(self, local_time: DateTime<Utc>) -> TradeRecord {
        TradeRecord {
            id: self.id,
            price: self.price,
            quantity: self.qty,
            quote_quantity: self.quote_qty,
            time: self.time,
            is_buyer_maker: self.is_buyer_maker,
            is_best_match: self.is_best_match,
            local_time,
        }
    }
}
