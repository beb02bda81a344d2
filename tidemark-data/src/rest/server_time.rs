use crate::rest::RestRequest;
use serde::Deserialize;
use std::borrow::Cow;

/// REST request for the exchange server clock.
///
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/rest-api#check-server-time>
#[derive(Debug, Clone, Copy)]
pub struct GetServerTime;

/// Server clock payload, e.g. `{"serverTime": 1499827319559}`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceServerTime {
    pub server_time: i64,
}

impl RestRequest for GetServerTime {
    type Response = BinanceServerTime;
    type QueryParams = ();

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/api/v3/time")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::GET
    }
}
