use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Error, SeqAccess};
use std::{
    fmt::Display,
    str::FromStr,
    time::{Duration, UNIX_EPOCH},
};

/// Deserialize a `String` as the desired type.
///
/// Binance encodes most numeric fields as JSON strings ("27124.66"), so this
/// is the workhorse for price and volume fields.
pub fn de_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::de::Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let data: String = serde::Deserialize::deserialize(deserializer)?;
    data.parse::<T>().map_err(Error::custom)
}

/// Deserialize a `u64` milliseconds value as a `DateTime<Utc>`.
pub fn de_u64_epoch_ms_as_datetime_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer)
        .map(|epoch_ms: u64| datetime_utc_from_epoch_duration(Duration::from_millis(epoch_ms)))
}

/// Determine the `DateTime<Utc>` from the provided `Duration` since the unix
/// epoch.
pub fn datetime_utc_from_epoch_duration(duration: Duration) -> DateTime<Utc> {
    DateTime::<Utc>::from(UNIX_EPOCH + duration)
}

/// Extract & parse the next element of a sequence, failing with a named error
/// if the sequence is exhausted.
///
/// Assists deserialization of the positional arrays Binance uses for kline
/// payloads.
pub fn extract_next<'de, SeqAccessor, T>(
    sequence: &mut SeqAccessor,
    name: &'static str,
) -> Result<T, SeqAccessor::Error>
where
    SeqAccessor: SeqAccess<'de>,
    T: DeserializeOwned,
{
    sequence
        .next_element::<T>()?
        .ok_or_else(|| Error::invalid_length(0, &name))
}
