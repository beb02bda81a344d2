use super::message::{DepthMessage, KlineMessage, StreamEnvelope, TickerMessage};
use crate::error::DataError;
use crate::model::Tick;
use chrono::Utc;
use fnv::FnvHashMap;
use smol_str::SmolStr;
use std::sync::RwLock;
use tracing::debug;

/// Outcome of applying one raw frame to the shared tick map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Ticker statistics folded into the tick.
    Ticker,
    /// Order-book levels overwritten.
    Depth,
    /// Closed candle attached as `last_candle`.
    CandleClosed,
    /// Update for a still-open candle, deliberately dropped.
    CandleOpen,
    /// Control acknowledgement without a stream name, dropped.
    Control,
    /// Data for a channel this client never subscribes to, dropped.
    UnknownChannel,
}

/// Apply one raw combined-stream frame to the shared tick map.
///
/// Malformed frames and frames for unregistered symbols are reported as
/// [`DataError::MalformedMessage`]; the caller is expected to log and move on
/// to the next frame rather than tear down the connection.
pub fn apply_message(
    ticks: &RwLock<FnvHashMap<SmolStr, Tick>>,
    raw: &str,
) -> Result<Dispatch, DataError> {
    let envelope: StreamEnvelope =
        serde_json::from_str(raw).map_err(|error| DataError::malformed(error, raw))?;

    let Some(stream) = envelope.stream else {
        debug!(payload = raw, "frame without stream name, discarding");
        return Ok(Dispatch::Control);
    };

    let Some((symbol, channel)) = stream.split_once('@') else {
        return Err(DataError::malformed(
            format!("stream name missing channel separator: {stream}"),
            raw,
        ));
    };

    let mut guard = ticks
        .write()
        .map_err(|_| DataError::Subscribe("tick map RwLock poisoned".to_string()))?;

    match channel {
        "ticker" => {
            let message: TickerMessage = serde_json::from_value(envelope.data)
                .map_err(|error| DataError::malformed(error, raw))?;
            let tick = guard
                .get_mut(symbol)
                .ok_or_else(|| unregistered_symbol(symbol, raw))?;

            tick.last_price = message.last_price;
            tick.open_price = message.open_price;
            tick.high_price = message.high_price;
            tick.low_price = message.low_price;
            tick.volume = message.volume;
            tick.turnover = message.turnover;
            tick.exchange_time = message.event_time;
            tick.local_time = Utc::now();

            Ok(Dispatch::Ticker)
        }
        "depth10" => {
            let message: DepthMessage = serde_json::from_value(envelope.data)
                .map_err(|error| DataError::malformed(error, raw))?;
            let tick = guard
                .get_mut(symbol)
                .ok_or_else(|| unregistered_symbol(symbol, raw))?;

            // Snapshots can carry fewer than ten levels in thin books; only
            // the provided levels are overwritten.
            for (slot, level) in tick.bids.iter_mut().zip(message.bids.iter()) {
                slot.price = level.0;
                slot.volume = level.1;
            }
            for (slot, level) in tick.asks.iter_mut().zip(message.asks.iter()) {
                slot.price = level.0;
                slot.volume = level.1;
            }
            tick.local_time = Utc::now();

            Ok(Dispatch::Depth)
        }
        channel if channel.starts_with("kline_") => {
            let message: KlineMessage = serde_json::from_value(envelope.data)
                .map_err(|error| DataError::malformed(error, raw))?;
            let tick = guard
                .get_mut(symbol)
                .ok_or_else(|| unregistered_symbol(symbol, raw))?;

            if !message.kline.is_closed {
                return Ok(Dispatch::CandleOpen);
            }

            let local_time = Utc::now();
            let record = message
                .kline
                .into_record(tick.symbol.clone(), local_time)
                .map_err(|error| DataError::malformed(error, raw))?;

            tick.last_candle = Some(record);
            tick.local_time = local_time;

            Ok(Dispatch::CandleClosed)
        }
        channel => {
            debug!(%channel, "frame for unhandled channel, discarding");
            Ok(Dispatch::UnknownChannel)
        }
    }
}

fn unregistered_symbol(symbol: &str, raw: &str) -> DataError {
    DataError::malformed(format!("no tick registered for symbol: {symbol}"), raw)
}
