use crate::error::DataError;
use crate::model::{Interval, Tick};
use fnv::FnvHashMap;
use smol_str::SmolStr;
use std::collections::hash_map::Entry;
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, watch};

/// Stream channel names and `SUBSCRIBE` frame construction.
pub mod channel;
/// Application of raw frames to the shared tick map.
pub mod dispatch;
/// Combined-stream payload models.
pub mod message;
mod task;

use task::Command;

/// Production combined-stream endpoint for Binance spot market data.
pub const STREAM_BASE_URL: &str = "wss://data-stream.binance.vision:443/stream";

/// Default reconnection policy for the combined stream.
pub const STREAM_RECONNECTION_POLICY: ReconnectionBackoffPolicy = ReconnectionBackoffPolicy {
    backoff_ms_initial: 125,
    backoff_multiplier: 2,
    backoff_ms_max: 60_000,
};

/// Policy governing how long to wait between stream reconnection attempts.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectionBackoffPolicy {
    /// Initial backoff after the first failed connect.
    pub backoff_ms_initial: u64,
    /// Multiplier applied to the backoff after each successive failure.
    pub backoff_multiplier: u32,
    /// Ceiling the backoff saturates at.
    pub backoff_ms_max: u64,
}

impl Default for ReconnectionBackoffPolicy {
    fn default() -> Self {
        STREAM_RECONNECTION_POLICY
    }
}

/// Lifecycle of the streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    /// No connection attempt has been made yet.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Connected with all tracked subscriptions replayed.
    Open,
    /// The connection dropped; a reconnect is in progress.
    Reconnecting,
    /// Stopped permanently, either explicitly or because the handle dropped.
    Stopped,
}

/// Handle to the live Binance combined market data stream.
///
/// Owns no connection itself; a background task holds the WebSocket and keeps
/// the shared tick map current, reconnecting with exponential backoff when the
/// connection drops. Subscriptions registered through this handle survive
/// reconnects. Dropping every clone of the handle stops the task.
#[derive(Debug, Clone)]
pub struct BinanceMarketStream {
    command_tx: mpsc::UnboundedSender<Command>,
    ticks: Arc<RwLock<FnvHashMap<SmolStr, Tick>>>,
    status_rx: watch::Receiver<StreamStatus>,
}

impl BinanceMarketStream {
    /// Connect to the production combined-stream endpoint, subscribing klines
    /// at `interval` for every symbol registered later.
    ///
    /// Spawns the connection task onto the current Tokio runtime; the returned
    /// handle is usable immediately, before the connection is established.
    pub fn connect(interval: Interval) -> Self {
        Self::connect_with(
            STREAM_BASE_URL.to_string(),
            interval,
            ReconnectionBackoffPolicy::default(),
        )
    }

    /// Connect to a custom endpoint with a custom reconnection policy.
    ///
    /// Useful for testing against a local mock server where aggressive
    /// backoff timings keep tests fast.
    pub fn connect_with(url: String, interval: Interval, policy: ReconnectionBackoffPolicy) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(StreamStatus::Disconnected);
        let ticks: Arc<RwLock<FnvHashMap<SmolStr, Tick>>> = Arc::default();

        tokio::spawn(task::connection_task(
            url,
            interval,
            Arc::clone(&ticks),
            command_rx,
            status_tx,
            policy,
        ));

        Self {
            command_tx,
            ticks,
            status_rx,
        }
    }

    /// Register `symbol` for streaming.
    ///
    /// Idempotent: re-subscribing an already tracked symbol leaves its live
    /// tick untouched and sends nothing. The zeroed [`Tick`] is registered
    /// before the subscribe command is issued, so inbound data can never race
    /// an unregistered symbol. Works in any connection state; symbols
    /// registered while disconnected are subscribed on the next connect.
    pub fn subscribe(&self, symbol: &str) -> Result<(), DataError> {
        let symbol = SmolStr::new(symbol.to_lowercase());

        {
            let mut guard = self
                .ticks
                .write()
                .map_err(|_| DataError::Subscribe("tick map RwLock poisoned".to_string()))?;
            match guard.entry(symbol.clone()) {
                Entry::Occupied(_) => return Ok(()),
                Entry::Vacant(slot) => {
                    slot.insert(Tick::new(symbol.clone()));
                }
            }
        }

        self.command_tx
            .send(Command::Subscribe(symbol))
            .map_err(|_| DataError::Subscribe("stream task has stopped".to_string()))
    }

    /// Point-in-time copy of the live tick for `symbol`, if subscribed.
    pub fn snapshot(&self, symbol: &str) -> Option<Tick> {
        let symbol = symbol.to_lowercase();
        self.ticks
            .read()
            .ok()
            .and_then(|guard| guard.get(symbol.as_str()).cloned())
    }

    /// Point-in-time copies of every live tick.
    pub fn snapshot_all(&self) -> Vec<Tick> {
        self.ticks
            .read()
            .map(|guard| guard.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Current connection status.
    pub fn status(&self) -> StreamStatus {
        *self.status_rx.borrow()
    }

    /// Wait until the connection reports [`StreamStatus::Open`].
    ///
    /// Fails if the stream stops before ever opening.
    pub async fn wait_for_open(&self) -> Result<(), DataError> {
        let mut status_rx = self.status_rx.clone();
        status_rx
            .wait_for(|status| *status == StreamStatus::Open)
            .await
            .map(|_| ())
            .map_err(|_| DataError::Subscribe("stream stopped before opening".to_string()))
    }

    /// Stop the stream permanently. Best-effort; the task may already be gone.
    pub fn stop(&self) {
        let _ = self.command_tx.send(Command::Stop);
    }
}
