use super::channel::{subscribe_message, symbol_stream_names};
use super::dispatch::apply_message;
use super::{ReconnectionBackoffPolicy, StreamStatus};
use crate::model::{Interval, Tick};
use fnv::FnvHashMap;
use futures::{SinkExt, StreamExt};
use smol_str::SmolStr;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

/// Commands accepted by the connection task.
#[derive(Debug)]
pub(crate) enum Command {
    /// Track a symbol and subscribe its channels on the live connection.
    Subscribe(SmolStr),
    /// Terminate the task permanently.
    Stop,
}

/// Symbols tracked across reconnects, ordered and duplicate-free.
///
/// The full set is replayed in one `SUBSCRIBE` frame after every successful
/// connect, so each symbol is subscribed exactly once per connection cycle.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionSet {
    symbols: BTreeSet<SmolStr>,
}

impl SubscriptionSet {
    /// Track `symbol`, returning whether it was newly added.
    pub(crate) fn add(&mut self, symbol: SmolStr) -> bool {
        self.symbols.insert(symbol)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.symbols.len()
    }

    /// All stream names for the tracked set, three per symbol.
    pub(crate) fn stream_names(&self, interval: Interval) -> Vec<SmolStr> {
        self.symbols
            .iter()
            .flat_map(|symbol| symbol_stream_names(symbol, interval))
            .collect()
    }
}

/// Long-running task owning the combined-stream connection.
///
/// Runs an outer reconnect loop: connect, replay the full subscription set,
/// then multiplex inbound frames with subscription commands until the
/// connection drops. Connect failures back off exponentially; a successful
/// connect resets the backoff. Returns only on [`Command::Stop`] or when the
/// command channel closes (the owning handle was dropped).
pub(crate) async fn connection_task(
    url: String,
    interval: Interval,
    ticks: Arc<RwLock<FnvHashMap<SmolStr, Tick>>>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    status_tx: watch::Sender<StreamStatus>,
    policy: ReconnectionBackoffPolicy,
) {
    let mut backoff_ms = policy.backoff_ms_initial;
    let mut subs = SubscriptionSet::default();
    let mut request_id: u64 = 0;

    loop {
        let _ = status_tx.send(StreamStatus::Connecting);

        let (mut ws_sink, mut ws_stream) = match connect_async(&url).await {
            Ok((websocket, _response)) => {
                backoff_ms = policy.backoff_ms_initial;
                websocket.split()
            }
            Err(error) => {
                warn!(%error, backoff_ms, "stream connect failed, backing off");
                let _ = status_tx.send(StreamStatus::Reconnecting);
                sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms =
                    (backoff_ms * u64::from(policy.backoff_multiplier)).min(policy.backoff_ms_max);
                continue;
            }
        };

        // Fold in any subscriptions queued while disconnected before replay.
        loop {
            match command_rx.try_recv() {
                Ok(Command::Subscribe(symbol)) => {
                    subs.add(symbol);
                }
                Ok(Command::Stop) | Err(TryRecvError::Disconnected) => {
                    let _ = status_tx.send(StreamStatus::Stopped);
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        // Replay the full known set in one frame.
        if !subs.is_empty() {
            request_id += 1;
            let frame = subscribe_message(&subs.stream_names(interval), request_id);
            debug!(symbols = subs.len(), "replaying subscriptions");
            if let Err(error) = ws_sink.send(Message::Text(frame)).await {
                // The dead socket surfaces again in the frame loop below.
                warn!(%error, "failed to replay subscriptions");
            }
        }

        let _ = status_tx.send(StreamStatus::Open);

        'connected: loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(Command::Subscribe(symbol)) => {
                        if subs.add(symbol.clone()) {
                            request_id += 1;
                            let frame = subscribe_message(
                                &symbol_stream_names(&symbol, interval),
                                request_id,
                            );
                            if let Err(error) = ws_sink.send(Message::Text(frame)).await {
                                warn!(%error, %symbol, "failed to send subscribe");
                                break 'connected;
                            }
                        }
                    }
                    Some(Command::Stop) | None => {
                        let _ = status_tx.send(StreamStatus::Stopped);
                        return;
                    }
                },
                frame = ws_stream.next() => match frame {
                    Some(Ok(Message::Text(payload))) => {
                        if let Err(error) = apply_message(&ticks, &payload) {
                            warn!(%error, "failed to apply stream frame");
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        ws_sink.send(Message::Pong(payload)).await.ok();
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "stream closed by upstream");
                        break 'connected;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        warn!(%error, "websocket error");
                        break 'connected;
                    }
                    None => break 'connected,
                },
            }
        }

        info!("stream disconnected, reconnecting");
        let _ = status_tx.send(StreamStatus::Reconnecting);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_set_deduplicates() {
        let mut subs = SubscriptionSet::default();

        assert!(subs.add(SmolStr::new("btcusdt")));
        assert!(!subs.add(SmolStr::new("btcusdt")));
        assert!(subs.add(SmolStr::new("ethusdt")));
        assert_eq!(subs.len(), 2);
    }

    #[test]
    fn test_subscription_set_stream_names_are_ordered_and_complete() {
        let mut subs = SubscriptionSet::default();
        subs.add(SmolStr::new("ethusdt"));
        subs.add(SmolStr::new("btcusdt"));

        let names = subs.stream_names(Interval::M1);
        assert_eq!(
            names,
            vec![
                SmolStr::new("btcusdt@ticker"),
                SmolStr::new("btcusdt@depth10"),
                SmolStr::new("btcusdt@kline_1m"),
                SmolStr::new("ethusdt@ticker"),
                SmolStr::new("ethusdt@depth10"),
                SmolStr::new("ethusdt@kline_1m"),
            ]
        );
    }

    #[test]
    fn test_subscription_set_empty() {
        let subs = SubscriptionSet::default();
        assert!(subs.is_empty());
        assert!(subs.stream_names(Interval::M1).is_empty());
    }
}
