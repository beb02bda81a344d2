use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tidemark_data::stream::ReconnectionBackoffPolicy;
use tidemark_data::{BinanceMarketStream, Interval, StreamStatus};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

type ServerSocket = WebSocketStream<TcpStream>;

/// Helper: bind a local listener and build the ws URL the client connects to.
/// Log output honours `RUST_LOG`.
async fn bind() -> (TcpListener, String) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/stream", listener.local_addr().unwrap());
    (listener, url)
}

/// Aggressive reconnect timings to keep tests fast.
fn fast_policy() -> ReconnectionBackoffPolicy {
    ReconnectionBackoffPolicy {
        backoff_ms_initial: 10,
        backoff_multiplier: 2,
        backoff_ms_max: 100,
    }
}

/// Accept one inbound connection and complete the WebSocket handshake.
async fn accept(listener: &TcpListener) -> ServerSocket {
    let (socket, _addr) = timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("timed out waiting for a connection")
        .unwrap();
    accept_async(socket).await.unwrap()
}

/// Read the next text frame, skipping control frames.
async fn next_text(server: &mut ServerSocket) -> String {
    loop {
        match timeout(Duration::from_secs(5), server.next())
            .await
            .expect("timed out waiting for a frame")
        {
            Some(Ok(Message::Text(text))) => return text,
            Some(Ok(_)) => continue,
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

/// Parse a SUBSCRIBE frame and return its stream names.
fn subscribe_params(frame: &str) -> Vec<String> {
    let value: serde_json::Value = serde_json::from_str(frame).unwrap();
    assert_eq!(value["method"], "SUBSCRIBE", "unexpected frame: {frame}");
    value["params"]
        .as_array()
        .unwrap()
        .iter()
        .map(|param| param.as_str().unwrap().to_string())
        .collect()
}

/// Poll `condition` until it holds or a generous deadline passes.
async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

fn ticker_frame(symbol: &str, last_price: &str) -> Message {
    Message::Text(
        json!({
            "stream": format!("{symbol}@ticker"),
            "data": {
                "e": "24hrTicker",
                "E": 1662494217000_i64,
                "s": symbol.to_uppercase(),
                "c": last_price,
                "o": "18900.0",
                "h": "19100.0",
                "l": "18800.0",
                "v": "1234.5",
                "q": "23456789.0"
            }
        })
        .to_string(),
    )
}

fn kline_frame(symbol: &str, closed: bool) -> Message {
    Message::Text(
        json!({
            "stream": format!("{symbol}@kline_1m"),
            "data": {
                "e": "kline",
                "E": 1662494280100_i64,
                "s": symbol.to_uppercase(),
                "k": {
                    "t": 1662494220000_i64,
                    "T": 1662494279999_i64,
                    "s": symbol.to_uppercase(),
                    "i": "1m",
                    "o": "19000.0",
                    "c": "19050.0",
                    "h": "19060.0",
                    "l": "18990.0",
                    "v": "100.0",
                    "n": 101,
                    "x": closed,
                    "q": "1903000.0",
                    "V": "40.0",
                    "Q": "761200.0"
                }
            }
        })
        .to_string(),
    )
}

// ---------------------------------------------------------------------------
// Test 1: symbols registered before the connection opens are replayed in one
// batched SUBSCRIBE frame
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_subscriptions_replayed_after_connect() {
    let (listener, url) = bind().await;
    let stream = BinanceMarketStream::connect_with(url, Interval::M1, fast_policy());

    stream.subscribe("BTCUSDT").unwrap();
    stream.subscribe("ETHUSDT").unwrap();

    let mut server = accept(&listener).await;
    let params = subscribe_params(&next_text(&mut server).await);

    assert_eq!(params.len(), 6, "three channels per symbol");
    for name in [
        "btcusdt@ticker",
        "btcusdt@depth10",
        "btcusdt@kline_1m",
        "ethusdt@ticker",
        "ethusdt@depth10",
        "ethusdt@kline_1m",
    ] {
        assert!(params.contains(&name.to_string()), "missing {name}");
    }

    stream.wait_for_open().await.unwrap();
    assert_eq!(stream.status(), StreamStatus::Open);
}

// ---------------------------------------------------------------------------
// Test 2: subscribing while open sends one frame per new symbol, and
// re-subscribing sends nothing
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_live_subscribe_sends_one_frame_per_new_symbol() {
    let (listener, url) = bind().await;
    let stream = BinanceMarketStream::connect_with(url, Interval::M1, fast_policy());

    let mut server = accept(&listener).await;
    stream.wait_for_open().await.unwrap();

    stream.subscribe("BTCUSDT").unwrap();
    let params = subscribe_params(&next_text(&mut server).await);
    let names: Vec<&str> = params.iter().map(String::as_str).collect();
    assert_eq!(
        names,
        ["btcusdt@ticker", "btcusdt@depth10", "btcusdt@kline_1m"]
    );

    // A duplicate subscribe is a no-op, so the next frame on the wire belongs
    // to the next new symbol.
    stream.subscribe("BTCUSDT").unwrap();
    stream.subscribe("ETHUSDT").unwrap();

    let params = subscribe_params(&next_text(&mut server).await);
    let names: Vec<&str> = params.iter().map(String::as_str).collect();
    assert_eq!(
        names,
        ["ethusdt@ticker", "ethusdt@depth10", "ethusdt@kline_1m"]
    );
}

// ---------------------------------------------------------------------------
// Test 3: ticker frames update the live snapshot
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_ticker_frames_update_snapshots() {
    let (listener, url) = bind().await;
    let stream = BinanceMarketStream::connect_with(url, Interval::M1, fast_policy());
    stream.subscribe("BTCUSDT").unwrap();

    let mut server = accept(&listener).await;
    let _replay = next_text(&mut server).await;

    server.send(ticker_frame("btcusdt", "19000.5")).await.unwrap();

    wait_until("the ticker to apply", || {
        stream
            .snapshot("BTCUSDT")
            .is_some_and(|tick| tick.last_price == 19000.5)
    })
    .await;

    let tick = stream.snapshot("BTCUSDT").unwrap();
    assert_eq!(tick.symbol, "btcusdt");
    assert_eq!(tick.open_price, 18900.0);
    assert_eq!(tick.high_price, 19100.0);
    assert_eq!(tick.low_price, 18800.0);
    assert_eq!(tick.volume, 1234.5);
    assert_eq!(tick.turnover, 23456789.0);
    assert_eq!(tick.exchange_time.timestamp_millis(), 1662494217000);

    // Snapshot lookup normalises case the same way subscribe does.
    assert!(stream.snapshot("btcusdt").is_some());
    assert_eq!(stream.snapshot_all().len(), 1);
}

// ---------------------------------------------------------------------------
// Test 4: depth overwrites levels in place; only closed candles attach
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_depth_and_candle_frames() {
    let (listener, url) = bind().await;
    let stream = BinanceMarketStream::connect_with(url, Interval::M1, fast_policy());
    stream.subscribe("BTCUSDT").unwrap();

    let mut server = accept(&listener).await;
    let _replay = next_text(&mut server).await;

    let depth = Message::Text(
        json!({
            "stream": "btcusdt@depth10",
            "data": {
                "lastUpdateId": 160,
                "bids": [["19000.0", "1.5"], ["18999.5", "2.0"]],
                "asks": [["19000.5", "0.7"]]
            }
        })
        .to_string(),
    );
    server.send(depth).await.unwrap();

    wait_until("the depth snapshot to apply", || {
        stream
            .snapshot("BTCUSDT")
            .is_some_and(|tick| tick.bids[0].price == 19000.0)
    })
    .await;

    let tick = stream.snapshot("BTCUSDT").unwrap();
    assert_eq!(tick.bids[1].volume, 2.0);
    assert_eq!(tick.asks[0].price, 19000.5);
    assert_eq!(tick.bids[2].price, 0.0, "absent levels stay zeroed");

    // An update for a still-open candle must not attach; frames apply in
    // order, so once the follow-up ticker lands the candle was processed.
    server.send(kline_frame("btcusdt", false)).await.unwrap();
    server.send(ticker_frame("btcusdt", "19010.0")).await.unwrap();
    wait_until("the ticker after the open candle", || {
        stream
            .snapshot("BTCUSDT")
            .is_some_and(|tick| tick.last_price == 19010.0)
    })
    .await;
    assert!(stream.snapshot("BTCUSDT").unwrap().last_candle.is_none());

    server.send(kline_frame("btcusdt", true)).await.unwrap();
    wait_until("the closed candle to attach", || {
        stream
            .snapshot("BTCUSDT")
            .is_some_and(|tick| tick.last_candle.is_some())
    })
    .await;

    let candle = stream.snapshot("BTCUSDT").unwrap().last_candle.unwrap();
    assert_eq!(candle.interval, Interval::M1);
    assert_eq!(candle.close, 19050.0);
    assert_eq!(candle.exchange_time.timestamp_millis(), 1662494220000);
}

// ---------------------------------------------------------------------------
// Test 5: malformed frames and unknown symbols never kill the connection
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_bad_frames_are_isolated() {
    let (listener, url) = bind().await;
    let stream = BinanceMarketStream::connect_with(url, Interval::M1, fast_policy());
    stream.subscribe("BTCUSDT").unwrap();

    let mut server = accept(&listener).await;
    let _replay = next_text(&mut server).await;

    server
        .send(Message::Text("not json at all".to_string()))
        .await
        .unwrap();
    server.send(ticker_frame("ethusdt", "1.0")).await.unwrap();
    server.send(ticker_frame("btcusdt", "19000.5")).await.unwrap();

    // The valid frame after the two bad ones still applies.
    wait_until("the valid ticker to apply", || {
        stream
            .snapshot("BTCUSDT")
            .is_some_and(|tick| tick.last_price == 19000.5)
    })
    .await;
    assert_eq!(stream.status(), StreamStatus::Open);
}

// ---------------------------------------------------------------------------
// Test 6: a dropped connection is re-established and the full subscription
// set is replayed
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_reconnect_replays_subscriptions() {
    let (listener, url) = bind().await;
    let stream = BinanceMarketStream::connect_with(url, Interval::M1, fast_policy());
    stream.subscribe("BTCUSDT").unwrap();
    stream.subscribe("ETHUSDT").unwrap();

    let mut server = accept(&listener).await;
    assert_eq!(subscribe_params(&next_text(&mut server).await).len(), 6);
    stream.wait_for_open().await.unwrap();

    // Kill the connection without a close handshake.
    drop(server);

    let mut server = accept(&listener).await;
    let replay = subscribe_params(&next_text(&mut server).await);
    assert_eq!(replay.len(), 6, "full set replayed on reconnect");

    // Live state written before the drop survives, and new data still flows.
    server.send(ticker_frame("ethusdt", "1500.0")).await.unwrap();
    wait_until("data on the new connection", || {
        stream
            .snapshot("ETHUSDT")
            .is_some_and(|tick| tick.last_price == 1500.0)
    })
    .await;
}

// ---------------------------------------------------------------------------
// Test 7: stop terminates the task permanently
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_stop_terminates_stream() {
    let (listener, url) = bind().await;
    let stream = BinanceMarketStream::connect_with(url, Interval::M1, fast_policy());

    let _server = accept(&listener).await;
    stream.wait_for_open().await.unwrap();

    stream.stop();
    wait_until("the stream to stop", || {
        stream.status() == StreamStatus::Stopped
    })
    .await;

    // The handle stays usable for reads after the task is gone.
    assert!(stream.snapshot_all().is_empty());
}
