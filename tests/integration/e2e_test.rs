//! End-to-end integration tests

use chrono::DateTime;
use futures_util::{SinkExt, StreamExt};
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use trade_bot::config::Config;
use trade_bot::exchange::{OrderType, Side};
use trade_bot::monitor::{MonitorError, StopLossTakeProfit, Trader, TradingDetails};
use trade_bot::pipeline::{CandleAnalyzer, CandleSource};
use trade_bot::stream::{StreamClient, StreamConfig, ONE_MINUTE_CANDLES_FEED};

const BUY_TIME: i64 = 1698765432;

#[test]
fn test_config_example_loads() {
    let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example")).unwrap();
    assert_eq!(config.stream.max_dial_attempts, 10);
    assert!(config.users.is_empty());
}

fn candle_message(time_ms: i64, close: &str) -> String {
    serde_json::json!({
        "feed": ONE_MINUTE_CANDLES_FEED,
        "product_id": "PI_XBTUSD",
        "candle": {
            "time": time_ms,
            "open": close,
            "high": close,
            "low": close,
            "close": close,
            "volume": 3
        }
    })
    .to_string()
}

/// Serve one subscription that replays `messages`, then idles
async fn spawn_feed(messages: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let messages = messages.clone();
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
                ws.send(Message::Text(r#"{"event":"info","version":1}"#.into()))
                    .await
                    .unwrap();

                let subscribe = ws.next().await.unwrap().unwrap();
                let subscribe: serde_json::Value =
                    serde_json::from_str(subscribe.to_text().unwrap()).unwrap();
                assert_eq!(subscribe["event"], "subscribe");

                ws.send(Message::Text(
                    r#"{"event":"subscribed","feed":"candles_trade_1m"}"#.into(),
                ))
                .await
                .unwrap();

                for m in messages {
                    if ws.send(Message::Text(m)).await.is_err() {
                        return;
                    }
                }
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    format!("ws://{addr}")
}

fn analyzer(url: String) -> CandleAnalyzer {
    let config = StreamConfig::new(url)
        .max_dial_attempts(2)
        .dial_delay(Duration::from_millis(5), Duration::from_millis(10));
    CandleAnalyzer::new(StreamClient::new(config))
}

fn details() -> TradingDetails {
    let mut details = TradingDetails::new(
        OrderType::Mkt,
        "PI_XBTUSD",
        Side::Buy,
        1,
        dec!(40),
        dec!(40),
    );
    details.record_buy_price(dec!(100)).unwrap();
    details
}

#[tokio::test]
async fn test_analyzer_normalizes_live_feed() {
    let url = spawn_feed(vec![
        candle_message(1698765420000, "100"),
        candle_message(1698765420000, "101"),
        r#"{"event":"error","message":"Invalid product id"}"#.to_string(),
        candle_message(1698765480000, "102"),
        candle_message(1698765360000, "99"),
        candle_message(1698765540000, "103"),
    ])
    .await;

    let cancel = CancellationToken::new();
    let mut candles = analyzer(url)
        .look_for_candles(cancel.clone(), ONE_MINUTE_CANDLES_FEED, &["PI_XBTUSD".to_string()])
        .await
        .unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let candle = tokio::time::timeout(Duration::from_secs(5), candles.recv())
            .await
            .unwrap()
            .unwrap();
        seen.push((candle.time, candle.close));
    }

    assert_eq!(
        seen,
        vec![
            (1698765420, "100".to_string()),
            (1698765480, "102".to_string()),
            (1698765540, "103".to_string()),
        ]
    );

    cancel.cancel();
    let closed = tokio::time::timeout(Duration::from_secs(5), candles.recv())
        .await
        .unwrap();
    assert!(closed.is_none());
}

#[tokio::test]
async fn test_monitor_over_live_feed_takes_profit() {
    let url = spawn_feed(vec![
        // Warm-up bar with a price that would otherwise trigger
        candle_message((BUY_TIME - 60) * 1000, "1000"),
        candle_message(BUY_TIME * 1000, "120"),
        // Duplicate bucket is dropped before the monitor sees it
        candle_message(BUY_TIME * 1000, "999"),
        candle_message((BUY_TIME + 60) * 1000, "150"),
    ])
    .await;

    let trader = StopLossTakeProfit::new(analyzer(url));
    let buy_time = DateTime::from_timestamp(BUY_TIME, 0).unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        trader.start_analyzing(CancellationToken::new(), buy_time, &details()),
    )
    .await
    .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_monitor_ends_when_cancelled() {
    let url = spawn_feed(vec![candle_message(BUY_TIME * 1000, "110")]).await;

    let trader = StopLossTakeProfit::new(analyzer(url));
    let buy_time = DateTime::from_timestamp(BUY_TIME, 0).unwrap();
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        })
    };

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        trader.start_analyzing(cancel.clone(), buy_time, &details()),
    )
    .await
    .unwrap();

    canceller.await.unwrap();
    assert!(matches!(result, Err(MonitorError::StreamExhausted)));
    assert!(cancel.is_cancelled());
}
