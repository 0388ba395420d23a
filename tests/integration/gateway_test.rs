//! Gateway integration tests against a mocked exchange

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use trade_bot::exchange::{Credentials, Order, Side};
use trade_bot::gateway::{self, AppState, MessageResponse, CANCELLED_MESSAGE};
use trade_bot::monitor::{MonitorError, Trader, TradingDetails};
use trade_bot::store::MemoryStore;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "token-1";
const PRIVATE_KEY: &str = "c2VjcmV0LWtleS1mb3ItdGVzdHM=";

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Signals immediately, or waits for cancellation
struct FakeTrader {
    wait_for_cancel: bool,
}

#[async_trait]
impl Trader for FakeTrader {
    async fn start_analyzing(
        &self,
        cancel: CancellationToken,
        _buy_time: DateTime<Utc>,
        _details: &TradingDetails,
    ) -> Result<(), MonitorError> {
        if self.wait_for_cancel {
            cancel.cancelled().await;
            return Err(MonitorError::StreamExhausted);
        }
        Ok(())
    }
}

fn executed(order_id: &str, side: &str, price: f64) -> serde_json::Value {
    json!({
        "result": "success",
        "serverTime": "2023-10-31T15:17:12.000Z",
        "sendStatus": {
            "order_id": order_id,
            "status": "placed",
            "orderEvents": [{
                "type": "EXECUTION",
                "price": price,
                "orderPriorExecution": {
                    "orderId": order_id,
                    "type": "mkt",
                    "symbol": "PI_XBTUSD",
                    "side": side,
                    "quantity": 1,
                    "filled": 0,
                    "timestamp": "2023-10-31T15:17:12.000Z",
                    "lastUpdateTimestamp": "2023-10-31T15:17:12.000Z"
                }
            }]
        }
    })
}

async fn mock_exchange() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/derivatives/api/v3/sendorder"))
        .and(query_param("side", "buy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(executed("open-1", "buy", 100.0)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/derivatives/api/v3/sendorder"))
        .and(query_param("side", "sell"))
        .respond_with(ResponseTemplate::new(200).set_body_json(executed("close-1", "sell", 150.0)))
        .mount(&server)
        .await;
    server
}

async fn spawn_gateway(exchange: &MockServer, trader: FakeTrader) -> (SocketAddr, CancellationToken) {
    let store = Arc::new(MemoryStore::new());
    store
        .register_user(1, TOKEN, Credentials::new("public-key", PRIVATE_KEY))
        .await;

    let state = AppState::with_store(
        reqwest::Client::new(),
        exchange.uri(),
        Arc::new(trader),
        store,
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(gateway::serve(listener, state, shutdown.clone()));

    (addr, shutdown)
}

async fn connect(addr: SocketAddr, token: Option<&str>) -> Result<Client, tungstenite::Error> {
    let mut request = format!("ws://{addr}/order-manager/ws/start-trade")
        .into_client_request()
        .unwrap();
    if let Some(token) = token {
        request
            .headers_mut()
            .insert("Authorization", format!("Bearer {token}").parse().unwrap());
    }
    tokio_tungstenite::connect_async(request)
        .await
        .map(|(ws, _)| ws)
}

fn start_command(size: u32) -> Message {
    Message::Text(
        json!({
            "event": "start_trading",
            "trading_details": {
                "order_type": "mkt",
                "symbol": "PI_XBTUSD",
                "side": "buy",
                "size": size,
                "stop_loss_border": 40,
                "take_profit_border": 40
            }
        })
        .to_string(),
    )
}

async fn next_text(ws: &mut Client) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for reply")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return text;
        }
    }
}

#[tokio::test]
async fn test_trading_session_completes() {
    let exchange = mock_exchange().await;
    let (addr, shutdown) = spawn_gateway(&exchange, FakeTrader { wait_for_cancel: false }).await;

    let mut ws = connect(addr, Some(TOKEN)).await.unwrap();
    ws.send(start_command(1)).await.unwrap();

    let order: Order = serde_json::from_str(&next_text(&mut ws).await).unwrap();
    assert_eq!(order.id, "close-1");
    assert_eq!(order.side, Side::Sell);
    assert_eq!(order.user_id, 1);

    let orders: serde_json::Value = reqwest::Client::new()
        .get(format!("http://{addr}/order-manager/my-orders"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<_> = orders["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["open-1", "close-1"]);

    shutdown.cancel();
}

#[tokio::test]
async fn test_trading_session_cancelled() {
    let exchange = mock_exchange().await;
    let (addr, shutdown) = spawn_gateway(&exchange, FakeTrader { wait_for_cancel: true }).await;

    let mut ws = connect(addr, Some(TOKEN)).await.unwrap();
    ws.send(start_command(1)).await.unwrap();
    ws.send(Message::Text(json!({ "event": "cancel_trading" }).to_string()))
        .await
        .unwrap();

    let reply: MessageResponse = serde_json::from_str(&next_text(&mut ws).await).unwrap();
    assert_eq!(reply.message, CANCELLED_MESSAGE);

    shutdown.cancel();
}

#[tokio::test]
async fn test_invalid_start_command_is_rejected() {
    let exchange = mock_exchange().await;
    let (addr, shutdown) = spawn_gateway(&exchange, FakeTrader { wait_for_cancel: false }).await;

    let mut ws = connect(addr, Some(TOKEN)).await.unwrap();
    ws.send(start_command(0)).await.unwrap();

    let reply: MessageResponse = serde_json::from_str(&next_text(&mut ws).await).unwrap();
    assert!(reply.message.contains("size must be greater than zero"));

    let received = exchange.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());

    shutdown.cancel();
}

#[tokio::test]
async fn test_upgrade_requires_token() {
    let exchange = mock_exchange().await;
    let (addr, shutdown) = spawn_gateway(&exchange, FakeTrader { wait_for_cancel: false }).await;

    match connect(addr, None).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("upgrade without token succeeded"),
    }

    match connect(addr, Some("wrong")).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("upgrade with unknown token succeeded"),
    }

    shutdown.cancel();
}

#[tokio::test]
async fn test_rest_send_order() {
    let exchange = mock_exchange().await;
    let (addr, shutdown) = spawn_gateway(&exchange, FakeTrader { wait_for_cancel: false }).await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("http://{addr}/order-manager/send-order"))
        .bearer_auth(TOKEN)
        .json(&json!({
            "order_type": "mkt",
            "symbol": "PI_XBTUSD",
            "side": "buy",
            "size": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let order: Order = response.json().await.unwrap();
    assert_eq!(order.id, "open-1");

    let response = http
        .post(format!("http://{addr}/order-manager/send-order"))
        .bearer_auth(TOKEN)
        .json(&json!({ "symbol": "PI_XBTUSD" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let reply: MessageResponse = response.json().await.unwrap();
    assert!(reply.message.starts_with("invalid request"));

    let response = http
        .get(format!("http://{addr}/order-manager/my-orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    shutdown.cancel();
}
