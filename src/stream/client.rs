//! Kraken Futures market data client with transparent reconnection

use super::types::{
    EventMessage, FeedMessage, FeedSubscription, RawFeedMessage, StreamConfig, StreamError,
    SubscribeRequest, MIN_PING_PERIOD,
};
use crate::telemetry::{increment_counter, CounterMetric};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the message and error channels; one in flight, like an unbuffered handoff
const CHANNEL_CAPACITY: usize = 1;

const INFO_EVENT: &str = "info";
const SUBSCRIBED_EVENT: &str = "subscribed";

/// Why a streaming connection stopped
enum Disconnect {
    Cancelled,
    ConsumerGone,
    Failed(StreamError),
}

/// Streaming client for one market data endpoint
#[derive(Debug, Clone)]
pub struct StreamClient {
    config: StreamConfig,
}

impl StreamClient {
    /// Create a new streaming client with the given configuration
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    /// Create a new client with just a URL using default config
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(StreamConfig::new(url))
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect, subscribe and stream the feed in a background task
    ///
    /// Connection failures during setup are returned directly. Once streaming,
    /// abnormal closures are redialed and resubscribed without closing the
    /// message channel. Any other failure closes the message channel and
    /// delivers one error on the error channel. Cancelling the token closes
    /// the connection and the message channel.
    pub async fn start_feed(
        &self,
        cancel: CancellationToken,
        feed: &str,
        product_ids: &[String],
    ) -> Result<FeedSubscription, StreamError> {
        let request = SubscribeRequest::new(feed, product_ids);

        let conn = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            result = connect(&self.config, &request) => result?,
        };

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (err_tx, err_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let config = self.config.clone();

        tokio::spawn(run_stream_loop(config, request, conn, tx, err_tx, cancel));

        Ok(FeedSubscription {
            messages: rx,
            errors: err_rx,
        })
    }
}

/// Stream until cancelled or a terminal failure, redialing on abnormal closure
async fn run_stream_loop(
    config: StreamConfig,
    request: SubscribeRequest,
    mut conn: WsStream,
    tx: mpsc::Sender<FeedMessage>,
    err_tx: mpsc::Sender<StreamError>,
    cancel: CancellationToken,
) {
    loop {
        match stream_messages(&config, conn, &tx, &cancel).await {
            Disconnect::Cancelled => {
                tracing::debug!(feed = %request.feed, "Feed cancelled, closing connection");
                return;
            }
            Disconnect::ConsumerGone => {
                tracing::debug!(feed = %request.feed, "Receiver dropped, closing connection");
                return;
            }
            Disconnect::Failed(e) if e.is_abnormal_closure() => {
                tracing::warn!(error = %e, feed = %request.feed, "Connection dropped, reconnecting");
                increment_counter(CounterMetric::StreamReconnects, &[]);

                let reconnected = tokio::select! {
                    _ = cancel.cancelled() => return,
                    result = connect(&config, &request) => result,
                };

                match reconnected {
                    Ok(next) => conn = next,
                    Err(e) => {
                        tracing::error!(error = %e, "Reconnect failed");
                        let _ = err_tx.try_send(StreamError::Reconnect(Box::new(e)));
                        return;
                    }
                }
            }
            Disconnect::Failed(e) => {
                tracing::error!(error = %e, feed = %request.feed, "Stream failed");
                let _ = err_tx.try_send(e);
                return;
            }
        }
    }
}

/// Read one connection until it stops
async fn stream_messages(
    config: &StreamConfig,
    conn: WsStream,
    tx: &mpsc::Sender<FeedMessage>,
    cancel: &CancellationToken,
) -> Disconnect {
    let (mut write, mut read) = conn.split();

    let mut ping_interval = tokio::time::interval(config.ping_period.max(MIN_PING_PERIOD));
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick completes immediately
    ping_interval.tick().await;

    let keepalive = sleep(config.pong_wait);
    tokio::pin!(keepalive);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return Disconnect::Cancelled;
            }

            _ = &mut keepalive => {
                return Disconnect::Failed(StreamError::KeepaliveTimeout);
            }

            _ = ping_interval.tick() => {
                if let Err(e) = write.send(Message::Ping(Vec::new())).await {
                    return Disconnect::Failed(StreamError::from(e));
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let message = match serde_json::from_str::<RawFeedMessage>(&text) {
                            Ok(raw) => raw.into_feed_message(),
                            // A bad record is a data error, not a broken connection
                            Err(e) => {
                                tracing::debug!(error = %e, "Undecodable feed message");
                                Some(FeedMessage::Error(StreamError::Decode(e).to_string()))
                            }
                        };

                        let Some(message) = message else {
                            continue;
                        };

                        let handoff_started = Instant::now();
                        tokio::select! {
                            _ = cancel.cancelled() => return Disconnect::Cancelled,
                            sent = tx.send(message) => {
                                if sent.is_err() {
                                    return Disconnect::ConsumerGone;
                                }
                            }
                        }

                        // Pongs are not read while the consumer is slow
                        let deadline = keepalive.deadline() + handoff_started.elapsed();
                        keepalive.as_mut().reset(deadline);
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        keepalive.as_mut().reset(Instant::now() + config.pong_wait);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.into_owned()))
                            .unwrap_or((1005, String::new()));
                        return Disconnect::Failed(StreamError::Closed { code, reason });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Disconnect::Failed(StreamError::from(e)),
                    None => {
                        return Disconnect::Failed(StreamError::ConnectionLost(
                            "stream ended unexpectedly".into(),
                        ));
                    }
                }
            }
        }
    }
}

/// Dial with retries, then subscribe on the established connection
async fn connect(config: &StreamConfig, request: &SubscribeRequest) -> Result<WsStream, StreamError> {
    let mut conn = establish_connection(config).await?;
    subscribe(config, &mut conn, request).await?;

    tracing::info!(
        url = %config.url,
        feed = %request.feed,
        products = ?request.product_ids,
        "Subscribed to feed"
    );
    Ok(conn)
}

async fn establish_connection(config: &StreamConfig) -> Result<WsStream, StreamError> {
    let mut delay = config.initial_dial_delay;

    for attempt in 1..=config.max_dial_attempts {
        match dial(config).await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                tracing::warn!(error = %e, attempt, url = %config.url, "Dial attempt failed");
            }
        }

        if attempt < config.max_dial_attempts {
            sleep(delay).await;
            delay = (delay * 2).min(config.max_dial_delay);
        }
    }

    Err(StreamError::UnableToConnect {
        attempts: config.max_dial_attempts,
    })
}

/// One dial: transport handshake plus the server's `info` event
async fn dial(config: &StreamConfig) -> Result<WsStream, StreamError> {
    tracing::debug!(url = %config.url, "Connecting to WebSocket");

    let (mut conn, _response) =
        connect_async_with_config(config.url.as_str(), Some(websocket_config(config)), false)
            .await
            .map_err(|e| StreamError::Dial(e.to_string()))?;

    let info: EventMessage = timeout(config.pong_wait, read_json(&mut conn))
        .await
        .map_err(|_| StreamError::KeepaliveTimeout)??;

    if info.event.as_deref() != Some(INFO_EVENT) {
        return Err(StreamError::Handshake(info.event));
    }

    Ok(conn)
}

async fn subscribe(
    config: &StreamConfig,
    conn: &mut WsStream,
    request: &SubscribeRequest,
) -> Result<(), StreamError> {
    let payload = serde_json::to_string(request)?;
    conn.send(Message::Text(payload))
        .await
        .map_err(|e| StreamError::Write(e.to_string()))?;

    let ack: EventMessage = timeout(config.pong_wait, read_json(conn))
        .await
        .map_err(|_| StreamError::Subscribe("no acknowledgment".to_string()))?
        .map_err(|e| StreamError::Subscribe(e.to_string()))?;

    match ack.event.as_deref() {
        Some(SUBSCRIBED_EVENT) => Ok(()),
        other => Err(StreamError::Subscribe(format!(
            "unexpected event {:?}: {}",
            other,
            ack.message.unwrap_or_default()
        ))),
    }
}

/// Read the next text message as JSON, skipping control frames
async fn read_json<T: DeserializeOwned>(conn: &mut WsStream) -> Result<T, StreamError> {
    loop {
        match conn.next().await {
            Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
            Some(Ok(Message::Close(frame))) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.into_owned()))
                    .unwrap_or((1005, String::new()));
                return Err(StreamError::Closed { code, reason });
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(StreamError::from(e)),
            None => return Err(StreamError::ConnectionLost("stream ended".into())),
        }
    }
}

fn websocket_config(config: &StreamConfig) -> WebSocketConfig {
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(config.max_message_size);
    ws_config.max_frame_size = Some(config.max_message_size);
    ws_config
}
