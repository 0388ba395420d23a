//! Market data stream types and configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// Kraken Futures public websocket endpoint
pub const KRAKEN_FUTURES_WS_URL: &str = "wss://futures.kraken.com/ws/v1";

/// One-minute trade candles feed
pub const ONE_MINUTE_CANDLES_FEED: &str = "candles_trade_1m";

/// Shortest ping interval; tokio rejects a zero period
pub(crate) const MIN_PING_PERIOD: Duration = Duration::from_millis(1);

/// Streaming client configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Dial attempts before the connection is declared unreachable
    pub max_dial_attempts: u32,
    /// Initial delay between dial attempts
    pub initial_dial_delay: Duration,
    /// Maximum delay between dial attempts
    pub max_dial_delay: Duration,
    /// Largest accepted message in bytes
    pub max_message_size: usize,
    /// Keepalive deadline, refreshed on every ping/pong from the peer
    pub pong_wait: Duration,
    /// Interval for sending ping frames
    pub ping_period: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: KRAKEN_FUTURES_WS_URL.to_string(),
            max_dial_attempts: 10,
            initial_dial_delay: Duration::from_millis(250),
            max_dial_delay: Duration::from_secs(5),
            max_message_size: 512 * 1024,
            pong_wait: Duration::from_secs(60),
            ping_period: Duration::from_secs(54),
        }
    }
}

impl StreamConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set maximum dial attempts
    pub fn max_dial_attempts(mut self, n: u32) -> Self {
        self.max_dial_attempts = n;
        self
    }

    /// Set initial and maximum delay between dial attempts
    pub fn dial_delay(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_dial_delay = initial;
        self.max_dial_delay = max;
        self
    }

    /// Set maximum message size
    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Set keepalive deadline
    pub fn pong_wait(mut self, d: Duration) -> Self {
        self.pong_wait = d;
        self
    }

    /// Set ping interval, never shorter than one millisecond
    pub fn ping_period(mut self, d: Duration) -> Self {
        self.ping_period = d.max(MIN_PING_PERIOD);
        self
    }
}

/// One OHLCV price bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start; milliseconds on the wire, unix seconds after normalization
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub open: String,
    #[serde(default)]
    pub high: String,
    #[serde(default)]
    pub low: String,
    #[serde(default)]
    pub close: String,
    /// Fractional on linear contracts
    #[serde(default)]
    pub volume: Decimal,
}

/// A message delivered by the streaming client
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    Data(Candle),
    Error(String),
}

/// Subscribe command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub event: String,
    pub feed: String,
    pub product_ids: Vec<String>,
}

impl SubscribeRequest {
    pub fn new(feed: impl Into<String>, product_ids: &[String]) -> Self {
        Self {
            event: "subscribe".to_string(),
            feed: feed.into(),
            product_ids: product_ids.to_vec(),
        }
    }
}

/// Control message: handshake info or subscription acknowledgment
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct EventMessage {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub feed: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Any message received while streaming
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawFeedMessage {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub feed: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub candle: Option<Candle>,
}

impl RawFeedMessage {
    /// Tag the message; snapshots, heartbeats and acks yield `None`
    pub fn into_feed_message(self) -> Option<FeedMessage> {
        let is_error =
            self.feed.as_deref() == Some("error") || self.event.as_deref() == Some("error");
        if is_error {
            let reason = self
                .message
                .unwrap_or_else(|| "error feed sent".to_string());
            return Some(FeedMessage::Error(reason));
        }

        self.candle.map(FeedMessage::Data)
    }
}

/// Output of a started feed
#[derive(Debug)]
pub struct FeedSubscription {
    /// Tagged feed messages; closed when the stream terminates
    pub messages: mpsc::Receiver<FeedMessage>,
    /// At most one terminal error
    pub errors: mpsc::Receiver<StreamError>,
}

/// Streaming client errors
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("dial: {0}")]
    Dial(String),
    #[error("handshake: expected info event, got {0:?}")]
    Handshake(Option<String>),
    #[error("unable to establish connect with kraken websocket after {attempts} attempts")]
    UnableToConnect { attempts: u32 },
    #[error("subscribe to feed: could not subscribe to feed: {0}")]
    Subscribe(String),
    #[error("unable to write message to websocket: {0}")]
    Write(String),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("connection closed: code {code}, reason '{reason}'")]
    Closed { code: u16, reason: String },
    #[error("message too large: {0}")]
    MessageTooLarge(String),
    #[error("keepalive deadline exceeded")]
    KeepaliveTimeout,
    #[error("decode message: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unable to read message from websocket: {0}")]
    Read(String),
    #[error("loop over ws: reconnect: {0}")]
    Reconnect(#[source] Box<StreamError>),
    #[error("cancelled")]
    Cancelled,
}

impl StreamError {
    /// Whether the peer went away or the transport dropped without a close handshake
    pub fn is_abnormal_closure(&self) -> bool {
        match self {
            StreamError::ConnectionLost(_) => true,
            StreamError::Closed { code, .. } => {
                *code == u16::from(CloseCode::Away) || *code == u16::from(CloseCode::Abnormal)
            }
            _ => false,
        }
    }
}

impl From<tungstenite::Error> for StreamError {
    fn from(e: tungstenite::Error) -> Self {
        use std::io::ErrorKind;
        use tungstenite::error::ProtocolError;

        match e {
            tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
                StreamError::ConnectionLost(e.to_string())
            }
            tungstenite::Error::Io(ref io)
                if matches!(
                    io.kind(),
                    ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionAborted
                        | ErrorKind::UnexpectedEof
                        | ErrorKind::BrokenPipe
                ) =>
            {
                StreamError::ConnectionLost(e.to_string())
            }
            tungstenite::Error::Capacity(_) => StreamError::MessageTooLarge(e.to_string()),
            other => StreamError::Read(other.to_string()),
        }
    }
}
