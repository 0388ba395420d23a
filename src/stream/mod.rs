//! Market data streaming client
//!
//! Maintains one subscription to the Kraken Futures websocket feed,
//! redialing and resubscribing when the peer drops the connection.

mod client;
mod types;

pub use client::StreamClient;
pub use types::{
    Candle, FeedMessage, FeedSubscription, StreamConfig, StreamError, SubscribeRequest,
    KRAKEN_FUTURES_WS_URL, ONE_MINUTE_CANDLES_FEED,
};
