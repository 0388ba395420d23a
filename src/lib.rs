//! trade-bot: stop-loss/take-profit trading bot for Kraken Futures
//!
//! This library provides the core components for:
//! - Signed order commands against the Kraken Futures REST API
//! - A reconnecting market data stream client
//! - Candle normalization (dedup, timestamp correction)
//! - Stop-loss/take-profit price monitoring
//! - Open/monitor/close trading sessions
//! - An HTTP and websocket gateway for traders
//! - Structured logging and Prometheus counters

pub mod cli;
pub mod config;
pub mod exchange;
pub mod gateway;
pub mod monitor;
pub mod pipeline;
pub mod store;
pub mod stream;
pub mod telemetry;
pub mod trading;
