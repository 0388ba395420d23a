//! Orchestrator outcome and error types

use crate::exchange::{ExchangeError, Order};
use crate::monitor::{DetailsError, MonitorError};
use crate::store::StoreError;
use thiserror::Error;

/// How a trading session ended without failing
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    /// Position opened and closed; carries the closing order
    Completed(Order),
    /// Session cancelled by the trader; any open position stays open
    Cancelled,
}

/// Send-and-persist errors
#[derive(Debug, Error)]
pub enum SendOrderError {
    #[error("send order: {0}")]
    Exchange(#[from] ExchangeError),
    #[error("send order: {0}")]
    Store(#[from] StoreError),
}

/// Trading session errors, labelled by stage
#[derive(Debug, Error)]
pub enum TradingError {
    #[error("start trading: open position: {0}")]
    OpenOrder(#[source] SendOrderError),
    #[error("start trading: unable to parse buy time '{timestamp}': {source}")]
    BuyTimestamp {
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("start trading: {0}")]
    Details(#[from] DetailsError),
    #[error("start trading: {0}")]
    Monitor(#[from] MonitorError),
    #[error("start trading: close position: {0}")]
    CloseOrder(#[source] SendOrderError),
}
