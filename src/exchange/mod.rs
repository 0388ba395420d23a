//! Exchange command client
//!
//! Signed order commands against the Kraken Futures REST API

mod client;
pub mod signing;
mod types;

pub use client::{Credentials, KrakenFuturesClient, KRAKEN_FUTURES_API_URL};
pub use types::{
    CancelAllOrdersArguments, CancelAllStatus, CancelOrderArguments, CancelStatus,
    CancelledOrder, CommandStatus, EditOrderArguments, EditStatus, ExchangeError, Order,
    OrderEvent, OrderSnapshot, OrderType, SendOrderArguments, SendStatus, Side, SignatureError,
    EXECUTION_EVENT,
};

use async_trait::async_trait;

/// Trait for order command implementations
#[async_trait]
pub trait OrdersManager: Send + Sync {
    /// Place a new order
    async fn send_order(&self, args: &SendOrderArguments) -> Result<SendStatus, ExchangeError>;
    /// Edit an open order
    async fn edit_order(&self, args: &EditOrderArguments) -> Result<EditStatus, ExchangeError>;
    /// Cancel one open order
    async fn cancel_order(&self, args: &CancelOrderArguments)
        -> Result<CancelStatus, ExchangeError>;
    /// Cancel all open orders, optionally for one symbol
    async fn cancel_all_orders(
        &self,
        args: &CancelAllOrdersArguments,
    ) -> Result<CancelAllStatus, ExchangeError>;
}
