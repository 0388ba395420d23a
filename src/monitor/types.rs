//! Trading session parameters and monitor errors

use crate::exchange::{OrderType, SendOrderArguments, Side};
use crate::stream::StreamError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters of one trading session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingDetails {
    pub order_type: OrderType,
    pub symbol: String,
    pub side: Side,
    pub size: u32,
    pub stop_loss_border: Decimal,
    pub take_profit_border: Decimal,
    #[serde(skip)]
    buy_price: Option<Decimal>,
}

impl TradingDetails {
    pub fn new(
        order_type: OrderType,
        symbol: impl Into<String>,
        side: Side,
        size: u32,
        stop_loss_border: Decimal,
        take_profit_border: Decimal,
    ) -> Self {
        Self {
            order_type,
            symbol: symbol.into(),
            side,
            size,
            stop_loss_border,
            take_profit_border,
            buy_price: None,
        }
    }

    /// Check required fields and bounds
    pub fn validate(&self) -> Result<(), DetailsError> {
        if self.symbol.trim().is_empty() {
            return Err(DetailsError::MissingSymbol);
        }
        if self.size == 0 {
            return Err(DetailsError::ZeroSize);
        }
        if self.stop_loss_border < Decimal::ZERO {
            return Err(DetailsError::NegativeBorder("stop_loss_border"));
        }
        if self.take_profit_border < Decimal::ZERO {
            return Err(DetailsError::NegativeBorder("take_profit_border"));
        }
        Ok(())
    }

    /// Fill price of the opening order, once known
    pub fn buy_price(&self) -> Option<Decimal> {
        self.buy_price
    }

    /// Record the opening fill price; fails once a price is recorded
    pub fn record_buy_price(&mut self, price: Decimal) -> Result<(), DetailsError> {
        if self.buy_price.is_some() {
            return Err(DetailsError::BuyPriceRecorded);
        }
        self.buy_price = Some(price);
        Ok(())
    }

    /// Arguments of the order that opens the position
    pub fn opening_order(&self) -> SendOrderArguments {
        SendOrderArguments::new(self.order_type, self.symbol.clone(), self.side, self.size)
    }
}

/// Invalid trading details
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetailsError {
    #[error("symbol is required")]
    MissingSymbol,
    #[error("size must be greater than zero")]
    ZeroSize,
    #[error("{0} must not be negative")]
    NegativeBorder(&'static str),
    #[error("buy price already recorded")]
    BuyPriceRecorded,
}

/// Price monitor errors
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("start analyzing: look for candles: {0}")]
    Stream(#[from] StreamError),
    #[error("start analyzing: unable to parse close price '{close}': {source}")]
    InvalidPrice {
        close: String,
        #[source]
        source: rust_decimal::Error,
    },
    #[error("start analyzing: unable to get candles")]
    StreamExhausted,
    #[error("start analyzing: buy price is not recorded")]
    MissingBuyPrice,
}
