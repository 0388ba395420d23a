//! Stop-loss / take-profit price monitor

use super::types::{MonitorError, TradingDetails};
use super::Trader;
use crate::pipeline::CandleSource;
use crate::stream::ONE_MINUTE_CANDLES_FEED;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

/// Watches one-minute candles until either threshold is crossed
#[derive(Debug, Clone)]
pub struct StopLossTakeProfit<S> {
    source: S,
}

impl<S: CandleSource> StopLossTakeProfit<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: CandleSource> Trader for StopLossTakeProfit<S> {
    async fn start_analyzing(
        &self,
        cancel: CancellationToken,
        buy_time: DateTime<Utc>,
        details: &TradingDetails,
    ) -> Result<(), MonitorError> {
        let buy_price = details.buy_price().ok_or(MonitorError::MissingBuyPrice)?;
        let take_profit = buy_price + details.take_profit_border;
        let stop_loss = buy_price - details.stop_loss_border;
        let buy_time_ms = buy_time.timestamp_millis();

        let mut candles = self
            .source
            .look_for_candles(cancel, ONE_MINUTE_CANDLES_FEED, &[details.symbol.clone()])
            .await?;

        while let Some(candle) = candles.recv().await {
            // Warm-up bars opened before the fill
            if candle.time.saturating_mul(1000) < buy_time_ms {
                continue;
            }

            let price = Decimal::from_str(&candle.close).map_err(|source| {
                MonitorError::InvalidPrice {
                    close: candle.close.clone(),
                    source,
                }
            })?;

            if price > take_profit {
                tracing::info!(
                    symbol = %details.symbol,
                    %price,
                    %buy_price,
                    threshold = %take_profit,
                    "Take profit reached"
                );
                return Ok(());
            }

            if price < stop_loss {
                tracing::info!(
                    symbol = %details.symbol,
                    %price,
                    %buy_price,
                    threshold = %stop_loss,
                    "Stop loss reached"
                );
                return Ok(());
            }

            tracing::trace!(symbol = %details.symbol, %price, "Price within borders");
        }

        Err(MonitorError::StreamExhausted)
    }
}
