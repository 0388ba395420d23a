//! Order orchestrator: open, monitor, close

use super::types::{SendOrderError, TradeOutcome, TradingError};
use crate::exchange::{Order, OrdersManager, SendOrderArguments};
use crate::monitor::{Trader, TradingDetails};
use crate::store::{OrderStore, StoreError};
use crate::telemetry::{increment_counter, CounterMetric};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs trading sessions for one exchange account
#[derive(Clone)]
pub struct TradingService {
    orders: Arc<dyn OrdersManager>,
    trader: Arc<dyn Trader>,
    store: Arc<dyn OrderStore>,
}

impl TradingService {
    pub fn new(
        orders: Arc<dyn OrdersManager>,
        trader: Arc<dyn Trader>,
        store: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            orders,
            trader,
            store,
        }
    }

    /// Send an order, build the executed order from its fill and persist it
    pub async fn send_order(
        &self,
        user_id: i64,
        args: &SendOrderArguments,
    ) -> Result<Order, SendOrderError> {
        let status = self.orders.send_order(args).await?;
        let order = status.executed_order(user_id)?;
        self.store.create_order(user_id, &order).await?;

        tracing::info!(
            user_id,
            order_id = %order.id,
            symbol = %order.symbol,
            side = order.side.as_str(),
            price = %order.price,
            "Order executed"
        );
        Ok(order)
    }

    /// Orders previously executed for a user
    pub async fn user_orders(&self, user_id: i64) -> Result<Vec<Order>, StoreError> {
        self.store.user_orders(user_id).await
    }

    /// Open a position, wait for an exit signal, then close it
    pub async fn start_trading(
        &self,
        cancel: CancellationToken,
        user_id: i64,
        mut details: TradingDetails,
    ) -> Result<TradeOutcome, TradingError> {
        let outcome = self.run_session(cancel, user_id, &mut details).await;

        let label = match &outcome {
            Ok(TradeOutcome::Completed(_)) => "completed",
            Ok(TradeOutcome::Cancelled) => "cancelled",
            Err(_) => "failed",
        };
        increment_counter(
            CounterMetric::TradingSessions,
            &[("outcome", label.to_string())],
        );

        outcome
    }

    async fn run_session(
        &self,
        cancel: CancellationToken,
        user_id: i64,
        details: &mut TradingDetails,
    ) -> Result<TradeOutcome, TradingError> {
        if cancel.is_cancelled() {
            return Ok(TradeOutcome::Cancelled);
        }

        let open_args = details.opening_order();
        let opening = self
            .send_order(user_id, &open_args)
            .await
            .map_err(TradingError::OpenOrder)?;

        let buy_time = DateTime::parse_from_rfc3339(&opening.timestamp)
            .map_err(|source| TradingError::BuyTimestamp {
                timestamp: opening.timestamp.clone(),
                source,
            })?
            .with_timezone(&Utc);
        details.record_buy_price(opening.price)?;

        tracing::info!(
            user_id,
            symbol = %details.symbol,
            buy_price = %opening.price,
            %buy_time,
            "Position opened, monitoring price"
        );

        let monitor_cancel = cancel.child_token();
        // Stops the candle stream as soon as monitoring returns
        let _stream_guard = monitor_cancel.clone().drop_guard();

        if let Err(e) = self
            .trader
            .start_analyzing(monitor_cancel, buy_time, details)
            .await
        {
            if cancel.is_cancelled() {
                tracing::info!(user_id, symbol = %details.symbol, "Trading cancelled, position left open");
                return Ok(TradeOutcome::Cancelled);
            }
            return Err(e.into());
        }

        let closing = self
            .send_order(user_id, &open_args.opposite())
            .await
            .map_err(TradingError::CloseOrder)?;

        Ok(TradeOutcome::Completed(closing))
    }
}
