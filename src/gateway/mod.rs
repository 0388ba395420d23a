//! Interactive trading gateway
//!
//! HTTP and websocket surface for traders. Each websocket session runs one
//! start-trade flow under its own cancellation token.

mod auth;
mod handlers;
mod session;
mod types;

pub use auth::AuthenticatedUser;
pub use handlers::OrdersResponse;
pub use types::{
    ControlMessage, GatewayError, MessageResponse, StartTradingCommand, CANCELLED_MESSAGE,
    CANCEL_TRADING_EVENT, START_TRADING_EVENT,
};

use crate::exchange::{Credentials, KrakenFuturesClient};
use crate::monitor::Trader;
use crate::store::{KeyStore, OrderStore, SessionStore};
use crate::trading::TradingService;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Shared collaborators for all requests
#[derive(Clone)]
pub struct AppState {
    http: reqwest::Client,
    exchange_url: String,
    trader: Arc<dyn Trader>,
    orders: Arc<dyn OrderStore>,
    keys: Arc<dyn KeyStore>,
    sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(
        http: reqwest::Client,
        exchange_url: impl Into<String>,
        trader: Arc<dyn Trader>,
        orders: Arc<dyn OrderStore>,
        keys: Arc<dyn KeyStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            http,
            exchange_url: exchange_url.into(),
            trader,
            orders,
            keys,
            sessions,
        }
    }

    /// Use one store for orders, keys and sessions
    pub fn with_store<S>(
        http: reqwest::Client,
        exchange_url: impl Into<String>,
        trader: Arc<dyn Trader>,
        store: Arc<S>,
    ) -> Self
    where
        S: OrderStore + KeyStore + SessionStore + 'static,
    {
        Self::new(
            http,
            exchange_url,
            trader,
            store.clone(),
            store.clone(),
            store,
        )
    }

    /// Orchestrator bound to one user's exchange account
    pub fn trading_service(&self, credentials: Credentials) -> TradingService {
        let client =
            KrakenFuturesClient::with_http(self.http.clone(), self.exchange_url.clone(), credentials);
        TradingService::new(Arc::new(client), self.trader.clone(), self.orders.clone())
    }
}

/// Build the gateway router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/order-manager/send-order", post(handlers::send_order))
        .route("/order-manager/my-orders", get(handlers::my_orders))
        .route("/order-manager/ws/start-trade", get(session::start_trade))
        .with_state(state)
}

/// Serve the gateway until `shutdown` fires
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!(%addr, "Gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}
