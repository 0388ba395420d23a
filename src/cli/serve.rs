//! Serve command implementation

use crate::config::Config;
use crate::gateway::{self, AppState};
use crate::monitor::StopLossTakeProfit;
use crate::pipeline::CandleAnalyzer;
use crate::store::MemoryStore;
use crate::stream::StreamClient;
use clap::Args;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the configured bind address
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
}

impl ServeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());
        for user in &config.users {
            store
                .register_user(user.id, user.token.clone(), user.credentials())
                .await;
        }
        if config.users.is_empty() {
            tracing::warn!("No users configured, every request will be rejected");
        }

        let stream = StreamClient::new(config.stream.client_config());
        let trader = Arc::new(StopLossTakeProfit::new(CandleAnalyzer::new(stream)));

        let http = reqwest::Client::builder()
            .timeout(config.exchange.request_timeout())
            .build()?;

        let state = AppState::with_store(http, config.exchange.api_url.clone(), trader, store);

        let bind = self.bind.unwrap_or(config.server.bind);
        let listener = TcpListener::bind(bind).await?;

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
            }
            signal.cancel();
        });

        tracing::info!(
            users = config.users.len(),
            exchange = %config.exchange.api_url,
            stream = %config.stream.ws_url,
            "Starting trade-bot"
        );
        gateway::serve(listener, state, shutdown).await
    }
}
