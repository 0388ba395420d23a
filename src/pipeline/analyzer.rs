//! Candle analyzer: streaming client plus normalization stages

use super::stages::{classify, correct_time, dedup, ErrorSink, ERROR_CAPACITY};
use super::types::PipelineError;
use super::CandleSource;
use crate::stream::{Candle, FeedMessage, FeedSubscription, StreamClient, StreamError};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Produces normalized candles from the exchange feed
#[derive(Debug, Clone)]
pub struct CandleAnalyzer {
    client: StreamClient,
}

impl CandleAnalyzer {
    pub fn new(client: StreamClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandleSource for CandleAnalyzer {
    async fn look_for_candles(
        &self,
        cancel: CancellationToken,
        feed: &str,
        product_ids: &[String],
    ) -> Result<mpsc::Receiver<Candle>, StreamError> {
        let FeedSubscription { messages, errors } =
            self.client.start_feed(cancel, feed, product_ids).await?;

        spawn_stream_error_logger(errors);

        let (err_tx, err_rx) = mpsc::channel(ERROR_CAPACITY);
        spawn_error_logger(err_rx);

        Ok(normalize(messages, ErrorSink::new(err_tx)))
    }
}

/// Chain classify, dedup and time correction over a feed
pub fn normalize(messages: mpsc::Receiver<FeedMessage>, errors: ErrorSink) -> mpsc::Receiver<Candle> {
    let candles = classify(messages, errors.clone());
    let unique = dedup(candles);
    correct_time(unique, errors)
}

/// Log dropped candles until every sink is gone
pub fn spawn_error_logger(mut errors: mpsc::Receiver<PipelineError>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(e) = errors.recv().await {
            tracing::warn!(error = %e, reason = e.reason(), "Candle dropped");
        }
    })
}

fn spawn_stream_error_logger(mut errors: mpsc::Receiver<StreamError>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(e) = errors.recv().await {
            tracing::error!(error = %e, "Candle stream terminated");
        }
    })
}
