//! Candle normalization pipeline
//!
//! Turns raw feed messages into a stream of candles with strictly
//! increasing unix-second timestamps. Error messages and candles whose
//! timestamps cannot be corrected are reported on a side channel.

mod analyzer;
mod stages;
mod types;

pub use analyzer::{normalize, spawn_error_logger, CandleAnalyzer};
pub use stages::{
    classify, correct_candle_time, correct_time, dedup, ErrorSink, ERROR_CAPACITY, STAGE_CAPACITY,
};
pub use types::PipelineError;

use crate::stream::{Candle, StreamError};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Trait for normalized candle sources
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Subscribe to a feed and return its normalized candles
    ///
    /// The channel closes when the stream terminates or `cancel` fires.
    async fn look_for_candles(
        &self,
        cancel: CancellationToken,
        feed: &str,
        product_ids: &[String],
    ) -> Result<mpsc::Receiver<Candle>, StreamError>;
}
