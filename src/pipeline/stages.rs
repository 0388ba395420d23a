//! Pipeline stages: classify, dedup, correct time

use super::types::PipelineError;
use crate::stream::{Candle, FeedMessage};
use crate::telemetry::{increment_counter, CounterMetric};
use tokio::sync::mpsc;

/// Buffer between stages; one in flight
pub const STAGE_CAPACITY: usize = 1;

/// Buffer of the error side channel
pub const ERROR_CAPACITY: usize = 16;

/// Timestamps with this many digits are unix seconds
const UNIX_TIME_LEN: usize = 10;

/// Non-blocking sink for dropped-candle reports
#[derive(Debug, Clone)]
pub struct ErrorSink {
    tx: mpsc::Sender<PipelineError>,
}

impl ErrorSink {
    pub fn new(tx: mpsc::Sender<PipelineError>) -> Self {
        Self { tx }
    }

    /// Report an error without blocking the stage
    pub fn report(&self, err: PipelineError) {
        increment_counter(
            CounterMetric::CandlesDropped,
            &[("reason", err.reason().to_string())],
        );

        if let Err(e) = self.tx.try_send(err) {
            tracing::debug!(error = %e, "Error channel unavailable, report discarded");
        }
    }
}

/// Route error messages to the sink and forward candles
pub fn classify(mut input: mpsc::Receiver<FeedMessage>, errors: ErrorSink) -> mpsc::Receiver<Candle> {
    let (tx, rx) = mpsc::channel(STAGE_CAPACITY);

    tokio::spawn(async move {
        while let Some(message) = input.recv().await {
            match message {
                FeedMessage::Data(candle) => {
                    if tx.send(candle).await.is_err() {
                        return;
                    }
                }
                FeedMessage::Error(reason) => errors.report(PipelineError::ErrorFeed(reason)),
            }
        }
    });

    rx
}

/// Forward a candle only when its time is strictly greater than the last forwarded one
pub fn dedup(mut input: mpsc::Receiver<Candle>) -> mpsc::Receiver<Candle> {
    let (tx, rx) = mpsc::channel(STAGE_CAPACITY);

    tokio::spawn(async move {
        let mut last_time: Option<i64> = None;

        while let Some(candle) = input.recv().await {
            if last_time.is_some_and(|last| candle.time <= last) {
                continue;
            }

            last_time = Some(candle.time);
            if tx.send(candle).await.is_err() {
                return;
            }
        }
    });

    rx
}

/// Convert candle times to unix seconds, reporting candles that cannot be converted
pub fn correct_time(mut input: mpsc::Receiver<Candle>, errors: ErrorSink) -> mpsc::Receiver<Candle> {
    let (tx, rx) = mpsc::channel(STAGE_CAPACITY);

    tokio::spawn(async move {
        while let Some(mut candle) = input.recv().await {
            match correct_candle_time(candle.time) {
                Ok(time) => {
                    candle.time = time;
                    if tx.send(candle).await.is_err() {
                        return;
                    }
                }
                Err(e) => errors.report(e),
            }
        }
    });

    rx
}

/// Reduce a timestamp to its first ten decimal digits
///
/// Ten-digit values pass through unchanged. Shorter or negative values are rejected.
pub fn correct_candle_time(time: i64) -> Result<i64, PipelineError> {
    if time < 0 {
        return Err(PipelineError::NegativeTime(time));
    }

    let text = time.to_string();
    match text.len() {
        len if len < UNIX_TIME_LEN => Err(PipelineError::ShortTime(time)),
        UNIX_TIME_LEN => Ok(time),
        _ => {
            let truncated = &text[..UNIX_TIME_LEN];
            truncated
                .parse()
                .map_err(|source| PipelineError::ParseTime {
                    text: truncated.to_string(),
                    source,
                })
        }
    }
}
