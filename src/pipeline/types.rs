//! Pipeline error types

use std::num::ParseIntError;
use thiserror::Error;

/// Reasons a candle is dropped by the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("convert trade data to candle: error feed sent: {0}")]
    ErrorFeed(String),
    #[error("correct candle time: {0} has fewer than 10 digits")]
    ShortTime(i64),
    #[error("correct candle time: {0} is negative")]
    NegativeTime(i64),
    #[error("correct candle time: unable to parse '{text}': {source}")]
    ParseTime {
        text: String,
        #[source]
        source: ParseIntError,
    },
}

impl PipelineError {
    /// Metric label for the drop reason
    pub fn reason(&self) -> &'static str {
        match self {
            PipelineError::ErrorFeed(_) => "error_feed",
            PipelineError::ShortTime(_) => "short_time",
            PipelineError::NegativeTime(_) => "negative_time",
            PipelineError::ParseTime { .. } => "parse_time",
        }
    }
}
