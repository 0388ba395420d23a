//! Price monitor
//!
//! Decides when an open position should be closed.

mod stop_loss;
mod types;

pub use stop_loss::StopLossTakeProfit;
pub use types::{DetailsError, MonitorError, TradingDetails};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// Trait for exit-signal strategies
#[async_trait]
pub trait Trader: Send + Sync {
    /// Block until the position should be closed
    ///
    /// Returns `Ok(())` when a threshold is crossed. Candles opened before
    /// `buy_time` are ignored. `details` must carry the recorded buy price.
    async fn start_analyzing(
        &self,
        cancel: CancellationToken,
        buy_time: DateTime<Utc>,
        details: &TradingDetails,
    ) -> Result<(), MonitorError>;
}
