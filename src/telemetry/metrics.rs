//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Counter metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMetric {
    /// Candles discarded by the normalization pipeline
    CandlesDropped,
    /// Order commands sent to the exchange
    OrdersSent,
    /// Transparent stream reconnections
    StreamReconnects,
    /// Finished trading sessions
    TradingSessions,
}

impl CounterMetric {
    pub fn name(self) -> &'static str {
        match self {
            CounterMetric::CandlesDropped => "tradebot_candles_dropped_total",
            CounterMetric::OrdersSent => "tradebot_orders_sent_total",
            CounterMetric::StreamReconnects => "tradebot_stream_reconnects_total",
            CounterMetric::TradingSessions => "tradebot_trading_sessions_total",
        }
    }
}

/// Increment a counter by one
pub fn increment_counter(metric: CounterMetric, labels: &[(&'static str, String)]) {
    ::metrics::counter!(metric.name(), labels).increment(1);
}

/// Install the Prometheus recorder and serve `/metrics` on the given port
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}
