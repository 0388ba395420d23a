//! Kraken Futures REST client for order commands

use super::signing;
use super::types::{
    CancelAllOrdersArguments, CancelAllOrdersResponse, CancelAllStatus, CancelOrderArguments,
    CancelOrderResponse, CancelStatus, CommandResponse, CommandStatus, EditOrderArguments,
    EditOrderResponse, EditStatus, ExchangeError, SendOrderArguments, SendOrderResponse,
    SendStatus,
};
use super::OrdersManager;
use crate::telemetry::{increment_counter, CounterMetric};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Kraken Futures API base URL
pub const KRAKEN_FUTURES_API_URL: &str = "https://futures.kraken.com";

const SEND_ORDER_ENDPOINT: &str = "/derivatives/api/v3/sendorder";
const EDIT_ORDER_ENDPOINT: &str = "/derivatives/api/v3/editorder";
const CANCEL_ORDER_ENDPOINT: &str = "/derivatives/api/v3/cancelorder";
const CANCEL_ALL_ORDERS_ENDPOINT: &str = "/derivatives/api/v3/cancelallorders";

const API_USER_AGENT: &str = concat!("trade-bot/", env!("CARGO_PKG_VERSION"));
const JSON_MEDIA_TYPE: &str = "application/json";

/// API key pair of one exchange account
#[derive(Clone)]
pub struct Credentials {
    pub public_key: String,
    /// Base64 encoded secret
    pub private_key: String,
}

impl Credentials {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Signed command client for one account
#[derive(Debug, Clone)]
pub struct KrakenFuturesClient {
    base_url: String,
    credentials: Credentials,
    client: Client,
}

impl KrakenFuturesClient {
    /// Create a client with its own HTTP connection pool
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ExchangeError::Client)?;

        Ok(Self::with_http(client, base_url, credentials))
    }

    /// Create a client sharing an existing HTTP connection pool
    pub fn with_http(client: Client, base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sign and execute a request against a private endpoint
    async fn query_private<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<T, ExchangeError> {
        let post_data = encode_params(params);
        let authent = signing::sign(&self.credentials.private_key, endpoint, &post_data, "")?;
        let url = format!("{}{}?{}", self.base_url, endpoint, post_data);

        tracing::debug!(endpoint, "Sending private request");

        let response = self
            .client
            .post(&url)
            .header("User-Agent", API_USER_AGENT)
            .header("APIKey", &self.credentials.public_key)
            .header("Authent", authent)
            .send()
            .await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(media_type)
            .unwrap_or_default();
        let body = response.text().await?;

        if content_type != JSON_MEDIA_TYPE {
            return Err(ExchangeError::InvalidContentType { content_type, body });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Execute a command and validate its envelope and status
    async fn command<R>(
        &self,
        command: &'static str,
        endpoint: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<R::Status, ExchangeError>
    where
        R: CommandResponse + DeserializeOwned,
    {
        let result = self
            .query_private::<R>(endpoint, params)
            .await
            .and_then(|response| validate(response.into_parts()));

        let outcome = if result.is_ok() { "ok" } else { "rejected" };
        increment_counter(
            CounterMetric::OrdersSent,
            &[("command", command.to_string()), ("outcome", outcome.to_string())],
        );

        if let Err(e) = &result {
            tracing::warn!(command, error = %e, "Exchange command failed");
        }

        result
    }
}

/// Apply envelope and status checks in order: exchange error field, then status
fn validate<S: CommandStatus>(
    (errors, status): (super::types::ErrorFields, Option<S>),
) -> Result<S, ExchangeError> {
    if let Some(error) = errors.error.filter(|e| !e.is_empty()) {
        return Err(ExchangeError::Exchange {
            error,
            server_time: errors.server_time.unwrap_or_default(),
            result: errors.result.unwrap_or_default(),
        });
    }

    let status = status.ok_or_else(|| ExchangeError::InvalidStatus("missing".to_string()))?;
    if !status.is_success() {
        return Err(ExchangeError::InvalidStatus(status.status().to_string()));
    }

    Ok(status)
}

/// Url-encode parameters with keys in sorted order
fn encode_params(mut params: Vec<(&'static str, String)>) -> String {
    params.sort_by(|a, b| a.0.cmp(b.0));
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

/// Media type without parameters, lowercased
fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[async_trait]
impl OrdersManager for KrakenFuturesClient {
    async fn send_order(&self, args: &SendOrderArguments) -> Result<SendStatus, ExchangeError> {
        let status = self
            .command::<SendOrderResponse>("send_order", SEND_ORDER_ENDPOINT, args.to_params())
            .await?;

        if status.order_events.is_empty() {
            return Err(ExchangeError::EmptyOrderEvents);
        }

        tracing::info!(
            symbol = %args.symbol,
            side = args.side.as_str(),
            size = args.size,
            status = %status.status,
            "Order sent"
        );
        Ok(status)
    }

    async fn edit_order(&self, args: &EditOrderArguments) -> Result<EditStatus, ExchangeError> {
        self.command::<EditOrderResponse>("edit_order", EDIT_ORDER_ENDPOINT, args.to_params())
            .await
    }

    async fn cancel_order(
        &self,
        args: &CancelOrderArguments,
    ) -> Result<CancelStatus, ExchangeError> {
        self.command::<CancelOrderResponse>("cancel_order", CANCEL_ORDER_ENDPOINT, args.to_params())
            .await
    }

    async fn cancel_all_orders(
        &self,
        args: &CancelAllOrdersArguments,
    ) -> Result<CancelAllStatus, ExchangeError> {
        self.command::<CancelAllOrdersResponse>(
            "cancel_all_orders",
            CANCEL_ALL_ORDERS_ENDPOINT,
            args.to_params(),
        )
        .await
    }
}
