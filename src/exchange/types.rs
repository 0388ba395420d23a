//! Kraken Futures command types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side that closes a position opened on this side
    pub fn inverted(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

/// Kraken Futures order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Limit order
    Lmt,
    /// Post-only limit order
    Post,
    /// Immediate-or-cancel order
    Ioc,
    /// Market order
    Mkt,
    /// Stop order
    Stp,
    /// Take profit order
    TakeProfit,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Lmt => "lmt",
            OrderType::Post => "post",
            OrderType::Ioc => "ioc",
            OrderType::Mkt => "mkt",
            OrderType::Stp => "stp",
            OrderType::TakeProfit => "take_profit",
        }
    }

    /// Whether the exchange honours `stopPrice` and `triggerSignal` for this type
    fn is_triggered(self) -> bool {
        matches!(self, OrderType::Stp | OrderType::TakeProfit)
    }
}

fn format_price(price: Decimal) -> String {
    format!("{:.2}", price)
}

/// Arguments for the `sendorder` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendOrderArguments {
    pub order_type: OrderType,
    pub symbol: String,
    pub side: Side,
    pub size: u32,
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    #[serde(default)]
    pub trigger_signal: Option<String>,
    #[serde(default)]
    pub cli_order_id: Option<String>,
    #[serde(default)]
    pub reduce_only: bool,
}

impl SendOrderArguments {
    /// Market-style order with only the required fields set
    pub fn new(order_type: OrderType, symbol: impl Into<String>, side: Side, size: u32) -> Self {
        Self {
            order_type,
            symbol: symbol.into(),
            side,
            size,
            limit_price: None,
            stop_price: None,
            trigger_signal: None,
            cli_order_id: None,
            reduce_only: false,
        }
    }

    /// Same order with the side inverted
    pub fn opposite(&self) -> Self {
        Self {
            side: self.side.inverted(),
            ..self.clone()
        }
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("orderType", self.order_type.as_str().to_string()),
            ("symbol", self.symbol.clone()),
            ("side", self.side.as_str().to_string()),
            ("size", self.size.to_string()),
        ];

        if let Some(limit_price) = self.limit_price {
            params.push(("limitPrice", format_price(limit_price)));
        }

        if self.order_type.is_triggered() {
            if let Some(stop_price) = self.stop_price {
                params.push(("stopPrice", format_price(stop_price)));
            }
            if let Some(signal) = &self.trigger_signal {
                params.push(("triggerSignal", signal.clone()));
            }
        }

        if let Some(cli_order_id) = &self.cli_order_id {
            params.push(("cliOrdId", cli_order_id.clone()));
        }

        if self.reduce_only {
            params.push(("reduceOnly", "true".to_string()));
        }

        params
    }
}

/// Arguments for the `editorder` endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditOrderArguments {
    pub order_id: String,
    pub size: Option<u32>,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub cli_order_id: Option<String>,
}

impl EditOrderArguments {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("orderId", self.order_id.clone())];
        if let Some(size) = self.size {
            params.push(("size", size.to_string()));
        }
        if let Some(limit_price) = self.limit_price {
            params.push(("limitPrice", format_price(limit_price)));
        }
        if let Some(stop_price) = self.stop_price {
            params.push(("stopPrice", format_price(stop_price)));
        }
        if let Some(cli_order_id) = &self.cli_order_id {
            params.push(("cliOrdId", cli_order_id.clone()));
        }
        params
    }
}

/// Arguments for the `cancelorder` endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CancelOrderArguments {
    pub order_id: Option<String>,
    pub cli_order_id: Option<String>,
}

impl CancelOrderArguments {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(order_id) = &self.order_id {
            params.push(("order_id", order_id.clone()));
        }
        if let Some(cli_order_id) = &self.cli_order_id {
            params.push(("cliOrdId", cli_order_id.clone()));
        }
        params
    }
}

/// Arguments for the `cancelallorders` endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CancelAllOrdersArguments {
    /// Restrict cancellation to one instrument
    pub symbol: Option<String>,
}

impl CancelAllOrdersArguments {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        self.symbol
            .iter()
            .map(|symbol| ("symbol", symbol.clone()))
            .collect()
    }
}

/// A status payload with an endpoint-specific set of accepted values
pub trait CommandStatus {
    /// Status values the endpoint reports on success
    const ACCEPTED: &'static [&'static str];

    fn status(&self) -> &str;

    fn is_success(&self) -> bool {
        Self::ACCEPTED.contains(&self.status())
    }
}

/// Error fields shared by every Kraken Futures response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorFields {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub server_time: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A response envelope carrying one status payload
pub trait CommandResponse {
    type Status: CommandStatus;

    fn into_parts(self) -> (ErrorFields, Option<Self::Status>);
}

/// Order snapshot as reported inside order events
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    #[serde(default)]
    pub order_id: String,
    #[serde(default, alias = "cliOrdID")]
    pub cli_ord_id: Option<String>,
    #[serde(default, rename = "type")]
    pub order_type: String,
    #[serde(default)]
    pub symbol: String,
    pub side: Option<Side>,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub filled: Decimal,
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    #[serde(default)]
    pub reduce_only: bool,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub last_update_timestamp: String,
}

/// One event in an order's lifecycle (placement, execution, edit, ...)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    #[serde(default, rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub order: Option<OrderSnapshot>,
    #[serde(default)]
    pub order_prior_execution: Option<OrderSnapshot>,
    #[serde(default)]
    pub order_prior_edit: Option<OrderSnapshot>,
}

/// Event type reported when an order fills
pub const EXECUTION_EVENT: &str = "EXECUTION";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendStatus {
    #[serde(default, rename = "order_id")]
    pub order_id: Option<String>,
    #[serde(default, alias = "cliOrdId")]
    pub cli_order_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub received_time: Option<String>,
    #[serde(default)]
    pub order_events: Vec<OrderEvent>,
}

impl CommandStatus for SendStatus {
    const ACCEPTED: &'static [&'static str] = &["placed", "cancelled"];

    fn status(&self) -> &str {
        &self.status
    }
}

impl SendStatus {
    /// Build the executed order from the first order event
    pub fn executed_order(&self, user_id: i64) -> Result<Order, ExchangeError> {
        let event = self
            .order_events
            .first()
            .ok_or(ExchangeError::EmptyOrderEvents)?;

        if event.event_type != EXECUTION_EVENT {
            return Err(ExchangeError::UnknownSendStatusType(
                event.event_type.clone(),
            ));
        }

        let prior = event
            .order_prior_execution
            .as_ref()
            .ok_or_else(|| ExchangeError::UnknownSendStatusType(event.event_type.clone()))?;
        let side = prior
            .side
            .ok_or_else(|| ExchangeError::UnknownSendStatusType("missing side".to_string()))?;
        let price = event
            .price
            .ok_or_else(|| ExchangeError::UnknownSendStatusType("missing price".to_string()))?;

        Ok(Order {
            id: prior.order_id.clone(),
            user_id,
            client_order_id: prior.cli_ord_id.clone().unwrap_or_default(),
            order_type: event.event_type.clone(),
            symbol: prior.symbol.clone(),
            quantity: prior.quantity,
            side,
            filled: prior.filled,
            timestamp: prior.timestamp.clone(),
            last_update_timestamp: prior.last_update_timestamp.clone(),
            price,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditStatus {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub cli_order_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub received_time: Option<String>,
    #[serde(default)]
    pub order_events: Vec<OrderEvent>,
}

impl CommandStatus for EditStatus {
    const ACCEPTED: &'static [&'static str] = &["edited"];

    fn status(&self) -> &str {
        &self.status
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelStatus {
    #[serde(default, rename = "order_id")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub cli_ord_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub received_time: Option<String>,
    #[serde(default)]
    pub order_events: Vec<OrderEvent>,
}

impl CommandStatus for CancelStatus {
    const ACCEPTED: &'static [&'static str] = &["cancelled"];

    fn status(&self) -> &str {
        &self.status
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledOrder {
    #[serde(default, rename = "order_id")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub cli_ord_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAllStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub received_time: Option<String>,
    #[serde(default)]
    pub cancel_only: Option<String>,
    #[serde(default)]
    pub cancelled_orders: Vec<CancelledOrder>,
    #[serde(default)]
    pub order_events: Vec<OrderEvent>,
}

impl CommandStatus for CancelAllStatus {
    const ACCEPTED: &'static [&'static str] = &["cancelled"];

    fn status(&self) -> &str {
        &self.status
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOrderResponse {
    #[serde(flatten)]
    pub errors: ErrorFields,
    #[serde(default)]
    pub send_status: Option<SendStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOrderResponse {
    #[serde(flatten)]
    pub errors: ErrorFields,
    #[serde(default)]
    pub edit_status: Option<EditStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderResponse {
    #[serde(flatten)]
    pub errors: ErrorFields,
    #[serde(default)]
    pub cancel_status: Option<CancelStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAllOrdersResponse {
    #[serde(flatten)]
    pub errors: ErrorFields,
    #[serde(default)]
    pub cancel_status: Option<CancelAllStatus>,
}

impl CommandResponse for SendOrderResponse {
    type Status = SendStatus;

    fn into_parts(self) -> (ErrorFields, Option<SendStatus>) {
        (self.errors, self.send_status)
    }
}

impl CommandResponse for EditOrderResponse {
    type Status = EditStatus;

    fn into_parts(self) -> (ErrorFields, Option<EditStatus>) {
        (self.errors, self.edit_status)
    }
}

impl CommandResponse for CancelOrderResponse {
    type Status = CancelStatus;

    fn into_parts(self) -> (ErrorFields, Option<CancelStatus>) {
        (self.errors, self.cancel_status)
    }
}

impl CommandResponse for CancelAllOrdersResponse {
    type Status = CancelAllStatus;

    fn into_parts(self) -> (ErrorFields, Option<CancelAllStatus>) {
        (self.errors, self.cancel_status)
    }
}

/// An executed order, as persisted and reported to traders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: i64,
    pub client_order_id: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub symbol: String,
    pub quantity: Decimal,
    pub side: Side,
    pub filled: Decimal,
    pub timestamp: String,
    pub last_update_timestamp: String,
    pub price: Decimal,
}

/// Request signing errors
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Private key is not valid base64
    #[error("decode private key: {0}")]
    InvalidKey(#[from] base64::DecodeError),
    /// Decoded key rejected by the MAC
    #[error("invalid mac key length")]
    KeyLength,
}

/// Command client errors
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("create signature: {0}")]
    Signature(#[from] SignatureError),
    #[error("build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("execute request: {0}")]
    Request(#[from] reqwest::Error),
    #[error(
        "invalid content type: response content-type is '{content_type}', \
         but should be 'application/json'; content: '{body}'"
    )]
    InvalidContentType { content_type: String, body: String },
    #[error("decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("exchange error: {error}, server time: {server_time}, result: {result}")]
    Exchange {
        error: String,
        server_time: String,
        result: String,
    },
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("validate send status: empty order events")]
    EmptyOrderEvents,
    #[error("unknown send status type: {0}")]
    UnknownSendStatusType(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn executed_status() -> SendStatus {
        serde_json::from_str(
            r#"{
                "order_id": "61ca5732-3478-42fe-8362-abbfd9465294",
                "status": "placed",
                "receivedTime": "2019-09-05T16:41:35.173Z",
                "orderEvents": [{
                    "type": "EXECUTION",
                    "price": 34567.5,
                    "amount": 1,
                    "executionId": "e1ec9f63-2338-4c44-b40a-43486c6732d7",
                    "orderPriorExecution": {
                        "orderId": "61ca5732-3478-42fe-8362-abbfd9465294",
                        "cliOrdId": "my-client-id",
                        "type": "ioc",
                        "symbol": "PI_XBTUSD",
                        "side": "buy",
                        "quantity": 1,
                        "filled": 0,
                        "limitPrice": 34567.5,
                        "reduceOnly": false,
                        "timestamp": "2019-09-05T16:41:35.173Z",
                        "lastUpdateTimestamp": "2019-09-05T16:41:35.173Z"
                    }
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_side_inverted() {
        assert_eq!(Side::Buy.inverted(), Side::Sell);
        assert_eq!(Side::Sell.inverted(), Side::Buy);
    }

    #[test]
    fn test_order_type_serde_names() {
        let parsed: OrderType = serde_json::from_str(r#""take_profit""#).unwrap();
        assert_eq!(parsed, OrderType::TakeProfit);
        assert_eq!(OrderType::Mkt.as_str(), "mkt");
    }

    #[test]
    fn test_send_args_required_params() {
        let args = SendOrderArguments::new(OrderType::Mkt, "PI_XBTUSD", Side::Buy, 10);
        let params = args.to_params();
        assert_eq!(
            params,
            vec![
                ("orderType", "mkt".to_string()),
                ("symbol", "PI_XBTUSD".to_string()),
                ("side", "buy".to_string()),
                ("size", "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_send_args_stop_price_only_for_triggered_types() {
        let mut args = SendOrderArguments::new(OrderType::Lmt, "PI_XBTUSD", Side::Sell, 1);
        args.limit_price = Some(dec!(100.5));
        args.stop_price = Some(dec!(99));
        args.trigger_signal = Some("mark".to_string());

        let params = args.to_params();
        assert!(params.contains(&("limitPrice", "100.50".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "stopPrice"));

        args.order_type = OrderType::Stp;
        let params = args.to_params();
        assert!(params.contains(&("stopPrice", "99.00".to_string())));
        assert!(params.contains(&("triggerSignal", "mark".to_string())));
    }

    #[test]
    fn test_send_args_opposite() {
        let mut args = SendOrderArguments::new(OrderType::Mkt, "PI_ETHUSD", Side::Buy, 3);
        args.reduce_only = true;
        let opposite = args.opposite();
        assert_eq!(opposite.side, Side::Sell);
        assert_eq!(opposite.symbol, args.symbol);
        assert_eq!(opposite.size, args.size);
        assert_eq!(opposite.order_type, args.order_type);
        assert!(opposite.reduce_only);
    }

    #[test]
    fn test_status_success_sets() {
        let mut status = SendStatus {
            status: "placed".to_string(),
            ..Default::default()
        };
        assert!(status.is_success());
        status.status = "cancelled".to_string();
        assert!(status.is_success());
        status.status = "insufficientAvailableFunds".to_string();
        assert!(!status.is_success());

        let edit = EditStatus {
            status: "edited".to_string(),
            ..Default::default()
        };
        assert!(edit.is_success());

        let cancel = CancelStatus {
            status: "notFound".to_string(),
            ..Default::default()
        };
        assert!(!cancel.is_success());
    }

    #[test]
    fn test_executed_order_from_fill() {
        let order = executed_status().executed_order(7).unwrap();
        assert_eq!(order.id, "61ca5732-3478-42fe-8362-abbfd9465294");
        assert_eq!(order.user_id, 7);
        assert_eq!(order.client_order_id, "my-client-id");
        assert_eq!(order.order_type, "EXECUTION");
        assert_eq!(order.symbol, "PI_XBTUSD");
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.quantity, dec!(1));
        assert_eq!(order.price, dec!(34567.5));
        assert_eq!(order.timestamp, "2019-09-05T16:41:35.173Z");
    }

    #[test]
    fn test_executed_order_requires_execution_event() {
        let mut status = executed_status();
        status.order_events[0].event_type = "PLACE".to_string();
        let err = status.executed_order(1).unwrap_err();
        assert!(matches!(err, ExchangeError::UnknownSendStatusType(t) if t == "PLACE"));
    }

    #[test]
    fn test_executed_order_requires_fill_price() {
        let mut status = executed_status();
        status.order_events[0].price = None;
        let err = status.executed_order(1).unwrap_err();
        assert!(matches!(err, ExchangeError::UnknownSendStatusType(t) if t == "missing price"));
    }

    #[test]
    fn test_executed_order_empty_events() {
        let status = SendStatus::default();
        assert!(matches!(
            status.executed_order(1),
            Err(ExchangeError::EmptyOrderEvents)
        ));
    }

    #[test]
    fn test_send_response_with_error_field() {
        let response: SendOrderResponse = serde_json::from_str(
            r#"{"result":"error","serverTime":"2019-09-05T16:41:35.173Z","error":"apiLimitExceeded"}"#,
        )
        .unwrap();
        let (errors, status) = response.into_parts();
        assert_eq!(errors.error.as_deref(), Some("apiLimitExceeded"));
        assert!(status.is_none());
    }
}
