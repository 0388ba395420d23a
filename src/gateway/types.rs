//! Gateway messages and errors

use crate::monitor::{DetailsError, TradingDetails};
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const START_TRADING_EVENT: &str = "start_trading";
pub const CANCEL_TRADING_EVENT: &str = "cancel_trading";
pub const CANCELLED_MESSAGE: &str = "trading have been canceled";

/// First message of a trading session
#[derive(Debug, Clone, Deserialize)]
pub struct StartTradingCommand {
    pub event: String,
    #[serde(default)]
    pub trading_details: Option<TradingDetails>,
}

/// Any control message sent while trading
#[derive(Debug, Clone, Deserialize)]
pub struct ControlMessage {
    #[serde(default)]
    pub event: String,
}

/// `{ "message": ... }` payload used for errors and notices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("user identity: missing bearer token")]
    MissingToken,
    #[error("user identity: unknown token")]
    UnknownToken,
    #[error("user identity: {0}")]
    Identity(#[source] StoreError),
    #[error("read start command: {0}")]
    Read(String),
    #[error("read start command: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("read start command: unexpected event '{0}', expected 'start_trading'")]
    UnexpectedEvent(String),
    #[error("read start command: trading details are required")]
    MissingDetails,
    #[error("validate trading details: {0}")]
    InvalidDetails(#[from] DetailsError),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingToken | GatewayError::UnknownToken | GatewayError::Identity(_) => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, %status, "Request rejected");
        }
        (status, Json(MessageResponse::new(self.to_string()))).into_response()
    }
}
