//! REST handlers

use super::auth::AuthenticatedUser;
use super::types::GatewayError;
use super::AppState;
use crate::exchange::{Order, SendOrderArguments};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

/// `POST /order-manager/send-order`
pub async fn send_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Result<Json<SendOrderArguments>, JsonRejection>,
) -> Result<Json<Order>, GatewayError> {
    let Json(args) = body.map_err(|e| GatewayError::BadRequest(e.body_text()))?;
    if args.symbol.trim().is_empty() || args.size == 0 {
        return Err(GatewayError::BadRequest(
            "symbol and a positive size are required".to_string(),
        ));
    }

    let service = state.trading_service(user.credentials);
    let order = service
        .send_order(user.id, &args)
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    Ok(Json(order))
}

/// `GET /order-manager/my-orders`
pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<OrdersResponse>, GatewayError> {
    let orders = state
        .orders
        .user_orders(user.id)
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    Ok(Json(OrdersResponse { orders }))
}
