//! Interactive trading session over a websocket

use super::auth::AuthenticatedUser;
use super::types::{
    ControlMessage, GatewayError, MessageResponse, StartTradingCommand, CANCELLED_MESSAGE,
    CANCEL_TRADING_EVENT, START_TRADING_EVENT,
};
use super::AppState;
use crate::monitor::TradingDetails;
use crate::trading::{TradeOutcome, TradingError};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Why the cancel listener stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerExit {
    CancelRequested,
    PeerGone,
}

/// `GET /order-manager/ws/start-trade`
pub async fn start_trade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ws: WebSocketUpgrade,
) -> Response {
    tracing::info!(user_id = user.id, "Trading session requested");
    ws.on_upgrade(move |socket| run_session(state, user, socket))
}

async fn run_session(state: AppState, user: AuthenticatedUser, socket: WebSocket) {
    let session_id = Uuid::new_v4();
    let span = tracing::info_span!("trading_session", %session_id, user_id = user.id);

    async move {
        let (mut sink, mut stream) = socket.split();

        let details = match read_start_command(&mut stream).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected start command");
                send_json(&mut sink, &MessageResponse::new(e.to_string())).await;
                let _ = sink.close().await;
                return;
            }
        };

        tracing::info!(
            symbol = %details.symbol,
            side = details.side.as_str(),
            size = details.size,
            "Trading started"
        );

        let cancel = CancellationToken::new();
        let listener = tokio::spawn(listen_for_cancel(stream, cancel.clone()).in_current_span());

        let service = state.trading_service(user.credentials);
        let result = service.start_trading(cancel.clone(), user.id, details).await;

        let peer_gone = if listener.is_finished() {
            matches!(listener.await, Ok(ListenerExit::PeerGone))
        } else {
            listener.abort();
            false
        };

        if peer_gone {
            log_outcome(&result);
            tracing::info!("Peer disconnected, result not delivered");
            return;
        }

        match &result {
            Ok(TradeOutcome::Completed(order)) => send_json(&mut sink, order).await,
            Ok(TradeOutcome::Cancelled) => {
                send_json(&mut sink, &MessageResponse::new(CANCELLED_MESSAGE)).await
            }
            Err(e) => send_json(&mut sink, &MessageResponse::new(e.to_string())).await,
        }
        log_outcome(&result);
        let _ = sink.close().await;
    }
    .instrument(span)
    .await
}

fn log_outcome(result: &Result<TradeOutcome, TradingError>) {
    match result {
        Ok(TradeOutcome::Completed(order)) => {
            tracing::info!(order_id = %order.id, price = %order.price, "Trading completed")
        }
        Ok(TradeOutcome::Cancelled) => tracing::info!("Trading cancelled"),
        Err(e) => tracing::error!(error = %e, "Trading failed"),
    }
}

/// Read exactly one message and turn it into validated trading details
pub(crate) async fn read_start_command<S>(stream: &mut S) -> Result<TradingDetails, GatewayError>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let text = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(Message::Binary(bytes))) => {
                break String::from_utf8(bytes).map_err(|e| GatewayError::Read(e.to_string()))?
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(other)) => {
                return Err(GatewayError::Read(format!(
                    "unexpected message type: {other:?}"
                )))
            }
            Some(Err(e)) => return Err(GatewayError::Read(e.to_string())),
            None => return Err(GatewayError::Read("connection closed".to_string())),
        }
    };

    parse_start_command(&text)
}

/// Parse and validate a start command
pub(crate) fn parse_start_command(text: &str) -> Result<TradingDetails, GatewayError> {
    let command: StartTradingCommand = serde_json::from_str(text)?;
    if command.event != START_TRADING_EVENT {
        return Err(GatewayError::UnexpectedEvent(command.event));
    }

    let details = command.trading_details.ok_or(GatewayError::MissingDetails)?;
    details.validate()?;
    Ok(details)
}

/// Watch the read half for a cancel command
async fn listen_for_cancel(
    mut stream: SplitStream<WebSocket>,
    cancel: CancellationToken,
) -> ListenerExit {
    let exit = wait_for_cancel(&mut stream).await;
    // A vanished peer also stops the session
    cancel.cancel();
    exit
}

async fn wait_for_cancel<S>(stream: &mut S) -> ListenerExit
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ControlMessage>(&text) {
                Ok(control) if control.event == CANCEL_TRADING_EVENT => {
                    tracing::info!("Cancel requested");
                    return ListenerExit::CancelRequested;
                }
                Ok(control) => tracing::debug!(event = %control.event, "Ignoring message"),
                Err(e) => tracing::debug!(error = %e, "Ignoring malformed message"),
            },
            Ok(Message::Close(_)) | Err(_) => return ListenerExit::PeerGone,
            Ok(_) => {}
        }
    }
    ListenerExit::PeerGone
}

async fn send_json<T: Serialize>(sink: &mut SplitSink<WebSocket, Message>, payload: &T) {
    let text = match serde_json::to_string(payload) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Unable to encode reply");
            return;
        }
    };

    if let Err(e) = sink.send(Message::Text(text)).await {
        tracing::warn!(error = %e, "Unable to write reply");
    }
}
