use std::collections::HashMap;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::auth::{self, AdmissionError};
use crate::config;
use crate::models::{ClientMessage, ServerMessage};
use crate::ws::broadcast::reply;
use crate::ws::msg_chat_handler::handle_chat_message;
use crate::ws::msg_drawing_handler::handle_drawing_message;
use crate::ws::msg_erase_handler::handle_erase_message;
use crate::ws::msg_join_handler::handle_join_message;
use crate::ws::msg_leave_handler::handle_leave_message;
use crate::ws::registry::{ConnId, FrameSender};
use crate::AppState;

/// WebSocket handler
///
/// The bearer token rides on the upgrade request as the `token` query
/// parameter; admission runs before any frame is read.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    let token = params.get("token").cloned();
    ws.on_upgrade(move |socket| handle_socket(socket, token, state))
}

/// Handle one websocket connection from admission to close.
async fn handle_socket(mut socket: WebSocket, token: Option<String>, state: AppState) {
    let secret = config::get_config().auth_jwt_secret.as_deref();
    let user_id = match auth::authenticate(token.as_deref(), secret) {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!("Rejected websocket connection: {}", e.close_reason());
            close_policy_violation(&mut socket, e).await;
            return;
        }
    };

    let conn_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    if !state.registry.register(conn_id, user_id.clone(), tx.clone()) {
        error!("Connection handle {} already registered", conn_id);
        return;
    }
    info!("Websocket connection {} established for user {}", conn_id, user_id);

    let (mut sender, mut receiver) = socket.split();

    // Forward queued outbound frames to the socket until the queue closes or
    // the socket dies.
    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Inbound frames are processed strictly in arrival order: one frame's
    // handler completes (including its storage awaits) before the next frame
    // is read.
    let recv_state = state.clone();
    let recv_user = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_frame(&text, conn_id, &recv_user, &tx, &recv_state).await;
                }
                Message::Close(_) => break,
                // Ping/pong are answered by the transport; binary frames
                // carry nothing in this protocol
                _ => {}
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // Prune this connection from every room it belonged to. Broadcasts that
    // snapshotted the membership before this line simply fail their send to
    // this connection and skip it.
    state.registry.unregister(conn_id);
    info!("Websocket connection {} closed for user {}", conn_id, user_id);
}

async fn close_policy_violation(socket: &mut WebSocket, e: AdmissionError) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: e.close_reason().into(),
        })))
        .await;
}

/// Classify one inbound frame and dispatch it.
///
/// Two stages: text that is not JSON at all, and JSON that does not match
/// the tagged protocol, each answered with an error frame to the sender
/// only. Neither closes the connection.
pub(crate) async fn handle_frame(
    text: &str,
    conn_id: ConnId,
    user_id: &str,
    reply_tx: &FrameSender,
    state: &AppState,
) {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            warn!("Connection {} sent malformed JSON", conn_id);
            reply(
                reply_tx,
                &ServerMessage::Error {
                    message: "Invalid JSON format".to_string(),
                },
            );
            return;
        }
    };

    let msg: ClientMessage = match serde_json::from_value(value) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Connection {} sent unsupported frame: {}", conn_id, e);
            reply(
                reply_tx,
                &ServerMessage::Error {
                    message: "Unknown message type".to_string(),
                },
            );
            return;
        }
    };

    match msg {
        ClientMessage::JoinRoom { room_id, slug } => {
            handle_join_message(&room_id, slug.as_deref(), conn_id, user_id, reply_tx, state).await;
        }
        ClientMessage::LeaveRoom { room_id } => {
            handle_leave_message(&room_id, conn_id, reply_tx, state);
        }
        ClientMessage::Chat { room_id, message } => {
            handle_chat_message(&room_id, &message, user_id, reply_tx, state).await;
        }
        ClientMessage::Drawing { room_id, shape } => {
            handle_drawing_message(&room_id, shape, user_id, reply_tx, state).await;
        }
        ClientMessage::EraseShape { room_id, shape_id } => {
            handle_erase_message(&room_id, &shape_id, conn_id, state);
        }
    }
}
