use serde_json::Value;
use tracing::{debug, error};

use crate::db::dbdraw;
use crate::models::ServerMessage;
use crate::ws::broadcast::{broadcast, reply};
use crate::ws::registry::FrameSender;
use crate::AppState;

/// Handle a `drawing` frame: persist the shape, then fan it out to every
/// current member of the room, the sender included.
///
/// Concurrent edits of the same shape are not reconciled; the last persisted
/// write survives.
pub async fn handle_drawing_message(
    room_id: &str,
    shape: Value,
    user_id: &str,
    reply_tx: &FrameSender,
    state: &AppState,
) {
    let room = match state.rooms.resolve(room_id, None, user_id).await {
        Ok(room) => room,
        Err(e) => {
            error!("Failed to resolve room {} for drawing: {}", room_id, e);
            reply(
                reply_tx,
                &ServerMessage::Error {
                    message: "Failed to resolve room".to_string(),
                },
            );
            return;
        }
    };

    let Some(db) = dbdraw::get_db() else {
        reply(
            reply_tx,
            &ServerMessage::Error {
                message: "Failed to save drawing".to_string(),
            },
        );
        return;
    };
    if let Err(e) = db.append_drawing(&room.id, user_id, &shape).await {
        error!("Failed to persist drawing in room {}: {}", room.id, e);
        reply(
            reply_tx,
            &ServerMessage::Error {
                message: "Failed to save drawing".to_string(),
            },
        );
        return;
    }

    let delivered = broadcast(
        &state.registry,
        &room.id,
        &ServerMessage::Drawing {
            room_id: room.id.clone(),
            shape,
            user_id: user_id.to_string(),
        },
    );
    debug!("Drawing in room {} delivered to {} members", room.id, delivered);
}
