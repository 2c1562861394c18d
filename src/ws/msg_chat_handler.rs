use tracing::{debug, error};

use crate::db::dbdraw;
use crate::models::ServerMessage;
use crate::ws::broadcast::{broadcast, reply};
use crate::ws::registry::FrameSender;
use crate::AppState;

/// Handle a `chat` frame: persist first, then fan out to every current
/// member of the room, the sender included.
///
/// When the append fails the broadcast is suppressed and the sender alone
/// gets an error frame; the other members see nothing for this event.
pub async fn handle_chat_message(
    room_id: &str,
    message: &str,
    user_id: &str,
    reply_tx: &FrameSender,
    state: &AppState,
) {
    let room = match state.rooms.resolve(room_id, None, user_id).await {
        Ok(room) => room,
        Err(e) => {
            error!("Failed to resolve room {} for chat: {}", room_id, e);
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
                message: "Failed to save message".to_string(),
            },
        );
        return;
    };
    if let Err(e) = db.append_chat(&room.id, user_id, message).await {
        error!("Failed to persist chat in room {}: {}", room.id, e);
        reply(
            reply_tx,
            &ServerMessage::Error {
                message: "Failed to save message".to_string(),
            },
        );
        return;
    }

    let delivered = broadcast(
        &state.registry,
        &room.id,
        &ServerMessage::Chat {
            room_id: room.id.clone(),
            message: message.to_string(),
            user_id: user_id.to_string(),
        },
    );
    debug!("Chat in room {} delivered to {} members", room.id, delivered);
}
