use tracing::{error, info};

use crate::db::dbdraw;
use crate::models::ServerMessage;
use crate::ws::broadcast::reply;
use crate::ws::registry::{ConnId, FrameSender};
use crate::AppState;

/// Handle a `join_room` frame.
///
/// Resolves (or creates) the room, records the membership, then answers the
/// joining connection only: first the persisted shape history as one
/// `existing_shapes` frame, then the `joined_room` acknowledgement. Nothing
/// is broadcast to the other members.
pub async fn handle_join_message(
    room_id: &str,
    slug: Option<&str>,
    conn_id: ConnId,
    user_id: &str,
    reply_tx: &FrameSender,
    state: &AppState,
) {
    let room = match state.rooms.resolve(room_id, slug, user_id).await {
        Ok(room) => room,
        Err(e) => {
            error!("Failed to resolve room {} for user {}: {}", room_id, user_id, e);
            reply(
                reply_tx,
                &ServerMessage::Error {
                    message: "Failed to resolve room".to_string(),
                },
            );
            return;
        }
    };

    if !state.registry.join(conn_id, &room.id) {
        // Only reachable for an unregistered handle
        error!("Join for unknown connection {}", conn_id);
        return;
    }
    info!("User {} joined room {} ({})", user_id, room.id, conn_id);

    // Replay history before acknowledging, so the client has the full board
    // by the time it starts applying live events.
    let shapes = match dbdraw::get_db() {
        Some(db) => match db.list_shape_history(&room.id).await {
            Ok(shapes) => shapes,
            Err(e) => {
                error!("Failed to load shape history for room {}: {}", room.id, e);
                reply(
                    reply_tx,
                    &ServerMessage::Error {
                        message: "Failed to load shapes".to_string(),
                    },
                );
                return;
            }
        },
        None => {
            reply(
                reply_tx,
                &ServerMessage::Error {
                    message: "Failed to load shapes".to_string(),
                },
            );
            return;
        }
    };

    reply(
        reply_tx,
        &ServerMessage::ExistingShapes {
            room_id: room.id.clone(),
            shapes,
        },
    );
    reply(
        reply_tx,
        &ServerMessage::JoinedRoom { room_id: room.id },
    );
}
