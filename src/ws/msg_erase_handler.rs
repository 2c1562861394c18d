use tracing::debug;

use crate::models::ServerMessage;
use crate::ws::broadcast::broadcast;
use crate::ws::registry::ConnId;
use crate::AppState;

/// Handle an `erase_shape` frame.
///
/// Broadcast-only: the shape id is echoed verbatim to every current member
/// of the room, the sender included. Erasures are not persisted; a late
/// joiner replaying history may still see the shape.
pub fn handle_erase_message(room_id: &str, shape_id: &str, conn_id: ConnId, state: &AppState) {
    if !state.registry.is_joined(conn_id, room_id) {
        debug!("Erase from connection {} outside room {}", conn_id, room_id);
    }

    let delivered = broadcast(
        &state.registry,
        room_id,
        &ServerMessage::EraseShape {
            room_id: room_id.to_string(),
            shape_id: shape_id.to_string(),
        },
    );
    debug!(
        "Erase of shape {} in room {} delivered to {} members",
        shape_id, room_id, delivered
    );
}
