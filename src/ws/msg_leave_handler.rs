use tracing::{debug, info};

use crate::models::ServerMessage;
use crate::ws::broadcast::reply;
use crate::ws::registry::{ConnId, FrameSender};
use crate::AppState;

/// Handle a `leave_room` frame.
///
/// Idempotent removal; leaving a room never joined still gets the
/// `left_room` acknowledgement. Only the leaving connection hears about it.
pub fn handle_leave_message(
    room_id: &str,
    conn_id: ConnId,
    reply_tx: &FrameSender,
    state: &AppState,
) {
    if state.registry.leave(conn_id, room_id) {
        info!("Connection {} left room {}", conn_id, room_id);
    } else {
        debug!("Connection {} left room {} it never joined", conn_id, room_id);
    }

    reply(
        reply_tx,
        &ServerMessage::LeftRoom {
            room_id: room_id.to_string(),
        },
    );
}
