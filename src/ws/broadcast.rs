//! Fan-out delivery over the registry's membership snapshot.

use tracing::{debug, error};

use super::registry::{FrameSender, SharedRegistry};
use crate::models::ServerMessage;

/// Deliver a frame to every current member of a room.
///
/// The payload is serialized once; each member is attempted independently. A
/// failed send means the socket is already closing: it is skipped, never
/// retried, and the registry entry is pruned when the close notification
/// lands. Returns the number of successful deliveries.
pub fn broadcast(registry: &SharedRegistry, room_id: &str, msg: &ServerMessage) -> usize {
    let text = match serde_json::to_string(msg) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to serialize broadcast frame for room {}: {}", room_id, e);
            return 0;
        }
    };

    let mut delivered = 0;
    for member in registry.members_of(room_id) {
        if member.sender.send(text.clone()).is_ok() {
            delivered += 1;
        } else {
            debug!(
                "Skipping delivery to closing connection {} in room {}",
                member.conn_id, room_id
            );
        }
    }
    delivered
}

/// Send a frame to a single connection. Best effort, like all outbound
/// frames: a closing connection just drops it.
pub fn reply(sender: &FrameSender, msg: &ServerMessage) {
    match serde_json::to_string(msg) {
        Ok(text) => {
            if sender.send(text).is_err() {
                debug!("Dropping reply to closing connection");
            }
        }
        Err(e) => error!("Failed to serialize reply frame: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::registry::ConnId;
    use serde_json::Value;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
    use uuid::Uuid;

    fn join_new_member(
        registry: &SharedRegistry,
        user_id: &str,
        room_id: &str,
    ) -> (ConnId, UnboundedReceiver<String>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = unbounded_channel();
        assert!(registry.register(conn_id, user_id.to_string(), tx));
        assert!(registry.join(conn_id, room_id));
        (conn_id, rx)
    }

    fn chat(room_id: &str, message: &str, user_id: &str) -> ServerMessage {
        ServerMessage::Chat {
            room_id: room_id.to_string(),
            message: message.to_string(),
            user_id: user_id.to_string(),
        }
    }

    #[test]
    fn reaches_every_member_including_sender() {
        let registry = SharedRegistry::new();
        let (_a, mut rx_a) = join_new_member(&registry, "u1", "r1");
        let (_b, mut rx_b) = join_new_member(&registry, "u2", "r1");
        let (_c, mut rx_c) = join_new_member(&registry, "u3", "r2");

        let delivered = broadcast(&registry, "r1", &chat("r1", "hi", "u1"));
        assert_eq!(delivered, 2);

        for rx in [&mut rx_a, &mut rx_b] {
            let frame: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(frame["type"], "chat");
            assert_eq!(frame["message"], "hi");
            assert_eq!(frame["roomId"], "r1");
        }
        // Not a member of r1: sees nothing
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn closing_member_is_skipped_without_aborting_fanout() {
        let registry = SharedRegistry::new();
        let (_a, mut rx_a) = join_new_member(&registry, "u1", "r1");
        let (_b, rx_b) = join_new_member(&registry, "u2", "r1");
        drop(rx_b);

        let delivered = broadcast(&registry, "r1", &chat("r1", "still here", "u1"));

        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_ok());
    }

    #[test]
    fn no_delivery_after_leave() {
        let registry = SharedRegistry::new();
        let (a, mut rx_a) = join_new_member(&registry, "u1", "r1");
        let (_b, mut rx_b) = join_new_member(&registry, "u2", "r1");

        registry.leave(a, "r1");
        let delivered = broadcast(&registry, "r1", &chat("r1", "bye", "u2"));

        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn empty_room_delivers_nothing() {
        let registry = SharedRegistry::new();
        assert_eq!(broadcast(&registry, "r1", &chat("r1", "void", "u1")), 0);
    }

    #[test]
    fn reply_hits_only_the_given_connection() {
        let (tx, mut rx) = unbounded_channel();
        reply(
            &tx,
            &ServerMessage::Error {
                message: "Invalid JSON format".to_string(),
            },
        );
        let frame: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["type"], "error");
        assert_eq!(frame["message"], "Invalid JSON format");
    }
}
