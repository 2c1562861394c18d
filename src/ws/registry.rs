//! Live connection and room membership index.
//!
//! Bidirectional mapping: each connection holds its set of joined room ids,
//! and each room id maps to the set of member connections. The two sides are
//! only ever mutated together, inside one registry call, so for every
//! connection `c` and room `r`: `r ∈ c.rooms ⇔ c ∈ rooms[r]`.
//!
//! Membership lives in memory only; it is empty at process start and dies
//! with the process.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

pub type ConnId = Uuid;

/// Outbound handle for one connection: frames pushed here are forwarded to
/// the socket by the connection's writer task.
pub type FrameSender = UnboundedSender<String>;

struct ConnEntry {
    user_id: String,
    rooms: HashSet<String>,
    sender: FrameSender,
}

/// One entry of a fan-out snapshot. The snapshot may go stale immediately:
/// a member can disconnect mid-broadcast, in which case its sender fails and
/// the delivery is skipped.
#[derive(Clone)]
pub struct Member {
    pub conn_id: ConnId,
    pub sender: FrameSender,
}

#[derive(Default)]
pub struct SessionRegistry {
    connections: HashMap<ConnId, ConnEntry>,
    rooms: HashMap<String, HashSet<ConnId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection with an empty room set.
    ///
    /// Returns `false` if the handle is already registered, which is a
    /// programming error on the caller's side, not a runtime condition.
    pub fn register(&mut self, conn_id: ConnId, user_id: String, sender: FrameSender) -> bool {
        if self.connections.contains_key(&conn_id) {
            return false;
        }
        self.connections.insert(
            conn_id,
            ConnEntry {
                user_id,
                rooms: HashSet::new(),
                sender,
            },
        );
        true
    }

    /// Add the connection to a room. Idempotent: re-joining an already
    /// joined room succeeds and changes nothing.
    ///
    /// Returns `false` only when the connection is not registered.
    pub fn join(&mut self, conn_id: ConnId, room_id: &str) -> bool {
        let Some(entry) = self.connections.get_mut(&conn_id) else {
            return false;
        };
        entry.rooms.insert(room_id.to_string());
        self.rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(conn_id);
        true
    }

    /// Remove the connection from a room. Leaving a room never joined is a
    /// no-op.
    ///
    /// Returns `true` when a membership was actually removed.
    pub fn leave(&mut self, conn_id: ConnId, room_id: &str) -> bool {
        let was_member = self
            .connections
            .get_mut(&conn_id)
            .is_some_and(|entry| entry.rooms.remove(room_id));
        if let Some(members) = self.rooms.get_mut(room_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                self.rooms.remove(room_id);
            }
        }
        was_member
    }

    /// Remove the connection from every room it belongs to, then drop its
    /// record. Safe to call for a handle that never completed registration.
    pub fn unregister(&mut self, conn_id: ConnId) {
        let Some(entry) = self.connections.remove(&conn_id) else {
            return;
        };
        for room_id in entry.rooms {
            if let Some(members) = self.rooms.get_mut(&room_id) {
                members.remove(&conn_id);
                if members.is_empty() {
                    self.rooms.remove(&room_id);
                }
            }
        }
    }

    /// Snapshot of the current members of a room, for fan-out.
    pub fn members_of(&self, room_id: &str) -> Vec<Member> {
        let Some(members) = self.rooms.get(room_id) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|conn_id| {
                self.connections.get(conn_id).map(|entry| Member {
                    conn_id: *conn_id,
                    sender: entry.sender.clone(),
                })
            })
            .collect()
    }

    pub fn is_joined(&self, conn_id: ConnId, room_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(&conn_id))
    }

    /// Live connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Distinct authenticated users across live connections.
    pub fn user_count(&self) -> usize {
        self.connections
            .values()
            .map(|entry| entry.user_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total (connection, room) membership pairs.
    pub fn membership_count(&self) -> usize {
        self.rooms.values().map(HashSet::len).sum()
    }
}

/// The registry handle constructed once per process and injected into the
/// router and broadcaster.
///
/// The mutex guard is never held across an await, so every operation is
/// atomic with respect to the cooperative scheduler.
#[derive(Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<SessionRegistry>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionRegistry> {
        self.inner.lock().expect("session registry lock poisoned")
    }

    pub fn register(&self, conn_id: ConnId, user_id: String, sender: FrameSender) -> bool {
        self.lock().register(conn_id, user_id, sender)
    }

    pub fn join(&self, conn_id: ConnId, room_id: &str) -> bool {
        self.lock().join(conn_id, room_id)
    }

    pub fn leave(&self, conn_id: ConnId, room_id: &str) -> bool {
        self.lock().leave(conn_id, room_id)
    }

    pub fn unregister(&self, conn_id: ConnId) {
        self.lock().unregister(conn_id)
    }

    pub fn members_of(&self, room_id: &str) -> Vec<Member> {
        self.lock().members_of(room_id)
    }

    pub fn is_joined(&self, conn_id: ConnId, room_id: &str) -> bool {
        self.lock().is_joined(conn_id, room_id)
    }

    pub fn connection_count(&self) -> usize {
        self.lock().connection_count()
    }

    pub fn user_count(&self) -> usize {
        self.lock().user_count()
    }

    pub fn room_count(&self) -> usize {
        self.lock().room_count()
    }

    pub fn membership_count(&self) -> usize {
        self.lock().membership_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn sender() -> FrameSender {
        unbounded_channel().0
    }

    /// Both sides of the index must always agree.
    fn assert_bidirectional(registry: &SessionRegistry) {
        for (conn_id, entry) in &registry.connections {
            for room_id in &entry.rooms {
                assert!(
                    registry.rooms.get(room_id).is_some_and(|m| m.contains(conn_id)),
                    "room {} missing member {}",
                    room_id,
                    conn_id
                );
            }
        }
        for (room_id, members) in &registry.rooms {
            for conn_id in members {
                assert!(
                    registry
                        .connections
                        .get(conn_id)
                        .is_some_and(|e| e.rooms.contains(room_id)),
                    "connection {} missing room {}",
                    conn_id,
                    room_id
                );
            }
        }
    }

    #[test]
    fn register_and_count() {
        let mut registry = SessionRegistry::new();
        let c1 = Uuid::new_v4();

        assert!(registry.register(c1, "u1".into(), sender()));
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn register_duplicate_handle_fails() {
        let mut registry = SessionRegistry::new();
        let c1 = Uuid::new_v4();

        assert!(registry.register(c1, "u1".into(), sender()));
        assert!(!registry.register(c1, "u1".into(), sender()));
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn join_is_idempotent() {
        let mut registry = SessionRegistry::new();
        let c1 = Uuid::new_v4();
        registry.register(c1, "u1".into(), sender());

        assert!(registry.join(c1, "r1"));
        assert!(registry.join(c1, "r1"));

        assert!(registry.is_joined(c1, "r1"));
        assert_eq!(registry.members_of("r1").len(), 1);
        assert_eq!(registry.membership_count(), 1);
        assert_bidirectional(&registry);
    }

    #[test]
    fn join_unregistered_connection_fails() {
        let mut registry = SessionRegistry::new();
        assert!(!registry.join(Uuid::new_v4(), "r1"));
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn leave_removes_from_both_sides() {
        let mut registry = SessionRegistry::new();
        let c1 = Uuid::new_v4();
        registry.register(c1, "u1".into(), sender());
        registry.join(c1, "r1");

        assert!(registry.leave(c1, "r1"));

        assert!(!registry.is_joined(c1, "r1"));
        assert!(registry.members_of("r1").is_empty());
        // Empty room set is cleaned up entirely
        assert_eq!(registry.room_count(), 0);
        assert_bidirectional(&registry);
    }

    #[test]
    fn leave_room_never_joined_is_a_noop() {
        let mut registry = SessionRegistry::new();
        let c1 = Uuid::new_v4();
        registry.register(c1, "u1".into(), sender());
        registry.join(c1, "r1");

        assert!(!registry.leave(c1, "r2"));

        assert!(registry.is_joined(c1, "r1"));
        assert_eq!(registry.connection_count(), 1);
        assert_bidirectional(&registry);
    }

    #[test]
    fn unregister_prunes_every_room() {
        let mut registry = SessionRegistry::new();
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();
        registry.register(c1, "u1".into(), sender());
        registry.register(c2, "u2".into(), sender());
        registry.join(c1, "r1");
        registry.join(c1, "r2");
        registry.join(c2, "r1");

        registry.unregister(c1);

        assert_eq!(registry.connection_count(), 1);
        let remaining: Vec<_> = registry.members_of("r1").iter().map(|m| m.conn_id).collect();
        assert_eq!(remaining, vec![c2]);
        assert!(registry.members_of("r2").is_empty());
        assert_eq!(registry.room_count(), 1);
        assert_bidirectional(&registry);
    }

    #[test]
    fn unregister_before_registration_is_safe() {
        let mut registry = SessionRegistry::new();
        registry.unregister(Uuid::new_v4());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn members_of_unknown_room_is_empty() {
        let registry = SessionRegistry::new();
        assert!(registry.members_of("nowhere").is_empty());
    }

    #[test]
    fn user_count_deduplicates_same_user() {
        let mut registry = SessionRegistry::new();
        registry.register(Uuid::new_v4(), "u1".into(), sender());
        registry.register(Uuid::new_v4(), "u1".into(), sender());
        registry.register(Uuid::new_v4(), "u2".into(), sender());

        assert_eq!(registry.connection_count(), 3);
        assert_eq!(registry.user_count(), 2);
    }

    #[test]
    fn shared_registry_round_trip() {
        let registry = SharedRegistry::new();
        let c1 = Uuid::new_v4();

        assert!(registry.register(c1, "u1".into(), sender()));
        assert!(registry.join(c1, "r1"));
        assert_eq!(registry.membership_count(), 1);

        registry.unregister(c1);
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.membership_count(), 0);
    }
}
