use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for diagnostics information
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    /// Live websocket connections
    pub n_conn: u32,
    /// Distinct authenticated users across those connections
    pub n_users: u32,
    /// Rooms with at least one member
    pub n_rooms: u32,
    /// Total (connection, room) membership pairs
    pub n_memberships: u32,
    /// Room records held by the resolver cache
    pub n_cached_rooms: u32,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
}
