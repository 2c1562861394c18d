//! Room materialization: maps a room id to a durable room record, creating
//! one on first reference.

use moka::future::Cache;
use std::time::Duration;
use tracing::info;

use crate::db::dbdraw;
use crate::models::RoomRecord;

/// Resolver failure. `StorageUnavailable` covers a server running without a
/// configured database; both variants surface to the client as a single
/// error frame.
#[derive(Debug)]
pub enum ResolveError {
    StorageUnavailable,
    Db(sqlx::Error),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::StorageUnavailable => write!(f, "Database not initialized"),
            ResolveError::Db(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<sqlx::Error> for ResolveError {
    fn from(e: sqlx::Error) -> Self {
        ResolveError::Db(e)
    }
}

/// Caching resolver in front of the room table.
///
/// Lookup order: cache, then storage get, then storage upsert. The upsert is
/// the race closer: two near-simultaneous first references to the same
/// unknown room id both land on `ON CONFLICT` and get the one surviving row.
pub struct RoomResolver {
    cache: Cache<String, RoomRecord>,
}

impl RoomResolver {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(Duration::from_secs(300))
                .build(),
        }
    }

    /// Resolve a room id to its durable record, creating the room when it is
    /// referenced for the first time. The creating user becomes admin; the
    /// slug falls back to the room id when the client sent none.
    pub async fn resolve(
        &self,
        room_id: &str,
        fallback_slug: Option<&str>,
        requesting_user_id: &str,
    ) -> Result<RoomRecord, ResolveError> {
        if let Some(room) = self.cache.get(room_id).await {
            return Ok(room);
        }

        let db = dbdraw::get_db().ok_or(ResolveError::StorageUnavailable)?;

        let room = match db.get_room(room_id).await? {
            Some(room) => room,
            None => {
                let slug = fallback_slug.filter(|s| !s.is_empty()).unwrap_or(room_id);
                info!("First reference to room {}, creating (slug '{}')", room_id, slug);
                db.upsert_room(room_id, slug, requesting_user_id).await?
            }
        };

        self.cache.insert(room_id.to_string(), room.clone()).await;
        Ok(room)
    }

    /// Number of room records currently cached.
    pub fn cached_rooms(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for RoomResolver {
    fn default() -> Self {
        Self::new()
    }
}
