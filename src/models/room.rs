use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable room record.
///
/// Created lazily on first reference and never deleted by this service.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoomRecord {
    pub id: String,
    pub slug: String,
    pub admin_id: String,
    pub created_at: DateTime<Utc>,
}
