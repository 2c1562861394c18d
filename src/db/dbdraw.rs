use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Error as SqlxError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

use crate::models::RoomRecord;

// Global database instance
static DB: OnceCell<Arc<DrawStore>> = OnceCell::const_new();

/// Initialize the global database connection
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error
pub async fn init_db(database_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = DrawStore::new(database_url).await?;
    DB.set(Arc::new(db))
        .map_err(|_| "Database already initialized")?;
    Ok(())
}

/// Get the global database instance
///
/// # Returns
/// * `Option<Arc<DrawStore>>` - Database instance if initialized
pub fn get_db() -> Option<Arc<DrawStore>> {
    DB.get().cloned()
}

/// Append-only store for rooms and chat/drawing events.
///
/// Schema (owned by the surrounding system, not created here):
///   rooms(id TEXT PK, slug TEXT, admin_id TEXT, created_at TIMESTAMPTZ)
///   chats(id BIGSERIAL PK, room_id TEXT, user_id TEXT, message TEXT,
///         shape JSONB NULL, created_at TIMESTAMPTZ)
pub struct DrawStore {
    pool: PgPool,
}

impl DrawStore {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Look up a room by id.
    pub async fn get_room(&self, room_id: &str) -> Result<Option<RoomRecord>, SqlxError> {
        sqlx::query_as::<_, RoomRecord>(
            r#"
            SELECT id, slug, admin_id, created_at
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Create the room if it does not exist yet and return the surviving row.
    ///
    /// The conflict arm is a no-op update so the statement always returns a
    /// row; two callers racing on the same first reference both get the row
    /// written by whichever insert won, with no uniqueness error.
    pub async fn upsert_room(
        &self,
        room_id: &str,
        slug: &str,
        admin_id: &str,
    ) -> Result<RoomRecord, SqlxError> {
        let room = sqlx::query_as::<_, RoomRecord>(
            r#"
            INSERT INTO rooms (id, slug, admin_id, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (id) DO UPDATE SET slug = rooms.slug
            RETURNING id, slug, admin_id, created_at
            "#,
        )
        .bind(room_id)
        .bind(slug)
        .bind(admin_id)
        .fetch_one(&self.pool)
        .await?;

        info!("Resolved room {} (admin {})", room.id, room.admin_id);
        Ok(room)
    }

    /// Append a chat event.
    ///
    /// # Returns
    /// * `Result<i64, SqlxError>` - Id of the persisted row
    pub async fn append_chat(
        &self,
        room_id: &str,
        user_id: &str,
        message: &str,
    ) -> Result<i64, SqlxError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO chats (room_id, user_id, message, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await
    }

    /// Append a drawing event. Drawings share the chat table with an empty
    /// message and the shape payload in the `shape` column.
    pub async fn append_drawing(
        &self,
        room_id: &str,
        user_id: &str,
        shape: &Value,
    ) -> Result<i64, SqlxError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO chats (room_id, user_id, message, shape, created_at)
            VALUES ($1, $2, '', $3, NOW())
            RETURNING id
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .bind(Json(shape))
        .fetch_one(&self.pool)
        .await
    }

    /// All persisted shape payloads for a room, oldest first.
    ///
    /// Rows without a shape (plain chat messages) are filtered out.
    pub async fn list_shape_history(&self, room_id: &str) -> Result<Vec<Value>, SqlxError> {
        sqlx::query_scalar::<_, Value>(
            r#"
            SELECT shape
            FROM chats
            WHERE room_id = $1 AND shape IS NOT NULL
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
    }
}
