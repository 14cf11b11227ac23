//! SQLite-backed checkpoint store.
//!
//! One row per session in a `checkpoints` table; state is a JSON column so
//! the schema never changes when the state grows a field. Saves are upserts.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::persistence::PersistedCheckpoint;
use super::{Checkpoint, Checkpointer, CheckpointerError};

const CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS checkpoints (
    session_id TEXT PRIMARY KEY,
    state_json TEXT NOT NULL,
    cursor     TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// Durable checkpoint store over a SQLite database.
#[derive(Clone, Debug)]
pub struct SqliteCheckpointer {
    pool: SqlitePool,
}

impl SqliteCheckpointer {
    /// Connects to `database_url` (e.g. `sqlite://checkpoints.db`) and
    /// ensures the schema exists.
    ///
    /// SQLite will not create the database file itself; callers connecting
    /// to a fresh path should pre-create the file or append `?mode=rwc`
    /// (`EngineConfig` handles this).
    pub async fn connect(database_url: &str) -> Result<Self, CheckpointerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        debug!(url = %database_url, "sqlite checkpointer ready");
        Ok(Self { pool })
    }

    /// Wraps an existing pool; assumes the schema is already in place or
    /// creates it.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CheckpointerError> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        let persisted = PersistedCheckpoint::from(&checkpoint);
        let state_json = serde_json::to_string(&persisted.state).map_err(|source| {
            CheckpointerError::Serialize {
                session_id: persisted.session_id.clone(),
                source,
            }
        })?;
        sqlx::query(
            "INSERT INTO checkpoints (session_id, state_json, cursor, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_id) DO UPDATE SET
                 state_json = excluded.state_json,
                 cursor     = excluded.cursor,
                 updated_at = excluded.updated_at",
        )
        .bind(&persisted.session_id)
        .bind(&state_json)
        .bind(&persisted.cursor)
        .bind(&persisted.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        let row = sqlx::query(
            "SELECT state_json, cursor, updated_at FROM checkpoints WHERE session_id = ?1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let state_json: String = row.try_get("state_json")?;
        let state = serde_json::from_str(&state_json).map_err(|err| {
            CheckpointerError::Corrupt {
                session_id: session_id.to_string(),
                detail: format!("bad state json: {err}"),
            }
        })?;
        let persisted = PersistedCheckpoint {
            session_id: session_id.to_string(),
            state,
            cursor: row.try_get("cursor")?,
            updated_at: row.try_get("updated_at")?,
        };
        Checkpoint::try_from(persisted).map(Some)
    }

    async fn clear(&self, session_id: &str) -> Result<(), CheckpointerError> {
        sqlx::query("DELETE FROM checkpoints WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, CheckpointerError> {
        let rows = sqlx::query("SELECT session_id FROM checkpoints ORDER BY session_id")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| row.try_get::<String, _>("session_id").map_err(Into::into))
            .collect()
    }
}
