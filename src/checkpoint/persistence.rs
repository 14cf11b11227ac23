//! Serde-friendly persisted form of a checkpoint. No I/O here; backends
//! convert through these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::SessionState;

use super::{Checkpoint, CheckpointerError, Cursor};

/// Storage representation of a [`Checkpoint`].
///
/// The cursor and timestamp are stored as strings (cursor codec, RFC3339) so
/// rows stay greppable and schema changes stay additive.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedCheckpoint {
    pub session_id: String,
    pub state: SessionState,
    pub cursor: String,
    pub updated_at: String,
}

impl From<&Checkpoint> for PersistedCheckpoint {
    fn from(cp: &Checkpoint) -> Self {
        Self {
            session_id: cp.session_id.clone(),
            state: cp.state.clone(),
            cursor: cp.cursor.encode(),
            updated_at: cp.updated_at.to_rfc3339(),
        }
    }
}

impl TryFrom<PersistedCheckpoint> for Checkpoint {
    type Error = CheckpointerError;

    fn try_from(persisted: PersistedCheckpoint) -> Result<Self, Self::Error> {
        let cursor = Cursor::decode(&persisted.cursor).ok_or_else(|| {
            CheckpointerError::Corrupt {
                session_id: persisted.session_id.clone(),
                detail: format!("unrecognized cursor '{}'", persisted.cursor),
            }
        })?;
        let updated_at = DateTime::parse_from_rfc3339(&persisted.updated_at)
            .map_err(|err| CheckpointerError::Corrupt {
                session_id: persisted.session_id.clone(),
                detail: format!("bad timestamp '{}': {err}", persisted.updated_at),
            })?
            .with_timezone(&Utc);
        Ok(Checkpoint {
            session_id: persisted.session_id,
            state: persisted.state,
            cursor,
            updated_at,
        })
    }
}
