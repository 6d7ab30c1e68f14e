use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no wallet address found after login")]
    MissingHolder,
}

/// An authenticated holder.
///
/// Created on login and consumed on logout. Operations acting on behalf of a holder take a
/// `&HolderSession` instead of reading ambient login state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderSession {
    id: Uuid,
    holder_id: String,
    started_at: DateTime<Utc>,
}

impl HolderSession {
    pub fn begin(holder_id: impl Into<String>) -> Result<Self, SessionError> {
        let holder_id = holder_id.into().trim().to_owned();
        if holder_id.is_empty() {
            return Err(SessionError::MissingHolder);
        }

        let session = Self {
            id: Uuid::new_v4(),
            holder_id,
            started_at: Utc::now(),
        };
        debug!(session = %session.id, holder = %session.holder_id, "session started");
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn end(self) {
        debug!(session = %self.id, holder = %self.holder_id, "session ended");
    }
}
