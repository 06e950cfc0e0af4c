use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studio_core::error::SessionError;
use studio_core::history::{HistoryEntry, ResultRef};

/// Serialisable copy of a session for local caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<ResultRef>,
    pub entries: Vec<HistoryEntry>,
    pub current_index: Option<usize>,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string(self).map_err(|e| SessionError::CorruptSnapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        serde_json::from_str(json).map_err(|e| SessionError::CorruptSnapshot(e.to_string()))
    }
}
