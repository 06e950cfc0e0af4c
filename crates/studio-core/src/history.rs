use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::BackendId;

/// Opaque locator for a produced image: URL, data URL or storage key.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRef(pub String);

impl ResultRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_data_url(&self) -> bool {
        self.0.starts_with("data:")
    }
}

impl fmt::Display for ResultRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResultRef {
    fn from(s: &str) -> Self {
        ResultRef(s.to_string())
    }
}

impl From<String> for ResultRef {
    fn from(s: String) -> Self {
        ResultRef(s)
    }
}

/// Description recorded for the image a session was opened with.
pub const ORIGINAL_DESCRIPTION: &str = "original";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub result: ResultRef,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendId>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(result: ResultRef, description: String, backend: Option<BackendId>) -> Self {
        Self {
            result,
            description,
            backend,
            created_at: Utc::now(),
        }
    }

    pub fn original(result: ResultRef) -> Self {
        Self::new(result, ORIGINAL_DESCRIPTION.into(), None)
    }
}

/// One row of the persisted, append-only generation gallery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryItem {
    pub id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub backend: BackendId,
    pub prompt: String,
    pub result: ResultRef,
    pub cost: u64,
    pub created_at: DateTime<Utc>,
}

impl GalleryItem {
    pub fn new(
        user_id: String,
        session_id: Option<String>,
        backend: BackendId,
        prompt: String,
        result: ResultRef,
        cost: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            session_id,
            backend,
            prompt,
            result,
            cost,
            created_at: Utc::now(),
        }
    }
}
