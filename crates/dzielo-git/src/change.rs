//! Change record type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit by the requested author inside the governing period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// The commit SHA
    pub id: String,
    /// Commit timestamp
    pub timestamp: DateTime<Utc>,
    /// The author identity that matched the query (email or name)
    pub author: String,
    /// Commit message as written; empty when the message was unavailable
    pub original_message: String,
    /// Full textual patch, `None` when it could not be retrieved
    pub diff: Option<String>,
}

impl ChangeRecord {
    /// Get the short SHA (first 7 characters)
    #[must_use]
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(7)
            .map_or(self.id.len(), |(idx, _)| idx);
        &self.id[..end]
    }

    /// Get the first line of the commit message (subject)
    #[must_use]
    pub fn subject(&self) -> &str {
        self.original_message.lines().next().unwrap_or("")
    }

    /// Whether the patch text is available
    #[must_use]
    pub fn has_diff(&self) -> bool {
        self.diff.is_some()
    }

    /// Whether the record carries a usable description
    #[must_use]
    pub fn has_message(&self) -> bool {
        !self.original_message.trim().is_empty()
    }
}
