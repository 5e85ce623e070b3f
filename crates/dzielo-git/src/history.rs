// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Per-author history extraction
//!
//! [`extract_history`] turns raw log entries from any [`HistorySource`] into
//! [`ChangeRecord`]s for one author and one [`Period`], recording which
//! commits lost their patch along the way.

use crate::change::ChangeRecord;
use crate::error::GitError;
use crate::period::Period;
use crate::repo::{GitRepo, LogEntry, WalkOptions};
use tracing::{debug, info, warn};

/// What to extract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Author email or name, compared exactly
    pub author: String,
    /// Governing period
    pub period: Period,
    /// Keep only commits whose subject starts with this text
    pub subject_prefix: Option<String>,
    /// Walk every local branch instead of HEAD only
    pub all_branches: bool,
}

impl HistoryQuery {
    /// Query all commits by `author` in `period`
    #[must_use]
    pub fn new(author: impl Into<String>, period: Period) -> Self {
        Self {
            author: author.into(),
            period,
            subject_prefix: None,
            all_branches: false,
        }
    }

    /// Keep only commits whose subject starts with `prefix`
    #[must_use]
    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = Some(prefix.into());
        self
    }

    /// Walk every local branch
    #[must_use]
    pub fn across_branches(mut self) -> Self {
        self.all_branches = true;
        self
    }
}

/// The repository collaborator: anything that can list log entries
pub trait HistorySource {
    /// Return entries oldest first. Implementations may pre-filter by the
    /// query; [`extract_history`] applies the authoritative filter anyway.
    ///
    /// # Errors
    ///
    /// Returns `GitError` if the history cannot be read at all.
    fn entries(&self, query: &HistoryQuery) -> Result<Vec<LogEntry>, GitError>;
}

impl HistorySource for GitRepo {
    fn entries(&self, query: &HistoryQuery) -> Result<Vec<LogEntry>, GitError> {
        let mut options = WalkOptions::default()
            .by_author(&query.author)
            .between(query.period.start_utc(), query.period.end_utc());
        if query.all_branches {
            options = options.all_branches();
        }
        self.walk(&options)
    }
}

/// A commit whose patch could not be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffUnavailable {
    /// Commit SHA
    pub id: String,
    /// Why the patch is missing
    pub reason: String,
}

/// Result of an extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    /// Matching records, timestamp ascending
    pub records: Vec<ChangeRecord>,
    /// Records kept without a patch
    pub diff_failures: Vec<DiffUnavailable>,
    /// Commits dropped because neither message nor patch was available
    pub dropped: Vec<String>,
}

impl History {
    /// Whether no commit matched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Collect the author's change records for the query period
///
/// A commit is kept iff its author email or name equals `query.author` and
/// its timestamp lies in `[period.start, period.end)`. Records are ordered by
/// timestamp with ties left in source order.
///
/// # Errors
///
/// Returns `GitError` when the source cannot be read. Per-commit patch
/// failures are not errors; they are reported in [`History::diff_failures`].
pub fn extract_history<S: HistorySource + ?Sized>(
    source: &S,
    query: &HistoryQuery,
) -> Result<History, GitError> {
    let entries = source.entries(query)?;
    let total = entries.len();
    let mut history = History::default();

    for entry in entries {
        if !entry.matches_author(&query.author) || !query.period.contains(&entry.timestamp) {
            continue;
        }

        let matched_author = if entry.author_email == query.author {
            entry.author_email
        } else {
            entry.author_name
        };

        let message = entry.message.filter(|m| !m.trim().is_empty());

        if let Some(ref prefix) = query.subject_prefix {
            let subject = message.as_deref().and_then(|m| m.lines().next()).unwrap_or("");
            if !subject.starts_with(prefix.as_str()) {
                continue;
            }
        }

        let diff = match entry.diff {
            Ok(patch) => Some(patch),
            Err(err) => {
                if message.is_none() {
                    warn!(commit = %entry.id, error = %err, "dropping commit with neither message nor diff");
                    history.dropped.push(entry.id);
                    continue;
                }
                warn!(commit = %entry.id, error = %err, "diff unavailable, keeping description only");
                history.diff_failures.push(DiffUnavailable {
                    id: entry.id.clone(),
                    reason: err.to_string(),
                });
                None
            }
        };

        history.records.push(ChangeRecord {
            id: entry.id,
            timestamp: entry.timestamp,
            author: matched_author,
            original_message: message.unwrap_or_default(),
            diff,
        });
    }

    history.records.sort_by_key(|record| record.timestamp);

    debug!(scanned = total, "filtered log entries");
    info!(
        author = %query.author,
        period = %query.period,
        records = history.records.len(),
        diff_failures = history.diff_failures.len(),
        dropped = history.dropped.len(),
        "extracted history"
    );
    Ok(history)
}
