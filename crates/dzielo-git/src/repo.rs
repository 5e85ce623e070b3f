// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Repository access
//!
//! This module walks commit history with the `git2` crate and renders the
//! full patch text of each selected commit.

use crate::error::GitError;
use chrono::{DateTime, Utc};
use git2::{DiffFormat, DiffOptions, Repository, Sort};
use std::path::Path;
use tracing::{debug, trace};

/// Configuration for walking commits
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Start from this reference (defaults to HEAD)
    pub from_ref: Option<String>,
    /// Walk every local branch instead of a single start point
    pub all_branches: bool,
    /// Only include commits at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Only include commits strictly before this instant
    pub until: Option<DateTime<Utc>>,
    /// Only include commits whose author name or email equals this value
    pub author: Option<String>,
}

impl WalkOptions {
    /// Restrict the walk to one author
    #[must_use]
    pub fn by_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    /// Set the starting reference
    #[must_use]
    pub fn from(mut self, reference: &str) -> Self {
        self.from_ref = Some(reference.to_string());
        self
    }

    /// Walk from every local branch head
    #[must_use]
    pub fn all_branches(mut self) -> Self {
        self.all_branches = true;
        self
    }

    /// Restrict to `since <= time < until`
    #[must_use]
    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }
}

/// A raw log entry as read from the repository
#[derive(Debug)]
pub struct LogEntry {
    /// The commit SHA
    pub id: String,
    /// Commit timestamp
    pub timestamp: DateTime<Utc>,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Commit message, `None` if it is not valid UTF-8
    pub message: Option<String>,
    /// Full patch text, or the reason it could not be produced
    pub diff: Result<String, GitError>,
}

impl LogEntry {
    /// Whether `author` equals this entry's author email or name exactly
    #[must_use]
    pub fn matches_author(&self, author: &str) -> bool {
        self.author_email == author || self.author_name == author
    }
}

/// A git repository wrapper for reading history
pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Open a git repository at the given path
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepositoryNotFound` if the path is not a git repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|_| GitError::RepositoryNotFound {
            path: path.display().to_string(),
        })?;
        Ok(Self { repo })
    }

    /// Discover and open a git repository containing the given path
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepositoryNotFound` if no repository is found.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|_| GitError::RepositoryNotFound {
            path: path.display().to_string(),
        })?;
        Ok(Self { repo })
    }

    /// Get the working directory path (None for bare repos)
    #[must_use]
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Get the HEAD commit SHA
    ///
    /// # Errors
    ///
    /// Returns `GitError` if HEAD cannot be resolved.
    pub fn head_sha(&self) -> Result<String, GitError> {
        let head = self.repo.head()?;
        let oid = head.target().ok_or_else(|| GitError::InvalidReference {
            reference: "HEAD".to_string(),
        })?;
        Ok(oid.to_string())
    }

    /// Walk commits oldest first, keeping those that pass the filters
    ///
    /// Patches are rendered only for commits that pass; a patch failure is
    /// stored on the entry instead of aborting the walk.
    ///
    /// # Errors
    ///
    /// Returns `GitError` if the start point cannot be resolved or the
    /// history cannot be walked.
    pub fn walk(&self, options: &WalkOptions) -> Result<Vec<LogEntry>, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME | Sort::REVERSE)?;

        if options.all_branches {
            revwalk.push_glob("refs/heads/*")?;
        } else if let Some(ref from_ref) = options.from_ref {
            let oid = self
                .repo
                .revparse_single(from_ref)
                .map_err(|_| GitError::InvalidReference {
                    reference: from_ref.clone(),
                })?
                .id();
            revwalk.push(oid)?;
        } else {
            revwalk.push_head()?;
        }

        let mut entries = Vec::new();
        let mut visited = 0usize;

        for oid_result in revwalk {
            let oid = oid_result?;
            let git_commit = self.repo.find_commit(oid)?;
            visited += 1;

            let timestamp =
                DateTime::from_timestamp(git_commit.time().seconds(), 0).unwrap_or_default();

            if options.since.is_some_and(|since| timestamp < since) {
                continue;
            }
            if options.until.is_some_and(|until| timestamp >= until) {
                continue;
            }

            let author = git_commit.author();
            let author_name = author.name().unwrap_or("").to_string();
            let author_email = author.email().unwrap_or("").to_string();
            if let Some(ref wanted) = options.author {
                if author_email != *wanted && author_name != *wanted {
                    continue;
                }
            }

            let id = git_commit.id().to_string();
            let message = git_commit.message().map(str::to_string);
            let diff = self.patch_text(&git_commit).map_err(|source| GitError::Diff {
                sha: id.clone(),
                source,
            });

            trace!(commit = %id, "selected commit");
            entries.push(LogEntry {
                id,
                timestamp,
                author_name,
                author_email,
                message,
                diff,
            });
        }

        debug!(visited, selected = entries.len(), "walked history");
        Ok(entries)
    }

    /// Render the full patch of a commit against its first parent
    fn patch_text(&self, git_commit: &git2::Commit<'_>) -> Result<String, git2::Error> {
        let tree = git_commit.tree()?;

        // Root commits diff against the empty tree
        let parent_tree = if git_commit.parent_count() > 0 {
            Some(git_commit.parent(0)?.tree()?)
        } else {
            None
        };

        let mut opts = DiffOptions::new();
        opts.ignore_whitespace(false);

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

        let mut patch = Vec::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                patch.push(line.origin() as u8);
            }
            patch.extend_from_slice(line.content());
            true
        })?;

        Ok(String::from_utf8_lossy(&patch).into_owned())
    }
}
