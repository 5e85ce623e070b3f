// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for dzielo-git

use thiserror::Error;

/// Errors that can occur while reading repository history
#[derive(Debug, Error)]
pub enum GitError {
    /// Error from git2 library
    #[error("git operation failed: {0}")]
    Git2(#[from] git2::Error),

    /// Repository not found at the specified path
    #[error("repository not found: {path}")]
    RepositoryNotFound {
        /// The path that was searched for a repository
        path: String,
    },

    /// Start reference (branch, tag, or SHA) could not be resolved
    #[error("invalid commit reference: {reference}")]
    InvalidReference {
        /// The reference string that could not be resolved
        reference: String,
    },

    /// The patch for a single commit could not be produced
    #[error("diff unavailable for commit {sha}: {source}")]
    Diff {
        /// Commit whose patch failed
        sha: String,
        /// Underlying git2 failure
        #[source]
        source: git2::Error,
    },
}
