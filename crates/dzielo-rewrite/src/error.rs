// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for dzielo-rewrite

use thiserror::Error;

/// Failures reported by a rewriting service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// Network failure, rate limit, server error, or malformed response
    #[error("transient rewriting failure: {0}")]
    Transient(String),

    /// Credentials were rejected
    #[error("rewriting service rejected the credentials: {0}")]
    Unauthorized(String),

    /// Account quota or billing limit reached
    #[error("rewriting service quota exhausted: {0}")]
    QuotaExhausted(String),

    /// The service refused this particular request
    #[error("rewriting request rejected: {0}")]
    Rejected(String),

    /// The client is missing required configuration
    #[error("rewriting service not configured: {0}")]
    NotConfigured(String),
}

impl RewriteError {
    /// Whether another attempt may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Whether every later request will fail the same way
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::QuotaExhausted(_) | Self::NotConfigured(_)
        )
    }
}
