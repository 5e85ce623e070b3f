// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! The rewriting service seam

use crate::error::RewriteError;

/// A prompt-in, text-out text generation service
pub trait RewriteService: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Generate a completion for `user` under `system` with `model`
    ///
    /// # Errors
    ///
    /// Returns `RewriteError` classified as transient, fatal, or rejected.
    fn complete(&self, system: &str, user: &str, model: &str) -> Result<String, RewriteError>;
}

impl<S: RewriteService + ?Sized> RewriteService for &S {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn complete(&self, system: &str, user: &str, model: &str) -> Result<String, RewriteError> {
        (**self).complete(system, user, model)
    }
}
