// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Rewriting client
//!
//! [`Rewriter`] drives a [`RewriteService`] for a batch of requests, sending
//! each request's own system instruction. Failures
//! never escape as errors: every request yields a [`RewriteResult`], and
//! results are returned in request order regardless of dispatch order.

use crate::error::RewriteError;
use crate::prompt::RewriteRequest;
use crate::service::RewriteService;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound on any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits between attempts
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Shared configuration for a [`Rewriter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriterConfig {
    /// Model identifier passed to the service
    pub model: String,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
    /// Number of requests in flight at once
    pub concurrency: usize,
}

impl RewriterConfig {
    /// Sequential dispatch with the default retry policy
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            retry: RetryPolicy::default(),
            concurrency: 1,
        }
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the number of concurrent requests (minimum 1)
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Outcome of one rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteStatus {
    /// `rewritten_text` holds the cleaned model output
    Success,
    /// The rewrite failed; the reason is kept for logs and markers
    Failed(String),
}

/// Result for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    /// Id of the originating record
    pub source_id: String,
    /// Cleaned model output, empty on failure
    pub rewritten_text: String,
    /// Success or failure
    pub status: RewriteStatus,
    /// Service calls made for this request
    pub attempts: u32,
}

impl RewriteResult {
    fn success(source_id: &str, text: String, attempts: u32) -> Self {
        Self {
            source_id: source_id.to_string(),
            rewritten_text: text,
            status: RewriteStatus::Success,
            attempts,
        }
    }

    fn failed(source_id: &str, reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            source_id: source_id.to_string(),
            rewritten_text: String::new(),
            status: RewriteStatus::Failed(reason.into()),
            attempts,
        }
    }

    /// Whether the rewrite succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RewriteStatus::Success
    }
}

/// Wrapping pairs stripped from model output
const WRAPPERS: &[(&str, &str)] = &[
    ("```", "```"),
    ("\"", "\""),
    ("'", "'"),
    ("`", "`"),
    ("„", "”"),
    ("“", "”"),
    ("«", "»"),
];

/// Normalise model output
///
/// Trims whitespace, strips wrapping quotes, backticks or code fences, and
/// collapses runs of blank lines. Applying it twice gives the same result as
/// applying it once.
#[must_use]
pub fn clean_rewrite(text: &str) -> String {
    let mut current = text.trim();
    loop {
        let stripped = WRAPPERS.iter().find_map(|(open, close)| {
            current
                .strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close))
        });
        match stripped {
            Some(inner) => current = inner.trim(),
            None => break,
        }
    }

    current
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drives a rewriting service over a batch of requests
pub struct Rewriter<S> {
    service: S,
    config: RewriterConfig,
}

impl<S: RewriteService> Rewriter<S> {
    /// Create a rewriter around `service`
    #[must_use]
    pub fn new(service: S, config: RewriterConfig) -> Self {
        Self { service, config }
    }

    /// The shared configuration
    #[must_use]
    pub fn config(&self) -> &RewriterConfig {
        &self.config
    }

    /// The wrapped service
    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Rewrite one request, retrying transient failures
    #[must_use]
    pub fn rewrite(&self, request: &RewriteRequest) -> RewriteResult {
        self.attempt(request).unwrap_or_else(|(err, attempts)| {
            RewriteResult::failed(request.source_id(), err.to_string(), attempts)
        })
    }

    /// Rewrite one request, returning the last error on failure
    fn attempt(&self, request: &RewriteRequest) -> Result<RewriteResult, (RewriteError, u32)> {
        let id = request.source_id();
        if request.prompt.trim().is_empty() {
            return Err((
                RewriteError::Rejected("record has no description to rewrite".to_string()),
                0,
            ));
        }

        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = self
                .service
                .complete(&request.instruction, &request.prompt, &self.config.model)
                .and_then(|raw| {
                    let cleaned = clean_rewrite(&raw);
                    if cleaned.is_empty() {
                        Err(RewriteError::Transient("empty completion".to_string()))
                    } else {
                        Ok(cleaned)
                    }
                });

            match outcome {
                Ok(text) => {
                    debug!(commit = %id, attempt, "rewrite succeeded");
                    return Ok(RewriteResult::success(id, text, attempt));
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.retry.delay_after(attempt);
                    warn!(
                        commit = %id,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient rewrite failure, retrying"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Err(err) => {
                    warn!(commit = %id, attempt, error = %err, "rewrite failed");
                    return Err((err, attempt));
                }
            }
        }
    }

    /// Rewrite every request; results come back in request order
    ///
    /// A fatal service error (credentials, quota, configuration) halts
    /// dispatch, and every request not yet sent is marked failed with the
    /// same reason.
    #[must_use]
    pub fn rewrite_all(&self, requests: &[RewriteRequest]) -> Vec<RewriteResult> {
        info!(
            service = self.service.name(),
            model = %self.config.model,
            requests = requests.len(),
            concurrency = self.config.concurrency,
            "rewriting descriptions"
        );

        let next = AtomicUsize::new(0);
        let halted: Mutex<Option<String>> = Mutex::new(None);
        let slots: Mutex<Vec<(usize, RewriteResult)>> = Mutex::new(Vec::with_capacity(requests.len()));

        let worker = || {
            loop {
                let index = next.fetch_add(1, Ordering::SeqCst);
                let Some(request) = requests.get(index) else {
                    break;
                };

                let halt_reason = halted.lock().ok().and_then(|guard| guard.clone());
                let result = match halt_reason {
                    Some(reason) => RewriteResult::failed(
                        request.source_id(),
                        format!("not attempted: {reason}"),
                        0,
                    ),
                    None => match self.attempt(request) {
                        Ok(result) => result,
                        Err((err, attempts)) => {
                            if err.is_fatal() {
                                error!(error = %err, "fatal rewriting failure, halting dispatch");
                                if let Ok(mut guard) = halted.lock() {
                                    guard.get_or_insert_with(|| err.to_string());
                                }
                            }
                            RewriteResult::failed(request.source_id(), err.to_string(), attempts)
                        }
                    },
                };

                if let Ok(mut guard) = slots.lock() {
                    guard.push((index, result));
                }
            }
        };

        let workers = self.config.concurrency.clamp(1, requests.len().max(1));
        if workers == 1 {
            worker();
        } else {
            std::thread::scope(|scope| {
                for _ in 0..workers {
                    scope.spawn(&worker);
                }
            });
        }

        let mut slots = slots.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner);
        slots.sort_by_key(|(index, _)| *index);
        let results: Vec<RewriteResult> = slots.into_iter().map(|(_, result)| result).collect();

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            succeeded = results.len() - failed,
            failed,
            "rewriting finished"
        );
        results
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: cleaning is idempotent
        #[test]
        fn prop_clean_rewrite_idempotent(text in "[\"'`„”a-z \\n]{0,40}") {
            let once = clean_rewrite(&text);
            prop_assert_eq!(clean_rewrite(&once), once.clone());
        }
    }
}
