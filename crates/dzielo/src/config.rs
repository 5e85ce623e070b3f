// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Configuration for the dzielo command
//!
//! This module provides the command-line surface, its environment fallbacks,
//! and the fail-fast validation that runs before any repository work.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use dzielo_git::{Period, PeriodError, PeriodSelector};
use dzielo_rewrite::{PromptBuilder, RetryPolicy, RewriterConfig};

use crate::pipeline::PipelineConfig;

/// Dzielo - monthly plain-language change reports from git history
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "dzielo")]
#[command(version, about, long_about = None)]
#[command(group(
    ArgGroup::new("period")
        .args(["this_month", "previous_month", "custom"])
        .multiple(false)
))]
pub struct Config {
    /// Process changes from the current month (default)
    #[arg(long, default_value = "false")]
    pub this_month: bool,

    /// Process changes from the previous month
    #[arg(long, default_value = "false")]
    pub previous_month: bool,

    /// Process an explicit month and year, e.g. `--custom 6 2023`
    #[arg(long, num_args = 2, value_names = ["MONTH", "YEAR"], allow_negative_numbers = true)]
    pub custom: Option<Vec<i32>>,

    /// Author email or name, matched exactly
    #[arg(short, long, env = "DZIELO_AUTHOR")]
    pub author: Option<String>,

    /// Path to the git repository
    ///
    /// Defaults to the current directory.
    #[arg(short, long, env = "DZIELO_REPO")]
    pub repo: Option<PathBuf>,

    /// Directory for the output files
    ///
    /// Created if missing. Defaults to `output`.
    #[arg(short, long, env = "DZIELO_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Model used to rewrite descriptions
    #[arg(short, long, env = "DZIELO_MODEL")]
    pub model: Option<String>,

    /// API key for the rewriting service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub api_base: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Attempts per description before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Initial backoff between attempts in milliseconds
    #[arg(long)]
    pub backoff_ms: Option<u64>,

    /// Number of rewriting requests in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Keep only commits whose subject starts with this text (e.g. "Merged PR")
    #[arg(long)]
    pub subject_prefix: Option<String>,

    /// Read history from every local branch instead of HEAD only
    #[arg(long, default_value = "false")]
    pub all_branches: bool,

    /// Read the system instruction from this file instead of the built-in one
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Config {
    /// Default output directory
    pub const DEFAULT_OUTPUT_DIR: &'static str = "output";

    /// Default model
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    /// Default per-request timeout in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// The period selector implied by the flags
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCustomMonth` for a negative month.
    pub fn selector(&self) -> Result<PeriodSelector, ConfigError> {
        if self.previous_month {
            return Ok(PeriodSelector::PreviousMonth);
        }
        if let Some(values) = &self.custom {
            if let [month, year] = values.as_slice() {
                let month =
                    u32::try_from(*month).map_err(|_| ConfigError::InvalidCustomMonth(*month))?;
                return Ok(PeriodSelector::Explicit { month, year: *year });
            }
            return Err(ConfigError::MalformedCustomPeriod(values.len()));
        }
        Ok(PeriodSelector::CurrentMonth)
    }

    /// Get the repository path, using the current directory as default
    #[must_use]
    pub fn repo_path(&self) -> PathBuf {
        self.repo.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the output directory, using `output` as default
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_OUTPUT_DIR))
    }

    /// Get the model identifier
    #[must_use]
    pub fn model_name(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string())
    }

    /// Per-request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(Self::DEFAULT_TIMEOUT_SECS))
    }

    /// Retry policy from `--max-attempts` and `--backoff-ms`
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default();
        if let Some(attempts) = self.max_attempts {
            policy.max_attempts = attempts;
        }
        if let Some(backoff) = self.backoff_ms {
            policy.initial_backoff = Duration::from_millis(backoff);
        }
        policy
    }

    /// Prompt builder, from `--prompt-file` or the built-in instruction
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::PromptFile` if the file cannot be read.
    pub fn prompt_builder(&self) -> Result<PromptBuilder, ConfigError> {
        match &self.prompt_file {
            Some(path) => PromptBuilder::from_file(path)
                .map_err(|e| ConfigError::PromptFile(path.clone(), e)),
            None => Ok(PromptBuilder::default()),
        }
    }

    /// Rewriter settings: model, retries and concurrency
    ///
    /// The system instruction travels with each request, see
    /// [`Config::prompt_builder`].
    #[must_use]
    pub fn rewriter_config(&self) -> RewriterConfig {
        RewriterConfig::new(self.model_name())
            .with_retry(self.retry_policy())
            .with_concurrency(self.concurrency.unwrap_or(1))
    }

    /// Pipeline settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the author or period flags are invalid.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        let author = self
            .author
            .clone()
            .filter(|a| !a.trim().is_empty())
            .ok_or(ConfigError::MissingAuthor)?;

        Ok(PipelineConfig {
            author,
            selector: self.selector()?,
            output_dir: self.output_path(),
            subject_prefix: self.subject_prefix.clone().filter(|p| !p.is_empty()),
            all_branches: self.all_branches,
        })
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The author or API key is missing
    /// - An explicit period names an invalid month
    /// - The repository path doesn't exist or isn't a directory
    /// - Attempts, concurrency or the timeout are zero
    /// - The temperature is negative or not finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let PeriodSelector::Explicit { month, year } = self.selector()? {
            Period::month(year, month)?;
        }

        if self.author.as_deref().is_none_or(|a| a.trim().is_empty()) {
            return Err(ConfigError::MissingAuthor);
        }

        if self.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(ConfigError::MissingApiKey);
        }

        let repo = self.repo_path();
        if !repo.exists() {
            return Err(ConfigError::RepositoryNotFound(repo));
        }
        if !repo.is_dir() {
            return Err(ConfigError::RepositoryNotDirectory(repo));
        }

        if self.max_attempts == Some(0) {
            return Err(ConfigError::InvalidSetting(
                "--max-attempts must be at least 1".to_string(),
            ));
        }
        if self.concurrency == Some(0) {
            return Err(ConfigError::InvalidSetting(
                "--concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidSetting(
                "--timeout-secs must be at least 1".to_string(),
            ));
        }
        if let Some(temperature) = self.temperature {
            if !temperature.is_finite() || temperature < 0.0 {
                return Err(ConfigError::InvalidSetting(format!(
                    "--temperature must be a non-negative number, got {temperature}"
                )));
            }
        }

        Ok(())
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Explicit period failed to resolve
    #[error(transparent)]
    Period(#[from] PeriodError),

    /// `--custom` month was negative
    #[error("invalid period: month must be between 1 and 12, got {0}")]
    InvalidCustomMonth(i32),

    /// `--custom` did not carry exactly a month and a year
    #[error("invalid period: --custom expects MONTH YEAR, got {0} values")]
    MalformedCustomPeriod(usize),

    /// No author given
    #[error("author not set: pass --author or set DZIELO_AUTHOR")]
    MissingAuthor,

    /// No API key given
    #[error("API key not set: pass --api-key or set OPENAI_API_KEY")]
    MissingApiKey,

    /// Repository path not found
    #[error("Repository path not found: {0}")]
    RepositoryNotFound(PathBuf),

    /// Repository path is not a directory
    #[error("Repository path is not a directory: {0}")]
    RepositoryNotDirectory(PathBuf),

    /// Prompt file unreadable
    #[error("Failed to read prompt file {0}: {1}")]
    PromptFile(PathBuf, std::io::Error),

    /// Out-of-range numeric setting
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}
