// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! End-to-end run: period, history, rewriting, output

use std::path::PathBuf;

use chrono::NaiveDate;
use dzielo_git::{
    GitError, HistoryQuery, HistorySource, Period, PeriodError, PeriodSelector, extract_history,
};
use dzielo_rewrite::{PromptBuilder, RewriteService, Rewriter};
use tracing::{debug, info, warn};

use crate::output::{self, OutputBundle, OutputError};

/// Settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Author email or name
    pub author: String,
    /// Which month to process
    pub selector: PeriodSelector,
    /// Directory receiving the artifacts
    pub output_dir: PathBuf,
    /// Optional subject prefix filter
    pub subject_prefix: Option<String>,
    /// Walk every local branch
    pub all_branches: bool,
}

/// What a run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// The processed period
    pub period: Period,
    /// Where the artifacts were written
    pub bundle: OutputBundle,
    /// Matching change records
    pub records: usize,
    /// Successful rewrites
    pub rewritten: usize,
    /// Descriptions written with the fallback marker
    pub failed: usize,
    /// Records kept without a patch
    pub diffs_missing: usize,
    /// Commits dropped for lacking both message and patch
    pub dropped: usize,
}

/// A run stage failed
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Period selector could not be resolved
    #[error("period resolution failed: {0}")]
    Period(#[from] PeriodError),

    /// Output directory could not be created
    #[error("output directory {path} is not usable: {source}")]
    OutputDirectory {
        /// The directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Repository history could not be read
    #[error("history extraction failed: {0}")]
    Extraction(#[from] GitError),

    /// An artifact could not be written
    #[error("output failed: {0}")]
    OutputWrite(#[from] OutputError),
}

/// Runs the stages in order, stopping at the first failing stage
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    prompts: PromptBuilder,
}

impl Pipeline {
    /// Create a pipeline
    #[must_use]
    pub fn new(config: PipelineConfig, prompts: PromptBuilder) -> Self {
        Self { config, prompts }
    }

    /// The run settings
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve the configured period relative to `today`
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Period` for an invalid explicit month.
    pub fn resolve_period(&self, today: NaiveDate) -> Result<Period, PipelineError> {
        Ok(Period::resolve(self.config.selector, today)?)
    }

    /// Execute a run
    ///
    /// Individual rewrite failures never fail the run; they show up as
    /// fallback entries. The artifacts are written even when no change
    /// matched.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` naming the stage that failed.
    pub fn run<H, S>(
        &self,
        history: &H,
        rewriter: &Rewriter<S>,
        today: NaiveDate,
    ) -> Result<RunSummary, PipelineError>
    where
        H: HistorySource + ?Sized,
        S: RewriteService,
    {
        let period = self.resolve_period(today)?;
        info!(%period, author = %self.config.author, "processing period");

        std::fs::create_dir_all(&self.config.output_dir).map_err(|source| {
            PipelineError::OutputDirectory {
                path: self.config.output_dir.clone(),
                source,
            }
        })?;
        let bundle =
            OutputBundle::for_period(&self.config.output_dir, &period, &self.config.author);

        let mut query = HistoryQuery::new(self.config.author.clone(), period);
        if let Some(prefix) = &self.config.subject_prefix {
            query = query.with_subject_prefix(prefix.clone());
        }
        if self.config.all_branches {
            query = query.across_branches();
        }
        let history = extract_history(history, &query)?;

        if history.is_empty() {
            warn!(%period, author = %self.config.author, "no changes found for period");
        }

        let requests = self.prompts.build_all(&history.records);
        debug!(requests = requests.len(), "built rewrite requests");
        let results = if requests.is_empty() {
            Vec::new()
        } else {
            rewriter.rewrite_all(&requests)
        };

        let descriptions = output::render_descriptions(&history.records, &results);
        let diff_overview = output::render_diff_overview(&history.records);
        output::write_bundle(&bundle, &descriptions, &diff_overview)?;

        let rewritten = results.iter().filter(|r| r.is_success()).count();
        let summary = RunSummary {
            period,
            bundle,
            records: history.records.len(),
            rewritten,
            failed: history.records.len() - rewritten,
            diffs_missing: history.diff_failures.len(),
            dropped: history.dropped.len(),
        };
        info!(
            records = summary.records,
            rewritten = summary.rewritten,
            failed = summary.failed,
            descriptions = %summary.bundle.descriptions_path.display(),
            diff_overview = %summary.bundle.diff_overview_path.display(),
            archive = %summary.bundle.archive_path.display(),
            "wrote outputs"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use dzielo_git::LogEntry;
    use dzielo_rewrite::{RetryPolicy, RewriteError, RewriterConfig};
    use similar_asserts::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubLog(Vec<(String, DateTime<Utc>, &'static str, Option<&'static str>)>);

    impl HistorySource for StubLog {
        fn entries(&self, _query: &HistoryQuery) -> Result<Vec<LogEntry>, GitError> {
            Ok(self
                .0
                .iter()
                .map(|(id, timestamp, message, diff)| LogEntry {
                    id: id.clone(),
                    timestamp: *timestamp,
                    author_name: "Anna".to_string(),
                    author_email: "anna@example.com".to_string(),
                    message: Some((*message).to_string()),
                    diff: diff.map(str::to_string).ok_or_else(|| GitError::Diff {
                        sha: id.clone(),
                        source: git2::Error::from_str("object not found"),
                    }),
                })
                .collect())
        }
    }

    struct BrokenLog;

    impl HistorySource for BrokenLog {
        fn entries(&self, _query: &HistoryQuery) -> Result<Vec<LogEntry>, GitError> {
            Err(GitError::InvalidReference {
                reference: "HEAD".to_string(),
            })
        }
    }

    /// Prefixes every prompt; fails on "fail"
    #[derive(Default)]
    struct EchoService {
        calls: AtomicUsize,
    }

    impl RewriteService for EchoService {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn complete(&self, _system: &str, user: &str, _model: &str) -> Result<String, RewriteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if user.contains("fail") {
                Err(RewriteError::Rejected("400".to_string()))
            } else {
                Ok(format!("Opis: {user}"))
            }
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    fn pipeline(dir: &std::path::Path, selector: PeriodSelector) -> Pipeline {
        Pipeline::new(
            PipelineConfig {
                author: "anna@example.com".to_string(),
                selector,
                output_dir: dir.to_path_buf(),
                subject_prefix: None,
                all_branches: false,
            },
            PromptBuilder::default(),
        )
    }

    fn rewriter() -> Rewriter<EchoService> {
        Rewriter::new(
            EchoService::default(),
            RewriterConfig::new("m").with_retry(RetryPolicy::immediate(1)),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
    }

    #[test]
    fn test_run_writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let log = StubLog(vec![
            ("b".repeat(40), at(8), "fix: totals", Some("+b\n")),
            ("a".repeat(40), at(5), "feat: export", Some("+a\n")),
        ]);

        let summary = pipeline(dir.path(), PeriodSelector::PreviousMonth)
            .run(&log, &rewriter(), today())
            .unwrap();

        assert_eq!(summary.records, 2);
        assert_eq!(summary.rewritten, 2);
        assert_eq!(summary.period, Period::month(2024, 3).unwrap());
        let descriptions = std::fs::read_to_string(&summary.bundle.descriptions_path).unwrap();
        assert_eq!(descriptions, "1. Opis: feat: export\n2. Opis: fix: totals\n");
        let overview = std::fs::read_to_string(&summary.bundle.diff_overview_path).unwrap();
        assert!(overview.find("+a").unwrap() < overview.find("+b").unwrap());
        assert_eq!(summary.bundle.archive_path, dir.path().join("dzielo_anna_2024_03.zip"));
        assert!(summary.bundle.archive_path.is_file());
    }

    /// Records the system instruction of every call
    #[derive(Default)]
    struct SystemCapture {
        seen: std::sync::Mutex<Vec<String>>,
    }

    impl RewriteService for SystemCapture {
        fn name(&self) -> &'static str {
            "capture"
        }

        fn complete(&self, system: &str, _user: &str, _model: &str) -> Result<String, RewriteError> {
            self.seen.lock().unwrap().push(system.to_string());
            Ok("Opis.".to_string())
        }
    }

    #[test]
    fn test_prompt_file_instruction_reaches_service() {
        let dir = tempfile::tempdir().unwrap();
        let log = StubLog(vec![
            ("a".repeat(40), at(5), "feat: export", Some("+a\n")),
            ("b".repeat(40), at(8), "fix: totals", Some("+b\n")),
        ]);
        let pipeline = Pipeline::new(
            pipeline(dir.path(), PeriodSelector::PreviousMonth).config().clone(),
            PromptBuilder::with_instruction("Pisz krótko."),
        );
        let rewriter = Rewriter::new(SystemCapture::default(), RewriterConfig::new("m"));

        pipeline.run(&log, &rewriter, today()).unwrap();

        let seen = rewriter.service().seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["Pisz krótko.".to_string(), "Pisz krótko.".to_string()]);
    }

    #[test]
    fn test_failed_rewrite_does_not_fail_run() {
        let dir = tempfile::tempdir().unwrap();
        let log = StubLog(vec![
            ("a".repeat(40), at(5), "please fail", Some("+a\n")),
            ("b".repeat(40), at(8), "fix: totals", Some("+b\n")),
        ]);

        let summary = pipeline(dir.path(), PeriodSelector::PreviousMonth)
            .run(&log, &rewriter(), today())
            .unwrap();

        assert_eq!(summary.failed, 1);
        let descriptions = std::fs::read_to_string(&summary.bundle.descriptions_path).unwrap();
        assert_eq!(
            descriptions,
            "1. [opis niedostępny] aaaaaaa please fail\n2. Opis: fix: totals\n"
        );
    }

    #[test]
    fn test_missing_diff_keeps_description() {
        let dir = tempfile::tempdir().unwrap();
        let log = StubLog(vec![("a".repeat(40), at(5), "feat: export", None)]);

        let summary = pipeline(dir.path(), PeriodSelector::PreviousMonth)
            .run(&log, &rewriter(), today())
            .unwrap();

        assert_eq!(summary.diffs_missing, 1);
        assert_eq!(summary.rewritten, 1);
        let overview = std::fs::read_to_string(&summary.bundle.diff_overview_path).unwrap();
        assert_eq!(overview, "");
    }

    #[test]
    fn test_empty_period_writes_empty_artifacts_without_calls() {
        let dir = tempfile::tempdir().unwrap();
        let rewriter = rewriter();
        let summary = pipeline(dir.path(), PeriodSelector::CurrentMonth)
            .run(&StubLog(vec![("a".repeat(40), at(5), "x", None)]), &rewriter, today())
            .unwrap();

        assert_eq!(summary.records, 0);
        assert_eq!(std::fs::read_to_string(&summary.bundle.descriptions_path).unwrap(), "");
        assert_eq!(std::fs::read_to_string(&summary.bundle.diff_overview_path).unwrap(), "");
    }

    #[test]
    fn test_invalid_period_fails_before_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let err = pipeline(&out, PeriodSelector::Explicit { month: 13, year: 2024 })
            .run(&StubLog(vec![]), &rewriter(), today())
            .unwrap_err();

        assert!(matches!(err, PipelineError::Period(PeriodError::InvalidMonth { month: 13 })));
        assert!(!out.exists());
    }

    #[test]
    fn test_extraction_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline(dir.path(), PeriodSelector::PreviousMonth)
            .run(&BrokenLog, &rewriter(), today())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(_)));
    }

    #[test]
    fn test_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("output");
        let summary = pipeline(&out, PeriodSelector::Explicit { month: 3, year: 2024 })
            .run(&StubLog(vec![]), &rewriter(), today())
            .unwrap();
        assert!(summary.bundle.descriptions_path.starts_with(&out));
        assert!(summary.bundle.descriptions_path.exists());
    }
}
