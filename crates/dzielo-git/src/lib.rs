// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! dzielo-git: period resolution and history extraction for dzielo
//!
//! This library crate turns a period selector into a concrete date range and
//! collects one author's commits (with full patch text) from a git repository
//! for that range.

#![warn(missing_docs)]

//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use dzielo_git::{GitRepo, HistoryQuery, Period, PeriodSelector, extract_history};
//!
//! let today = NaiveDate::from_ymd_opt(2024, 4, 2).expect("valid date");
//! let period = Period::resolve(PeriodSelector::PreviousMonth, today).expect("period");
//! let repo = GitRepo::open(".").expect("open repo");
//! let history = extract_history(&repo, &HistoryQuery::new("dev@example.com", period))
//!     .expect("extract history");
//!
//! for record in &history.records {
//!     println!("{} - {}", record.short_id(), record.subject());
//! }
//! ```

pub mod change;
pub mod error;
pub mod history;
pub mod period;
pub mod repo;

pub use change::ChangeRecord;
pub use error::GitError;
pub use history::{DiffUnavailable, History, HistoryQuery, HistorySource, extract_history};
pub use period::{Period, PeriodError, PeriodSelector};
pub use repo::{GitRepo, LogEntry, WalkOptions};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::change::ChangeRecord;
    pub use crate::error::GitError;
    pub use crate::history::{History, HistoryQuery, HistorySource, extract_history};
    pub use crate::period::{Period, PeriodSelector};
    pub use crate::repo::GitRepo;
}
