// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Output assembly
//!
//! Two plain-text artifacts are produced per period: the numbered list of
//! rewritten descriptions and the diff overview. A zip archive holding both
//! is written last. All three are keyed by the period label, so a second run
//! for the same period replaces the first.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use dzielo_git::{ChangeRecord, Period};
use dzielo_rewrite::{RewriteResult, RewriteStatus};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name suffix for the descriptions artifact
pub const DESCRIPTIONS_SUFFIX: &str = "opis_zmian.txt";

/// File name suffix for the diff overview artifact
pub const DIFF_OVERVIEW_SUFFIX: &str = "zmiany.txt";

/// Marker used in place of a description that could not be rewritten
const FALLBACK_MARKER: &str = "[opis niedostępny]";

/// Paths of the artifacts for one period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBundle {
    /// Numbered plain-language descriptions
    pub descriptions_path: PathBuf,
    /// Per-change patches
    pub diff_overview_path: PathBuf,
    /// Zip archive of the two text artifacts
    pub archive_path: PathBuf,
}

impl OutputBundle {
    /// Artifact paths for `author`'s report on `period` under `dir`
    #[must_use]
    pub fn for_period(dir: &Path, period: &Period, author: &str) -> Self {
        let label = period.label();
        Self {
            descriptions_path: dir.join(format!("{label}_{DESCRIPTIONS_SUFFIX}")),
            diff_overview_path: dir.join(format!("{label}_{DIFF_OVERVIEW_SUFFIX}")),
            archive_path: dir.join(format!("dzielo_{}_{label}.zip", archive_author(author))),
        }
    }
}

/// File-name-safe form of the author's local part
///
/// `jan.kowalski@example.com` becomes `jan_kowalski`. Anything outside
/// ASCII alphanumerics, `-` and `_` maps to `_`.
fn archive_author(author: &str) -> String {
    let local = author.split('@').next().unwrap_or(author).trim();
    let safe: String = local
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if safe.is_empty() { "author".to_string() } else { safe }
}

/// Writing an artifact failed
#[derive(Debug, thiserror::Error)]
#[error(
    "failed to write {failed}: {source} (descriptions: {descriptions}, diff overview: {diff_overview}, archive: {archive})"
)]
pub struct OutputError {
    /// The path whose write failed
    pub failed: String,
    /// Intended descriptions path
    pub descriptions: String,
    /// Intended diff overview path
    pub diff_overview: String,
    /// Intended archive path
    pub archive: String,
    /// Underlying I/O error
    #[source]
    pub source: std::io::Error,
}

/// Render the numbered descriptions list
///
/// One entry per record, in record order. Results are matched to records by
/// id; a record without a successful result gets a fallback marker naming
/// the change so the list stays complete.
#[must_use]
pub fn render_descriptions(records: &[ChangeRecord], results: &[RewriteResult]) -> String {
    let by_id: HashMap<&str, &RewriteResult> = results
        .iter()
        .map(|result| (result.source_id.as_str(), result))
        .collect();

    let mut out = String::new();
    for (index, record) in records.iter().enumerate() {
        let text = match by_id.get(record.id.as_str()) {
            Some(result) if result.status == RewriteStatus::Success => {
                result.rewritten_text.clone()
            }
            Some(result) => {
                if let RewriteStatus::Failed(reason) = &result.status {
                    warn!(commit = %record.short_id(), %reason, "using fallback description");
                }
                fallback_line(record)
            }
            None => {
                warn!(commit = %record.short_id(), "no rewrite result, using fallback description");
                fallback_line(record)
            }
        };

        let prefix = format!("{}. ", index + 1);
        let indent = " ".repeat(prefix.len());
        for (line_no, line) in text.lines().enumerate() {
            if line_no == 0 {
                out.push_str(&prefix);
            } else {
                out.push_str(&indent);
            }
            out.push_str(line);
            out.push('\n');
        }
    }

    debug!(entries = records.len(), bytes = out.len(), "rendered descriptions");
    out
}

fn fallback_line(record: &ChangeRecord) -> String {
    let subject = record.subject();
    if subject.is_empty() {
        format!("{FALLBACK_MARKER} {}", record.short_id())
    } else {
        format!("{FALLBACK_MARKER} {} {subject}", record.short_id())
    }
}

/// Render the diff overview
///
/// Records whose diff was unavailable are left out. Each block opens with a
/// `commit` header carrying the full id, date and author, followed by the
/// indented original message and the patch.
#[must_use]
pub fn render_diff_overview(records: &[ChangeRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let Some(diff) = &record.diff else {
            continue;
        };

        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("commit {}\n", record.id));
        out.push_str(&format!("Author: {}\n", record.author));
        out.push_str(&format!(
            "Date:   {}\n\n",
            record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        for line in record.original_message.trim().lines() {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(diff);
        if !diff.is_empty() && !diff.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Write `contents` to `path` atomically
///
/// The data goes to a temporary file in the same directory which then
/// replaces `path`, so readers never observe a partial file.
///
/// # Errors
///
/// Returns the I/O error from creating, writing or renaming the file.
pub fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write a zip archive of `entries` to `path` atomically
///
/// Each entry is a `(name, contents)` pair stored deflated under `name`.
///
/// # Errors
///
/// Returns the I/O error from creating, writing or renaming the archive.
pub fn write_archive(path: &Path, entries: &[(&str, &str)]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut zip = ZipWriter::new(file.as_file_mut());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, contents) in entries {
            zip.start_file(*name, options).map_err(std::io::Error::other)?;
            zip.write_all(contents.as_bytes())?;
        }
        zip.finish().map_err(std::io::Error::other)?;
    }
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// Write the artifacts of `bundle`
///
/// The archive is written after both text files and holds them under their
/// file names.
///
/// # Errors
///
/// Returns `OutputError` naming every intended path if any write fails.
pub fn write_bundle(
    bundle: &OutputBundle,
    descriptions: &str,
    diff_overview: &str,
) -> Result<(), OutputError> {
    let fail = |path: &Path, source: std::io::Error| OutputError {
        failed: path.display().to_string(),
        descriptions: bundle.descriptions_path.display().to_string(),
        diff_overview: bundle.diff_overview_path.display().to_string(),
        archive: bundle.archive_path.display().to_string(),
        source,
    };

    write_atomic(&bundle.diff_overview_path, diff_overview)
        .map_err(|e| fail(&bundle.diff_overview_path, e))?;
    write_atomic(&bundle.descriptions_path, descriptions)
        .map_err(|e| fail(&bundle.descriptions_path, e))?;

    let descriptions_name = file_name(&bundle.descriptions_path);
    let diff_overview_name = file_name(&bundle.diff_overview_path);
    write_archive(
        &bundle.archive_path,
        &[
            (diff_overview_name.as_str(), diff_overview),
            (descriptions_name.as_str(), descriptions),
        ],
    )
    .map_err(|e| fail(&bundle.archive_path, e))?;
    debug!(archive = %bundle.archive_path.display(), "wrote archive");
    Ok(())
}
