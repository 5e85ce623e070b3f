// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Prompt construction
//!
//! Every request built by one [`PromptBuilder`] shares its system
//! instruction. The user payload is the original commit message only;
//! patches are never sent.

use dzielo_git::ChangeRecord;
use std::path::Path;
use std::sync::Arc;

/// Default system instruction: Polish, non-technical, benefit-framed
pub const SYSTEM_INSTRUCTION: &str = "\
Jesteś asystentem, który przepisuje techniczne opisy zmian w oprogramowaniu na \
prosty język zrozumiały dla osób nietechnicznych, na potrzeby dokumentacji \
administracyjnej.

Zasady:
- Odpowiadaj wyłącznie po polsku.
- Pisz dla odbiorcy bez wiedzy technicznej; unikaj żargonu i nazw z kodu.
- Przedstawiaj zmianę pozytywnie, podkreślając korzyść dla użytkowników lub organizacji.
- Usuń wszystkie identyfikatory techniczne: numery zgłoszeń i zadań (np. ABC-123, #456), \
prefiksy typu \"Merged PR 123:\", etykiety rodzaju zmiany (np. feat:, fix:, chore:, refactor:) \
oraz znaczniki w stylu funkcji (np. feat(auth):, fix(api):).
- Zwróć jedno lub dwa zdania, bez numeracji, cudzysłowów i formatowania Markdown.";

/// One rewriting request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    /// The record this request was built from
    pub source: ChangeRecord,
    /// System instruction, shared by every request of the builder
    pub instruction: Arc<str>,
    /// User payload sent to the service
    pub prompt: String,
}

impl RewriteRequest {
    /// Id of the originating record
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source.id
    }
}

/// Maps change records to rewriting requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    instruction: Arc<str>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::with_instruction(SYSTEM_INSTRUCTION)
    }
}

impl PromptBuilder {
    /// Use a custom system instruction
    #[must_use]
    pub fn with_instruction(instruction: impl Into<String>) -> Self {
        Self {
            instruction: Arc::from(instruction.into()),
        }
    }

    /// Load the system instruction from a text file
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let instruction = std::fs::read_to_string(path)?;
        Ok(Self::with_instruction(instruction.trim()))
    }

    /// The run-wide system instruction
    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Build the request for one record
    #[must_use]
    pub fn build(&self, record: &ChangeRecord) -> RewriteRequest {
        RewriteRequest {
            source: record.clone(),
            instruction: Arc::clone(&self.instruction),
            prompt: record.original_message.trim().to_string(),
        }
    }

    /// Build requests for every record, preserving order
    #[must_use]
    pub fn build_all(&self, records: &[ChangeRecord]) -> Vec<RewriteRequest> {
        records.iter().map(|record| self.build(record)).collect()
    }
}
