// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! dzielo-rewrite: plain-language rewriting of change descriptions
//!
//! This library crate maps change records to rewriting requests, sends them
//! to an OpenAI-compatible chat-completions service with bounded retries, and
//! reports one [`RewriteResult`] per record.

#![warn(missing_docs)]

//! # Example
//!
//! ```no_run
//! use dzielo_rewrite::{OpenAiService, PromptBuilder, Rewriter, RewriterConfig};
//!
//! let builder = PromptBuilder::default();
//! let service = OpenAiService::new("sk-example");
//! let rewriter = Rewriter::new(service, RewriterConfig::new("gpt-4o-mini"));
//!
//! let requests = builder.build_all(&[]);
//! for result in rewriter.rewrite_all(&requests) {
//!     println!("{}: {}", result.source_id, result.rewritten_text);
//! }
//! ```

pub mod client;
pub mod error;
pub mod openai;
pub mod prompt;
pub mod service;

pub use client::{RetryPolicy, RewriteResult, RewriteStatus, Rewriter, RewriterConfig, clean_rewrite};
pub use error::RewriteError;
pub use openai::OpenAiService;
pub use prompt::{PromptBuilder, RewriteRequest, SYSTEM_INSTRUCTION};
pub use service::RewriteService;
