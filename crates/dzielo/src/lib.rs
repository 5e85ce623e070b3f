// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! dzielo library
//!
//! This module exports the run pipeline, its configuration and the output
//! assembler for use by the binary and in integration tests.

pub mod config;
pub mod output;
pub mod pipeline;

pub use config::{Config, ConfigError};
pub use output::{OutputBundle, OutputError};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, RunSummary};
