// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! dzielo: monthly plain-language change reports
//!
//! Collects one author's commits for a month, rewrites each description in
//! plain Polish through an OpenAI-compatible API and writes the description
//! list, the diff overview and a zip archive of both to the output
//! directory.

use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use dzielo::{Config, Pipeline};
use dzielo_git::GitRepo;
use dzielo_rewrite::{OpenAiService, Rewriter};
use tracing::info;

fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level().into()),
        )
        .init();

    let started = Instant::now();
    config.validate().context("invalid configuration")?;

    let prompts = config.prompt_builder()?;
    let mut service = OpenAiService::new(config.api_key.clone().unwrap_or_default())
        .with_timeout(config.timeout());
    if let Some(endpoint) = &config.api_base {
        service = service.with_endpoint(endpoint.clone());
    }
    if let Some(temperature) = config.temperature {
        service = service.with_temperature(Some(temperature));
    }
    let rewriter = Rewriter::new(service, config.rewriter_config());

    let pipeline = Pipeline::new(config.pipeline_config()?, prompts);
    let repo_path = config.repo_path();
    let repo = GitRepo::open(&repo_path)
        .with_context(|| format!("failed to open repository at {}", repo_path.display()))?;

    info!(repo = %repo_path.display(), "starting dzielo");
    let summary = pipeline.run(&repo, &rewriter, chrono::Local::now().date_naive())?;

    info!(
        period = %summary.period,
        records = summary.records,
        rewritten = summary.rewritten,
        failed = summary.failed,
        diffs_missing = summary.diffs_missing,
        dropped = summary.dropped,
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "done"
    );
    println!("{}", summary.bundle.descriptions_path.display());
    println!("{}", summary.bundle.diff_overview_path.display());
    println!("{}", summary.bundle.archive_path.display());
    Ok(())
}
