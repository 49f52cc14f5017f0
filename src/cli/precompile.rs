//! Batch precompilation of every template under the document root.
//!
//! Each discovered file is sent a `?jsp_precompile` request, exactly as
//! external precompile tooling would, so templates are compiled through the
//! same cache and wrappers that serve live traffic. Work is spread over
//! `--jobs` threads sharing one runtime.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;

use super::common::{build_dispatcher, discover_templates, load_config};
use crate::constants::PRECOMPILE;
use crate::core::SourceIdentity;
use crate::dispatch::Dispatcher;
use crate::request::TemplateRequest;

#[derive(Debug, Args)]
pub struct PrecompileCommand {
    /// Document root (overrides `root` from the config file)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Number of compiler threads (defaults to the number of CPUs)
    #[arg(long, value_name = "NUMBER")]
    pub jobs: Option<usize>,
}

/// Outcome of a batch precompilation.
#[derive(Debug, Default)]
pub struct PrecompileReport {
    pub compiled: usize,
    pub failures: Vec<(SourceIdentity, String)>,
}

impl PrecompileCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = load_config(config_path, self.root).await?;
        let patterns = config.template_patterns()?;
        let dispatcher = build_dispatcher(&config)?;
        let jobs = self
            .jobs
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get));

        let root = config.root.clone();
        let report = tokio::task::spawn_blocking(move || -> Result<PrecompileReport> {
            let identities = discover_templates(&root, &patterns)?;
            Ok(precompile_all(&dispatcher, &identities, jobs))
        })
        .await
        .context("Precompile task failed")??;

        for (identity, reason) in &report.failures {
            eprintln!("{} {}: {}", "✗".red(), identity, reason);
        }
        println!(
            "{} {} template(s) compiled, {} failed",
            if report.failures.is_empty() { "✓".green() } else { "✗".red() },
            report.compiled,
            report.failures.len()
        );

        if !report.failures.is_empty() {
            bail!("{} template(s) failed to compile", report.failures.len());
        }
        Ok(())
    }
}

/// Precompile `identities` on `jobs` threads.
pub fn precompile_all(dispatcher: &Dispatcher, identities: &[SourceIdentity], jobs: usize) -> PrecompileReport {
    let next = AtomicUsize::new(0);
    let compiled = AtomicUsize::new(0);
    let failures = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for _ in 0..jobs.clamp(1, identities.len().max(1)) {
            scope.spawn(|| {
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(identity) = identities.get(index) else {
                        break;
                    };

                    let request = TemplateRequest::for_path(identity.as_str()).with_query(PRECOMPILE);
                    match dispatcher.service(&request) {
                        Ok(_) => {
                            tracing::debug!(target: "cli", "Precompiled {}", identity);
                            compiled.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => failures
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push((identity.clone(), e.to_string())),
                    }
                }
            });
        }
    });

    let mut failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
    failures.sort();
    PrecompileReport {
        compiled: compiled.into_inner(),
        failures,
    }
}
