//! Common utilities for CLI commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

use crate::compiler::TeraCompiler;
use crate::config::RuntimeConfig;
use crate::core::SourceIdentity;
use crate::dispatch::Dispatcher;
use crate::runtime::RuntimeContext;
use crate::source::FsSourceStore;

/// Load the configuration and apply a `--root` override.
pub async fn load_config(config_path: Option<PathBuf>, root: Option<PathBuf>) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::load_with_optional(config_path).await?;
    if let Some(root) = root {
        config.root = root;
    }
    Ok(config)
}

/// Build a dispatcher serving `config.root` with Tera.
pub fn build_dispatcher(config: &RuntimeConfig) -> Result<Dispatcher> {
    if !config.root.is_dir() {
        bail!("Document root {} is not a directory", config.root.display());
    }

    let runtime = RuntimeContext::new(
        Arc::new(TeraCompiler::new()),
        Arc::new(FsSourceStore::new(&config.root)),
        config.options(),
    );
    let mut dispatcher = Dispatcher::new(Arc::new(runtime));
    if let Some(page) = config.error_page_identity()? {
        dispatcher = dispatcher.with_error_page(page);
    }

    tracing::debug!(
        target: "cli",
        "Serving {} (development: {}, check interval: {}s)",
        config.root.display(),
        config.development,
        config.check_interval_secs
    );
    Ok(dispatcher)
}

/// Identities of every file under `root` matching one of `patterns`, sorted.
///
/// Patterns match the path relative to the root with `/` separators.
pub fn discover_templates(root: &Path, patterns: &[glob::Pattern]) -> Result<Vec<SourceIdentity>> {
    let mut identities = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if patterns.iter().any(|p| p.matches(&relative)) {
            identities.push(SourceIdentity::parse(&relative)?);
        }
    }

    identities.sort();
    Ok(identities)
}
