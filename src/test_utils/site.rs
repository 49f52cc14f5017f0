//! Temporary document roots served by the real compiler and store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::cache::WrapperOptions;
use crate::compiler::TeraCompiler;
use crate::dispatch::Dispatcher;
use crate::runtime::RuntimeContext;
use crate::source::FsSourceStore;

/// A document root in a temporary directory.
pub struct TestSite {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestSite {
    /// Create an empty site.
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("site");
        fs::create_dir_all(&root)?;

        Ok(Self {
            temp_dir,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` to `path` below the root, creating parent directories.
    pub fn write(&self, path: &str, content: &str) -> Result<PathBuf> {
        let full_path = self.root.join(path.trim_start_matches('/'));
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, content)
            .with_context(|| format!("Failed to write {}", full_path.display()))?;
        Ok(full_path)
    }

    /// Delete the source at `path`.
    pub fn remove(&self, path: &str) -> Result<()> {
        let full_path = self.root.join(path.trim_start_matches('/'));
        fs::remove_file(&full_path)
            .with_context(|| format!("Failed to remove {}", full_path.display()))
    }

    /// A runtime serving this site with Tera.
    ///
    /// In development mode sources are checked on every request.
    pub fn runtime(&self, development: bool) -> Arc<RuntimeContext> {
        Arc::new(RuntimeContext::new(
            Arc::new(TeraCompiler::new()),
            Arc::new(FsSourceStore::new(&self.root)),
            WrapperOptions {
                development,
                check_interval: Duration::ZERO,
            },
        ))
    }

    /// A dispatcher over [`runtime`](Self::runtime).
    pub fn dispatcher(&self, development: bool) -> Dispatcher {
        Dispatcher::new(self.runtime(development))
    }
}
