//! Runtime context: cache ownership, process counters and teardown.
//!
//! A [`RuntimeContext`] owns the [`WrapperCache`] and the collaborators its
//! wrappers share. It exposes the monitoring counters (loaded and reloaded
//! templates) and the one-shot [`teardown`](RuntimeContext::teardown) run at
//! shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cache::{WrapperCache, WrapperEnv, WrapperOptions};
use crate::compiler::Compiler;
use crate::source::SourceStore;

/// Outcome of [`RuntimeContext::teardown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Wrappers whose artifact was released cleanly
    pub released: usize,
    /// Wrappers whose release failed (logged, not fatal)
    pub failed: usize,
}

/// Owner of the wrapper cache and process-wide counters.
pub struct RuntimeContext {
    cache: WrapperCache,
    store: Arc<dyn SourceStore>,
    reloads: Arc<AtomicUsize>,
}

impl RuntimeContext {
    /// Build a runtime around `compiler` and `store`.
    pub fn new(
        compiler: Arc<dyn Compiler>,
        store: Arc<dyn SourceStore>,
        options: WrapperOptions,
    ) -> Self {
        let reloads = Arc::new(AtomicUsize::new(0));
        let env = Arc::new(WrapperEnv {
            compiler,
            store: Arc::clone(&store),
            reloads: Arc::clone(&reloads),
            options,
        });

        Self {
            cache: WrapperCache::new(env),
            store,
            reloads,
        }
    }

    pub fn cache(&self) -> &WrapperCache {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn SourceStore> {
        &self.store
    }

    /// Number of templates with a loaded wrapper.
    pub fn loaded_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of recompilations of already compiled templates.
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::Acquire)
    }

    /// Reset the reload counter, typically to establish a baseline.
    pub fn set_reload_count(&self, count: usize) {
        self.reloads.store(count, Ordering::Release);
    }

    /// Release every wrapper and refuse new ones.
    ///
    /// Release failures are logged and counted but never interrupt teardown.
    /// Calling this again is a no-op returning an empty report.
    pub fn teardown(&self) -> TeardownReport {
        let entries = self.cache.close();
        let mut report = TeardownReport::default();

        for entry in entries {
            match entry.destroy() {
                Ok(()) => report.released += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(target: "runtime", "Failed to release {}: {e:#}", entry.identity());
                }
            }
        }

        tracing::debug!(
            target: "runtime",
            "Teardown released {} wrapper(s), {} failure(s)",
            report.released,
            report.failed
        );
        report
    }
}

impl Drop for RuntimeContext {
    fn drop(&mut self) {
        if !self.cache.is_closed() {
            self.teardown();
        }
    }
}
