//! In-memory collaborators for exercising the runtime without Tera or a disk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::bail;

use crate::compiler::{Compiler, Executable, RenderContext};
use crate::core::{DispatchError, SourceIdentity};
use crate::source::SourceStore;

/// Source store backed by a map.
///
/// Every [`insert`](Self::insert) bumps a global version that doubles as the
/// source's modification time, so an updated source always looks newer.
#[derive(Debug, Default)]
pub struct MemorySourceStore {
    sources: RwLock<HashMap<SourceIdentity, (String, u64)>>,
    version: AtomicU64,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(self, path: &str, source: &str) -> Self {
        self.insert(path, source);
        self
    }

    /// Add or replace the source at `path`.
    ///
    /// # Panics
    ///
    /// If `path` is not a valid identity.
    pub fn insert(&self, path: &str, source: &str) {
        let identity = SourceIdentity::parse(path).expect("valid test identity");
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity, (source.to_string(), version));
    }

    /// Delete the source at `path`.
    pub fn remove(&self, path: &str) {
        if let Ok(identity) = SourceIdentity::parse(path) {
            self.sources.write().unwrap_or_else(PoisonError::into_inner).remove(&identity);
        }
    }
}

impl SourceStore for MemorySourceStore {
    fn exists(&self, identity: &SourceIdentity) -> bool {
        self.sources.read().unwrap_or_else(PoisonError::into_inner).contains_key(identity)
    }

    fn read(&self, identity: &SourceIdentity) -> Result<String, DispatchError> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .map(|(source, _)| source.clone())
            .ok_or_else(|| DispatchError::SourceNotFound {
                identity: identity.to_string(),
            })
    }

    fn modified(&self, identity: &SourceIdentity) -> Option<SystemTime> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .map(|(_, version)| UNIX_EPOCH + Duration::from_secs(*version))
    }
}

#[derive(Debug, Default)]
struct Counters {
    compiles: AtomicUsize,
    executions: AtomicUsize,
    releases: AtomicUsize,
}

/// Compiler double whose artifacts echo their source.
///
/// Executing an artifact returns the source text, followed by a newline and
/// the error message when one is supplied. Two marker sources change the
/// behavior: [`FAIL_COMPILE`](Self::FAIL_COMPILE) is rejected at compile time
/// and [`RELEASE_FAILS`](Self::RELEASE_FAILS) compiles but fails to release.
#[derive(Debug, Default)]
pub struct CountingCompiler {
    counters: Arc<Counters>,
    delay: Duration,
}

impl CountingCompiler {
    /// Source text that fails to compile.
    pub const FAIL_COMPILE: &'static str = "<<fail-compile>>";
    /// Source text whose artifact fails to release.
    pub const RELEASE_FAILS: &'static str = "<<release-fails>>";

    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every compilation, widening race windows.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of compile attempts, including failed ones.
    pub fn compiles(&self) -> usize {
        self.counters.compiles.load(Ordering::SeqCst)
    }

    pub fn executions(&self) -> usize {
        self.counters.executions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }
}

impl Compiler for CountingCompiler {
    fn compile(
        &self,
        identity: &SourceIdentity,
        source: &str,
    ) -> Result<Box<dyn Executable>, DispatchError> {
        self.counters.compiles.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if source == Self::FAIL_COMPILE {
            return Err(DispatchError::Compile {
                identity: identity.to_string(),
                reason: "rejected by test compiler".to_string(),
            });
        }
        Ok(Box::new(EchoTemplate {
            source: source.to_string(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct EchoTemplate {
    source: String,
    counters: Arc<Counters>,
}

impl Executable for EchoTemplate {
    fn execute(&self, context: &RenderContext) -> Result<String, DispatchError> {
        self.counters.executions.fetch_add(1, Ordering::SeqCst);
        Ok(match &context.error {
            Some(error) => format!("{}\n{}", self.source, error),
            None => self.source.clone(),
        })
    }

    fn release(&self) -> anyhow::Result<()> {
        if self.source == CountingCompiler::RELEASE_FAILS {
            bail!("release refused by test artifact");
        }
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
