//! Compiled wrappers: one per template identity.
//!
//! A [`WrapperEntry`] is constructed cheaply by the cache and compiles its
//! source lazily on the first request. Later requests reuse the compiled
//! artifact; in development mode the source modification time is checked at
//! most once per check interval and a changed source is recompiled in place.
//!
//! # Compilation protocol
//!
//! ```text
//! observe generation g ──> needs compile? ──no──> execute
//!                               │yes
//!                     lock compile_lock
//!                     generation still g? ──no──> execute (someone else compiled)
//!                               │yes
//!                     read + compile source
//!                     publish artifact, generation = g + 1
//! ```
//!
//! A failed compilation publishes nothing and leaves the generation
//! unchanged, so the next request retries. Generation 0 means the entry has
//! never compiled; every successful compilation after that is a reload.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant, SystemTime};

use crate::compiler::{Compiler, Executable, RenderContext};
use crate::core::{DispatchError, SourceIdentity};
use crate::request::{Response, TemplateRequest};
use crate::source::SourceStore;

/// Recompilation behavior shared by all wrappers of a runtime.
#[derive(Debug, Clone, Copy)]
pub struct WrapperOptions {
    /// Check sources for modification and recompile changed ones
    pub development: bool,
    /// Minimum time between two modification checks of one source
    pub check_interval: Duration,
}

impl Default for WrapperOptions {
    fn default() -> Self {
        Self {
            development: true,
            check_interval: crate::constants::DEFAULT_CHECK_INTERVAL,
        }
    }
}

/// Collaborators every wrapper needs, shared across the runtime.
pub struct WrapperEnv {
    pub compiler: Arc<dyn Compiler>,
    pub store: Arc<dyn SourceStore>,
    /// Process-wide reload counter
    pub reloads: Arc<AtomicUsize>,
    pub options: WrapperOptions,
}

struct Compiled {
    executable: Box<dyn Executable>,
    source_modified: Option<SystemTime>,
}

/// Compiled state for one [`SourceIdentity`].
pub struct WrapperEntry {
    identity: SourceIdentity,
    is_error_page: bool,
    env: Arc<WrapperEnv>,
    compiled: RwLock<Option<Compiled>>,
    compile_lock: Mutex<()>,
    generation: AtomicU64,
    reload_count: AtomicUsize,
    reload_requested: AtomicBool,
    destroyed: AtomicBool,
    last_check: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for WrapperEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrapperEntry")
            .field("identity", &self.identity)
            .field("is_error_page", &self.is_error_page)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .field("reload_count", &self.reload_count.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WrapperEntry {
    /// Create an uncompiled wrapper. Compilation happens on first service.
    pub(crate) fn new(identity: SourceIdentity, is_error_page: bool, env: Arc<WrapperEnv>) -> Self {
        Self {
            identity,
            is_error_page,
            env,
            compiled: RwLock::new(None),
            compile_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            reload_count: AtomicUsize::new(0),
            reload_requested: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            last_check: Mutex::new(None),
        }
    }

    pub fn identity(&self) -> &SourceIdentity {
        &self.identity
    }

    /// Whether the wrapper was first created to service an error page.
    pub fn is_error_page(&self) -> bool {
        self.is_error_page
    }

    /// Number of times this wrapper recompiled an already compiled source.
    pub fn reload_count(&self) -> usize {
        self.reload_count.load(Ordering::Acquire)
    }

    /// Whether a compiled artifact is currently held.
    pub fn is_compiled(&self) -> bool {
        self.compiled.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Force recompilation on the next request, regardless of modification time.
    pub fn mark_for_reload(&self) {
        self.reload_requested.store(true, Ordering::Release);
    }

    /// Service `request`.
    ///
    /// Compiles the source if needed. A precompile request stops there and
    /// answers with an empty `200`. Otherwise the artifact executes with a
    /// [`RenderContext`] built from the request; `error` is exposed to error
    /// pages.
    ///
    /// # Errors
    ///
    /// [`DispatchError::SourceNotFound`] when the source vanished,
    /// [`DispatchError::Compile`] and [`DispatchError::Execution`] from the
    /// compiler collaborator.
    pub fn service(
        &self,
        request: &TemplateRequest,
        precompile: bool,
        error: Option<String>,
    ) -> Result<Response, DispatchError> {
        self.ensure_compiled()?;

        if precompile {
            tracing::debug!(target: "cache", "Precompiled {}", self.identity);
            return Ok(Response::compiled());
        }

        let context = RenderContext::from_request(&self.identity, request, error);
        let compiled = self.compiled.read().unwrap_or_else(PoisonError::into_inner);
        let Some(compiled) = compiled.as_ref() else {
            // Teardown released the artifact while this request was in flight.
            return Err(DispatchError::RuntimeShutDown);
        };
        let body = compiled.executable.execute(&context)?;
        Ok(Response::html(body))
    }

    fn ensure_compiled(&self) -> Result<(), DispatchError> {
        let observed = self.generation.load(Ordering::Acquire);
        if !self.needs_compile()? {
            return Ok(());
        }

        let _guard = lock(&self.compile_lock);
        if self.destroyed.load(Ordering::Acquire) {
            return Err(DispatchError::RuntimeShutDown);
        }
        if self.generation.load(Ordering::Acquire) != observed {
            return Ok(());
        }

        let recompiling = observed > 0;

        let source_modified = self.env.store.modified(&self.identity);
        let source = self.env.store.read(&self.identity)?;
        let executable = match self.env.compiler.compile(&self.identity, &source) {
            Ok(executable) => executable,
            Err(e) => {
                tracing::warn!(target: "cache", "Compilation of {} failed: {}", self.identity, e);
                return Err(e);
            }
        };

        let previous = self.compiled.write().unwrap_or_else(PoisonError::into_inner).replace(Compiled {
            executable,
            source_modified,
        });
        if let Some(previous) = previous {
            if let Err(e) = previous.executable.release() {
                tracing::warn!(target: "cache", "Releasing stale artifact of {} failed: {e:#}", self.identity);
            }
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.reload_requested.store(false, Ordering::Release);

        if recompiling {
            self.reload_count.fetch_add(1, Ordering::AcqRel);
            self.env.reloads.fetch_add(1, Ordering::AcqRel);
            tracing::info!(target: "cache", "Reloaded {}", self.identity);
        }
        Ok(())
    }

    fn needs_compile(&self) -> Result<bool, DispatchError> {
        let compiled = self.compiled.read().unwrap_or_else(PoisonError::into_inner);
        let Some(compiled) = compiled.as_ref() else {
            return Ok(true);
        };
        if self.reload_requested.load(Ordering::Acquire) {
            return Ok(true);
        }
        if !self.check_due() {
            return Ok(false);
        }

        match self.env.store.modified(&self.identity) {
            Some(now) => Ok(compiled.source_modified.is_none_or(|then| now > then)),
            None if !self.env.store.exists(&self.identity) => Err(DispatchError::SourceNotFound {
                identity: self.identity.to_string(),
            }),
            None => Ok(false),
        }
    }

    /// Rate-limit modification checks to one per check interval.
    fn check_due(&self) -> bool {
        if !self.env.options.development {
            return false;
        }
        let mut last_check = lock(&self.last_check);
        let due = (*last_check).is_none_or(|at| at.elapsed() >= self.env.options.check_interval);
        if due {
            *last_check = Some(Instant::now());
        }
        due
    }

    /// Release the compiled artifact. Called by teardown.
    ///
    /// A destroyed wrapper refuses to compile again.
    pub(crate) fn destroy(&self) -> anyhow::Result<()> {
        let _guard = lock(&self.compile_lock);
        self.destroyed.store(true, Ordering::Release);
        let compiled = self.compiled.write().unwrap_or_else(PoisonError::into_inner).take();
        match compiled {
            Some(compiled) => compiled.executable.release(),
            None => Ok(()),
        }
    }
}
