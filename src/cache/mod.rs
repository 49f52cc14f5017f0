//! Wrapper cache with single-flight creation.
//!
//! Maps each [`SourceIdentity`] to the one [`WrapperEntry`] that services it.
//! The cache is owned by a [`RuntimeContext`](crate::runtime::RuntimeContext)
//! and handed to the dispatcher explicitly; there is no global instance.
//!
//! # Concurrency Architecture
//!
//! - **Lock-free reads**: entries live in a [`DashMap`]; the steady-state path
//!   (identity already loaded) never takes the creation lock
//! - **Single-flight creation**: a missing identity is created under one
//!   cache-wide lock with a second lookup after acquiring it, so at most one
//!   entry is ever constructed per identity
//! - **Publish before release**: the new entry is inserted before the lock is
//!   dropped; every caller that enters afterwards sees it
//! - **No negative caching**: a missing source is re-checked on every request
//!
//! ```text
//! Thread A: get_or_create("/a") ──lookup miss──lock──re-check miss──create──insert──unlock
//! Thread B: get_or_create("/a") ──lookup miss──────────(waits)──────────────lock──re-check hit
//! Thread C: get_or_create("/b") ──lookup hit ─────────────────── no lock taken
//! ```
//!
//! Construction is cheap (compilation is deferred to the entry), so one coarse
//! lock is enough: the expensive work happens inside
//! [`WrapperEntry::service`] under a per-entry lock.
//!
//! There is no eviction. Entries live until [`WrapperCache::close`] drains them
//! at teardown; recompilation happens in place inside an entry.

pub mod wrapper;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use crate::core::{DispatchError, SourceIdentity};

pub use wrapper::{WrapperEntry, WrapperEnv, WrapperOptions};

/// Identity → wrapper map shared by all request workers.
pub struct WrapperCache {
    entries: DashMap<SourceIdentity, Arc<WrapperEntry>>,
    create_lock: Mutex<()>,
    closed: AtomicBool,
    env: Arc<WrapperEnv>,
}

impl WrapperCache {
    /// Create an empty cache whose entries share `env`.
    pub fn new(env: Arc<WrapperEnv>) -> Self {
        Self {
            entries: DashMap::new(),
            create_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            env,
        }
    }

    /// Non-blocking lookup of an existing wrapper.
    pub fn lookup(&self, identity: &SourceIdentity) -> Option<Arc<WrapperEntry>> {
        self.entries.get(identity).map(|entry| Arc::clone(entry.value()))
    }

    /// Return the wrapper for `identity`, creating it if absent.
    ///
    /// `source_exists` is consulted only on the creation path, under the
    /// creation lock. `is_error_page` only affects a wrapper created by this
    /// call.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::SourceNotFound`] if `source_exists` returns false;
    ///   nothing is cached
    /// - [`DispatchError::RuntimeShutDown`] once [`close`](Self::close) has run
    pub fn get_or_create<F>(
        &self,
        identity: &SourceIdentity,
        is_error_page: bool,
        source_exists: F,
    ) -> Result<Arc<WrapperEntry>, DispatchError>
    where
        F: FnOnce(&SourceIdentity) -> bool,
    {
        if let Some(entry) = self.lookup(identity) {
            return Ok(entry);
        }

        let _guard = self.create_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::Acquire) {
            return Err(DispatchError::RuntimeShutDown);
        }

        // Another caller may have finished creating it while we waited.
        if let Some(entry) = self.lookup(identity) {
            return Ok(entry);
        }

        if !source_exists(identity) {
            tracing::debug!(target: "cache", "No source for {}", identity);
            return Err(DispatchError::SourceNotFound {
                identity: identity.to_string(),
            });
        }

        let entry = Arc::new(WrapperEntry::new(identity.clone(), is_error_page, Arc::clone(&self.env)));
        self.entries.insert(identity.clone(), Arc::clone(&entry));
        tracing::debug!(
            target: "cache",
            "Created wrapper for {} (error page: {}, loaded: {})",
            identity,
            is_error_page,
            self.entries.len()
        );
        Ok(entry)
    }

    /// Number of wrappers currently loaded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identities of all loaded wrappers, sorted.
    pub fn identities(&self) -> Vec<SourceIdentity> {
        let mut identities: Vec<_> = self.entries.iter().map(|e| e.key().clone()).collect();
        identities.sort();
        identities
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Refuse further creation and hand back every loaded wrapper.
    ///
    /// Returns an empty list when the cache was already closed.
    pub(crate) fn close(&self) -> Vec<Arc<WrapperEntry>> {
        let _guard = self.create_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }

        let identities: Vec<SourceIdentity> = self.entries.iter().map(|e| e.key().clone()).collect();
        identities.iter().filter_map(|identity| self.entries.remove(identity).map(|(_, entry)| entry)).collect()
    }
}
