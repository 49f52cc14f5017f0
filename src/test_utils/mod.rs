//! Test utilities for tplserve
//!
//! Helpers shared by unit tests, the integration suite and the stress suite:
//!
//! - [`init_test_logging`] wires `tracing` output into the test harness
//! - [`MemorySourceStore`] and [`CountingCompiler`] replace the filesystem and
//!   Tera with in-memory doubles that count what the runtime asks of them
//! - [`TestSite`] is a temporary document root served by the real stack
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tplserve::cache::WrapperOptions;
//! use tplserve::runtime::RuntimeContext;
//! use tplserve::test_utils::{CountingCompiler, MemorySourceStore};
//!
//! let compiler = Arc::new(CountingCompiler::new());
//! let store = Arc::new(MemorySourceStore::new().with("/index.html", "hello"));
//! let runtime = RuntimeContext::new(compiler.clone(), store, WrapperOptions::default());
//! assert_eq!(compiler.compiles(), 0);
//! # drop(runtime);
//! ```

pub mod doubles;
pub mod site;

pub use doubles::{CountingCompiler, MemorySourceStore};
pub use site::TestSite;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `Some(level)` that level is used;
/// with `None` the `RUST_LOG` environment variable decides, and nothing is
/// logged when it is unset.
///
/// ```bash
/// RUST_LOG=dispatch=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(true)
            .try_init();
    });
}
