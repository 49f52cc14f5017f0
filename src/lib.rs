//! tplserve - template request dispatcher with a single-flight compile cache
//!
//! tplserve maps each incoming request to a template source, compiles that
//! source at most once and reuses the compiled template for every later
//! request. Requests carrying the `jsp_precompile` query directive are
//! compiled without being executed, which lets deployment tooling warm the
//! cache ahead of traffic.
//!
//! # Request Flow
//!
//! ```text
//! HTTP / CLI ──> TemplateRequest
//!                   │
//!                   ├─ resolver::resolve_identity     alias > include > direct path
//!                   ├─ request::is_precompile         raw query string only
//!                   ▼
//!             dispatch::Dispatcher
//!                   │
//!                   ├─ cache::WrapperCache::get_or_create   one entry per identity
//!                   ▼
//!             cache::WrapperEntry::service          compile once, then execute
//! ```
//!
//! # Core Modules
//!
//! - [`core`] - [`SourceIdentity`](core::SourceIdentity) and the
//!   [`DispatchError`](core::DispatchError) taxonomy
//! - [`request`] - request/response types and precompile detection
//! - [`resolver`] - request context to source identity
//! - [`cache`] - the wrapper cache and compiled wrappers
//! - [`dispatch`] - request routing and error responses
//! - [`runtime`] - cache ownership, counters and teardown
//!
//! # Collaborators
//!
//! - [`source`] - where template sources come from
//! - [`compiler`] - how sources become executable templates (Tera)
//!
//! # Outer Surfaces
//!
//! - [`config`] - TOML configuration
//! - [`server`] - axum HTTP front end
//! - [`cli`] - the `tplserve` command line
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tplserve::cache::WrapperOptions;
//! use tplserve::compiler::TeraCompiler;
//! use tplserve::dispatch::Dispatcher;
//! use tplserve::request::TemplateRequest;
//! use tplserve::runtime::RuntimeContext;
//! use tplserve::source::FsSourceStore;
//!
//! let runtime = RuntimeContext::new(
//!     Arc::new(TeraCompiler::new()),
//!     Arc::new(FsSourceStore::new("site")),
//!     WrapperOptions::default(),
//! );
//! let dispatcher = Dispatcher::new(Arc::new(runtime));
//!
//! let response = dispatcher.respond(&TemplateRequest::get("/index.html?name=world"));
//! println!("{} {}", response.status, response.body);
//! ```

pub mod cache;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod core;
pub mod dispatch;
pub mod request;
pub mod resolver;
pub mod runtime;
pub mod server;
pub mod source;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
