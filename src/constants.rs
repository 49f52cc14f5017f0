//! Global constants used throughout the tplserve codebase.
//!
//! Request attribute names, the precompile directive and the default
//! timing values live here so the resolver, the dispatcher and the HTTP
//! front end agree on them.

use std::time::Duration;

/// Query-string directive requesting compilation without execution.
///
/// The name is kept compatible with existing precompile tooling, which
/// issues `?jsp_precompile` requests against every page of an application.
pub const PRECOMPILE: &str = "jsp_precompile";

/// Request attribute carrying the servlet path of an include/forward target.
pub const INC_SERVLET_PATH: &str = "include.servlet_path";

/// Request attribute carrying the request URI of an include/forward target.
pub const INC_REQUEST_URI: &str = "include.request_uri";

/// Request attribute naming a template file directly (alias mapping).
pub const TEMPLATE_FILE: &str = "template.file";

/// Default interval between source modification checks in development mode.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(4);

/// Default listen address for `tplserve serve`.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Default file patterns treated as templates by batch precompilation.
pub const DEFAULT_TEMPLATE_PATTERNS: &[&str] = &["**/*.html", "**/*.tpl"];

/// Content type used for rendered template output.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Content type used for status-only responses.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
