//! Source identity resolution.
//!
//! Decides which template a request targets. A request reaches the runtime in
//! one of three ways, checked in this order of precedence:
//!
//! 1. **Alias**: the [`TEMPLATE_FILE`] attribute names the file directly, for
//!    mappings that have no URL correspondence. It always wins.
//! 2. **Include/forward**: the [`INC_SERVLET_PATH`] attribute holds the target
//!    path. Nested delegation can leave it stale relative to
//!    [`INC_REQUEST_URI`]; when the include path occurs inside the request URI
//!    the suffix of the URI starting at that occurrence is used instead.
//! 3. **Direct**: servlet path followed by path info.
//!
//! ```text
//! include.servlet_path = /a
//! include.request_uri  = /outer/a/b.html
//!                              ^ first occurrence
//! effective path       = /a/b.html   (suffix of the request URI)
//! ```
//!
//! The result is normalized into a [`SourceIdentity`], so resolving the same
//! request twice always yields the same identity.

use crate::constants::{INC_REQUEST_URI, INC_SERVLET_PATH, TEMPLATE_FILE};
use crate::core::{DispatchError, SourceIdentity};
use crate::request::TemplateRequest;

/// Resolve the identity of the template `request` targets.
///
/// # Errors
///
/// Returns [`DispatchError::IdentityResolution`] when the request names no
/// template at all or the path escapes the document root.
pub fn resolve_identity(request: &TemplateRequest) -> Result<SourceIdentity, DispatchError> {
    if let Some(alias) = request.attribute(TEMPLATE_FILE) {
        return SourceIdentity::parse(alias);
    }

    let path = match request.attribute(INC_SERVLET_PATH) {
        Some(include_path) => effective_include_path(include_path, request.attribute(INC_REQUEST_URI)),
        None => direct_path(request),
    };

    SourceIdentity::parse(&path)
}

/// Correct an include path that drifted during nested delegation.
fn effective_include_path(include_path: &str, request_uri: Option<&str>) -> String {
    let Some(request_uri) = request_uri else {
        return include_path.to_string();
    };
    if include_path.is_empty() {
        return include_path.to_string();
    }

    match request_uri.find(include_path) {
        Some(start) => {
            let current = &request_uri[start..];
            if current != include_path {
                tracing::trace!(
                    target: "resolver",
                    "Include path {} corrected to {} from request URI {}",
                    include_path,
                    current,
                    request_uri
                );
            }
            current.to_string()
        }
        None => include_path.to_string(),
    }
}

fn direct_path(request: &TemplateRequest) -> String {
    match &request.path_info {
        Some(path_info) => format!("{}{}", request.servlet_path, path_info),
        None => request.servlet_path.clone(),
    }
}
