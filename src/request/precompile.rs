//! Detection of compile-only requests.
//!
//! A request carrying the [`PRECOMPILE`] directive asks the runtime to compile
//! the target template without executing it. The directive is read from the
//! raw query string; parameters are never decoded here.

use crate::constants::PRECOMPILE;
use crate::core::DispatchError;

/// Decide whether `query_string` carries the precompile directive.
///
/// | query string                  | result |
/// |-------------------------------|--------|
/// | none, or directive absent     | `false` |
/// | `jsp_precompile`              | `true` |
/// | `jsp_precompile&foo=bar`      | `true` |
/// | `jsp_precompile_x=1`          | `false` |
/// | `jsp_precompile=true`         | `true` |
/// | `jsp_precompile=false`        | `true` |
/// | `jsp_precompile=anything`     | error |
///
/// `=false` is still a compile-only request.
///
/// # Errors
///
/// Returns [`DispatchError::MalformedPrecompileDirective`] when the directive
/// has a value other than `true` or `false`.
pub fn is_precompile(query_string: Option<&str>) -> Result<bool, DispatchError> {
    let Some(query) = query_string else {
        return Ok(false);
    };
    let Some(start) = query.find(PRECOMPILE) else {
        return Ok(false);
    };

    let rest = &query[start + PRECOMPILE.len()..];
    if rest.is_empty() || rest.starts_with('&') {
        return Ok(true);
    }
    let Some(assigned) = rest.strip_prefix('=') else {
        // Part of some other name or value.
        return Ok(false);
    };

    let value = assigned.split('&').next().unwrap_or_default();
    match value {
        "true" | "false" => Ok(true),
        other => Err(DispatchError::MalformedPrecompileDirective {
            directive: PRECOMPILE.to_string(),
            value: other.to_string(),
        }),
    }
}
