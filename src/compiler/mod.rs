//! Compilation and execution of template sources.
//!
//! The runtime treats compilation as an external concern behind two traits:
//!
//! - [`Compiler`] turns source text into an [`Executable`]
//! - [`Executable`] services a request given a [`RenderContext`]
//!
//! The cache and dispatcher only hold `Box<dyn Executable>` handles and never
//! look inside them. [`TeraCompiler`] is the implementation shipped with the
//! binary.

mod tera_compiler;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::{DispatchError, SourceIdentity};
use crate::request::TemplateRequest;

pub use tera_compiler::TeraCompiler;

/// Turns template sources into executable artifacts.
pub trait Compiler: Send + Sync {
    /// Compile `source`, the text of `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Compile`] when the source is rejected.
    fn compile(
        &self,
        identity: &SourceIdentity,
        source: &str,
    ) -> Result<Box<dyn Executable>, DispatchError>;
}

/// A compiled template ready to service requests.
pub trait Executable: Send + Sync {
    /// Produce the response body for `context`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Execution`] when execution fails.
    fn execute(&self, context: &RenderContext) -> Result<String, DispatchError>;

    /// Release resources held by the artifact. Called once at teardown.
    ///
    /// # Errors
    ///
    /// Failures are logged by the caller and never stop teardown.
    fn release(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Data exposed to a template while it services a request.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    /// Request line and routing information
    pub request: RequestView,
    /// Decoded query parameters; repeated names keep every value
    pub params: BTreeMap<String, Vec<String>>,
    /// Request attributes
    pub attributes: BTreeMap<String, String>,
    /// Request headers, last value wins for repeated names
    pub headers: BTreeMap<String, String>,
    /// Description of the failure being reported, for error pages only
    pub error: Option<String>,
}

/// Routing information about the current request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub identity: String,
    pub uri: String,
    pub method: String,
    pub servlet_path: String,
    pub path_info: Option<String>,
    pub query: Option<String>,
}

impl RenderContext {
    /// Build the context for executing `identity` on behalf of `request`.
    #[must_use]
    pub fn from_request(
        identity: &SourceIdentity,
        request: &TemplateRequest,
        error: Option<String>,
    ) -> Self {
        Self {
            request: RequestView {
                identity: identity.to_string(),
                uri: request.request_uri.clone(),
                method: request.method.clone(),
                servlet_path: request.servlet_path.clone(),
                path_info: request.path_info.clone(),
                query: request.query_string.clone(),
            },
            params: request.params(),
            attributes: request.attributes.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                .collect(),
            error,
        }
    }
}
