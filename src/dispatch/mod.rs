//! Request dispatch.
//!
//! The [`Dispatcher`] drives one request through a strictly linear sequence:
//!
//! ```text
//! Resolving ──> Detecting ──> CacheLookup ──> [Creating] ──> Dispatching ──> Done
//!     │             │              │               │              │
//!     └─────────────┴──────────────┴───────────────┴──────────────┴──> error response
//! ```
//!
//! Identity resolution and precompile detection run before the cache is
//! touched, so a malformed request never creates a wrapper. Every failure
//! propagates back here and [`Dispatcher::respond`] is the one place that turns
//! a [`DispatchError`] into a status-coded [`Response`].

use std::sync::Arc;

use crate::core::{DispatchError, SourceIdentity};
use crate::request::{Response, TemplateRequest, is_precompile};
use crate::resolver::resolve_identity;
use crate::runtime::RuntimeContext;

/// Routes requests to compiled wrappers.
pub struct Dispatcher {
    runtime: Arc<RuntimeContext>,
    error_page: Option<SourceIdentity>,
}

impl Dispatcher {
    pub fn new(runtime: Arc<RuntimeContext>) -> Self {
        Self {
            runtime,
            error_page: None,
        }
    }

    /// Render server-side failures with the template at `identity`.
    #[must_use]
    pub fn with_error_page(mut self, identity: SourceIdentity) -> Self {
        self.error_page = Some(identity);
        self
    }

    pub fn runtime(&self) -> &Arc<RuntimeContext> {
        &self.runtime
    }

    /// Service `request`, returning the wrapper's response or the failure.
    ///
    /// # Errors
    ///
    /// Any [`DispatchError`]; I/O failures are reported as
    /// [`DispatchError::Dispatch`].
    pub fn service(&self, request: &TemplateRequest) -> Result<Response, DispatchError> {
        let _span = tracing::debug_span!("dispatch", request = %request.id).entered();

        tracing::trace!(target: "dispatch", "Resolving");
        let identity = resolve_identity(request)?;

        tracing::trace!(target: "dispatch", "Detecting");
        let precompile = is_precompile(request.query_string.as_deref())?;

        log_request(request, &identity, precompile);
        self.service_identity(request, &identity, precompile, None).map_err(|e| match e {
            DispatchError::IoError(io) => DispatchError::Dispatch {
                message: format!("{identity}: {io}"),
            },
            other => other,
        })
    }

    /// Service `request` and convert any failure into a response.
    ///
    /// Client errors answer with their status and message. Server-side
    /// failures are logged and, when an error page is configured, rendered
    /// through it with the failure exposed as `error`.
    pub fn respond(&self, request: &TemplateRequest) -> Response {
        match self.service(request) {
            Ok(response) => response,
            Err(error) => self.error_response(request, error),
        }
    }

    fn service_identity(
        &self,
        request: &TemplateRequest,
        identity: &SourceIdentity,
        precompile: bool,
        error: Option<String>,
    ) -> Result<Response, DispatchError> {
        tracing::trace!(target: "dispatch", "CacheLookup {}", identity);
        let store = self.runtime.store();
        let entry = self.runtime.cache().get_or_create(identity, error.is_some(), |id| store.exists(id))?;

        tracing::trace!(target: "dispatch", "Dispatching {}", identity);
        let response = entry.service(request, precompile, error)?;

        tracing::trace!(target: "dispatch", "Done {} -> {}", identity, response.status);
        Ok(response)
    }

    fn error_response(&self, request: &TemplateRequest, error: DispatchError) -> Response {
        let status = error.status();
        if error.is_client_error() {
            tracing::debug!(target: "dispatch", "{} {} -> {}: {}", request.method, request.request_uri, status, error);
            return Response::status(status, error.to_string());
        }

        tracing::error!(target: "dispatch", "{} {} failed: {}", request.method, request.request_uri, error);

        let Some(page) = &self.error_page else {
            return Response::status(status, error.to_string());
        };

        match self.service_identity(request, page, false, Some(error.to_string())) {
            Ok(mut response) => {
                response.status = status;
                response
            }
            Err(page_error) => {
                tracing::warn!(target: "dispatch", "Error page {} failed: {}", page, page_error);
                Response::status(status, error.to_string())
            }
        }
    }
}

fn log_request(request: &TemplateRequest, identity: &SourceIdentity, precompile: bool) {
    if !tracing::enabled!(target: "dispatch", tracing::Level::DEBUG) {
        return;
    }
    tracing::debug!(target: "dispatch", "Template --> {}", identity);
    tracing::debug!(target: "dispatch", "\t ServletPath: {}", request.servlet_path);
    tracing::debug!(target: "dispatch", "\t    PathInfo: {:?}", request.path_info);
    tracing::debug!(target: "dispatch", "\t  RequestURI: {}", request.request_uri);
    tracing::debug!(target: "dispatch", "\t QueryString: {:?}", request.query_string);
    tracing::debug!(target: "dispatch", "\t  Precompile: {}", precompile);
}
