//! HTTP front end.
//!
//! Every path is handled by one fallback route that turns the axum request
//! into a [`TemplateRequest`] and hands it to the [`Dispatcher`]. The path is
//! percent-decoded first, and paths that cannot name a template are answered
//! here (`404` for no template, `400` for an escape or bad encoding) without
//! reaching the dispatcher. Dispatch runs
//! on the blocking pool: compilation is CPU bound and synchronous, and a
//! client that disconnects only drops the awaiting future while the creation
//! or compilation it started still completes and is published to the cache.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response as HttpResponse};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tracing::Instrument;

use crate::core::{PathError, SourceIdentity};
use crate::dispatch::Dispatcher;
use crate::request::{Response, TemplateRequest};

/// A request path refused before dispatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectedPath {
    #[error("path '{0}' is not valid UTF-8 once decoded")]
    InvalidEncoding(String),

    #[error(transparent)]
    Path(#[from] PathError),
}

impl RejectedPath {
    /// HTTP status answering this rejection.
    pub fn status(&self) -> u16 {
        match self {
            Self::Path(PathError::NoTemplate { .. }) => 404,
            Self::InvalidEncoding(_) | Self::Path(PathError::EscapesRoot { .. }) => 400,
        }
    }
}

/// Router dispatching every path through `dispatcher`.
pub fn app_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new().fallback(handle_request).with_state(dispatcher)
}

/// Serve on `addr` until `shutdown` resolves, then tear the runtime down.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve<F>(dispatcher: Arc<Dispatcher>, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    serve_on(dispatcher, listener, shutdown).await
}

/// Serve on an already bound listener.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve_on<F>(
    dispatcher: Arc<Dispatcher>,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(target: "server", "Listening on http://{}", addr);
    }

    let app = app_router(Arc::clone(&dispatcher));
    let result = axum::serve(listener, app).with_graceful_shutdown(shutdown).await;

    let report = dispatcher.runtime().teardown();
    tracing::info!(
        target: "server",
        "Shut down, released {} template(s) ({} failed)",
        report.released,
        report.failed
    );

    result.context("HTTP server failed")
}

/// Resolves on Ctrl-C.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(target: "server", "Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn handle_request(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request,
) -> HttpResponse {
    if !matches!(*request.method(), Method::GET | Method::POST | Method::HEAD) {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response();
    }

    let template_request = match to_template_request(&request) {
        Ok(template_request) => template_request,
        Err(rejected) => {
            tracing::debug!(target: "server", "{} {} rejected: {}", request.method(), request.uri(), rejected);
            return into_http(Response::status(rejected.status(), rejected.to_string()));
        }
    };
    let span = tracing::info_span!(
        "request",
        id = %template_request.id,
        method = %template_request.method,
        uri = %template_request.request_uri
    );

    let response = async move {
        let span = tracing::Span::current();
        let handle = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            dispatcher.respond(&template_request)
        });
        match handle.await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(target: "server", "Dispatch task failed: {}", e);
                Response::status(500, "Dispatch failed")
            }
        }
    }
    .instrument(span)
    .await;

    into_http(response)
}

/// Build the transport-neutral request from an HTTP request.
///
/// The decoded path becomes the servlet path, as with an extension mapping;
/// the request URI and query string stay as sent.
///
/// # Errors
///
/// [`RejectedPath`] when the decoded path is not UTF-8, names no template or
/// escapes the document root.
pub fn to_template_request(request: &Request) -> Result<TemplateRequest, RejectedPath> {
    let uri = request.uri();
    let servlet_path = percent_decode_str(uri.path())
        .decode_utf8()
        .map_err(|_| RejectedPath::InvalidEncoding(uri.path().to_string()))?;
    if servlet_path.contains('\0') {
        return Err(RejectedPath::InvalidEncoding(uri.path().to_string()));
    }
    SourceIdentity::normalize(&servlet_path)?;

    let mut template_request = TemplateRequest::for_path(servlet_path).with_method(request.method().as_str());
    template_request.request_uri = uri.path().to_string();
    template_request.query_string = uri.query().map(ToString::to_string);

    for (name, value) in request.headers() {
        if let Ok(value) = value.to_str() {
            template_request = template_request.with_header(name.as_str(), value);
        }
    }
    Ok(template_request)
}

fn into_http(response: Response) -> HttpResponse {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut http = (status, response.body).into_response();
    if let Ok(content_type) = HeaderValue::from_str(&response.content_type) {
        http.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    http
}
