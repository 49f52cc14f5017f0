//! Request and response types exchanged with the dispatcher.
//!
//! A [`TemplateRequest`] is the transport-neutral view of one incoming
//! request: the path split the way a servlet container splits it (servlet path
//! plus optional path info), the raw query string, and the string attributes
//! set by include/forward delegation. The HTTP front end builds these from
//! axum requests; tests and the CLI build them with the builder methods.
//!
//! The query string is kept raw on purpose. [`precompile::is_precompile`]
//! inspects it without decoding, and parameters are only decoded when a
//! template is executed.

pub mod precompile;

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::constants::{HTML_CONTENT_TYPE, TEXT_CONTENT_TYPE};

pub use precompile::is_precompile;

/// One request routed to the template runtime.
#[derive(Debug, Clone)]
pub struct TemplateRequest {
    /// Identifier used to correlate log lines for this request
    pub id: Uuid,
    /// HTTP method, upper case
    pub method: String,
    /// Full request URI path, without query string
    pub request_uri: String,
    /// Path mapped to the template servlet
    pub servlet_path: String,
    /// Extra path information following the servlet path
    pub path_info: Option<String>,
    /// Raw, undecoded query string
    pub query_string: Option<String>,
    /// Attributes set by the container or by include/forward delegation
    pub attributes: HashMap<String, String>,
    /// Request headers in arrival order
    pub headers: Vec<(String, String)>,
}

impl TemplateRequest {
    /// Build a `GET` request for `uri`, which may carry a query string.
    ///
    /// The whole path becomes the servlet path, matching an extension mapping
    /// such as `*.html`.
    #[must_use]
    pub fn get(uri: &str) -> Self {
        match uri.split_once('?') {
            Some((path, query)) => Self::for_path(path).with_query(query),
            None => Self::for_path(uri),
        }
    }

    /// Build a `GET` request for `path` taken verbatim, with no query string.
    ///
    /// Unlike [`get`](Self::get), a `?` inside `path` stays part of the path.
    pub fn for_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: Uuid::new_v4(),
            method: "GET".to_string(),
            request_uri: path.clone(),
            servlet_path: path,
            path_info: None,
            query_string: None,
            attributes: HashMap::new(),
            headers: Vec::new(),
        }
    }

    /// Set the raw query string.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query_string = Some(query.into());
        self
    }

    /// Replace the method.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    /// Split the path into a servlet path and path info, as a prefix mapping does.
    #[must_use]
    pub fn with_path_info(
        mut self,
        servlet_path: impl Into<String>,
        path_info: impl Into<String>,
    ) -> Self {
        self.servlet_path = servlet_path.into();
        self.path_info = Some(path_info.into());
        self
    }

    /// Set a request attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up an attribute; absent attributes are `None`, never an error.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Decode the query string into parameters.
    ///
    /// Only called when a template actually executes, after any decision that
    /// must be taken on the raw query string.
    #[must_use]
    pub fn params(&self) -> BTreeMap<String, Vec<String>> {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(query) = &self.query_string {
            for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params.entry(name.into_owned()).or_default().push(value.into_owned());
            }
        }
        params
    }
}

/// Status-coded response produced by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Value for the `Content-Type` header
    pub content_type: String,
    /// Response body
    pub body: String,
}

impl Response {
    /// `200` with rendered HTML.
    #[must_use]
    pub fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: HTML_CONTENT_TYPE.to_string(),
            body,
        }
    }

    /// `200` with no body, the answer to a precompile request.
    #[must_use]
    pub fn compiled() -> Self {
        Self {
            status: 200,
            content_type: TEXT_CONTENT_TYPE.to_string(),
            body: String::new(),
        }
    }

    /// A plain-text status response carrying `message`.
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT_CONTENT_TYPE.to_string(),
            body: message.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}
