//! Error handling for tplserve
//!
//! This module provides the dispatch error taxonomy and user-friendly error
//! reporting for the CLI. The error system is built around two types:
//! - [`DispatchError`] - every failure a request can hit between identity
//!   resolution and template execution
//! - [`ErrorContext`] - wrapper that adds details and suggestions for terminal display
//!
//! # Propagation
//!
//! Resolution and precompile detection failures are raised before the cache is
//! touched. Cache and wrapper failures propagate up to the
//! [`Dispatcher`](crate::dispatch::Dispatcher), which is the single place that
//! converts a [`DispatchError`] into a status-coded response via
//! [`DispatchError::status`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use tplserve::core::{DispatchError, user_friendly_error};
//!
//! let error = DispatchError::SourceNotFound {
//!     identity: "/missing.html".to_string(),
//! };
//! assert_eq!(error.status(), 404);
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The error type for request dispatch.
///
/// Each variant maps to exactly one response status, see [`DispatchError::status`].
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The request context did not yield a usable source identity.
    ///
    /// Upstream wiring always supplies a servlet path, so this indicates a
    /// broken caller or a path that tries to escape the document root.
    #[error("Cannot resolve template identity: {reason}")]
    IdentityResolution {
        /// Why resolution failed
        reason: String,
    },

    /// The precompile directive carried a value other than `true` or `false`.
    #[error("Cannot have request parameter {directive} set to {value}")]
    MalformedPrecompileDirective {
        /// Directive name as it appears in the query string
        directive: String,
        /// The offending value
        value: String,
    },

    /// No backing source exists for the identity.
    #[error("{identity}")]
    SourceNotFound {
        /// Identity that was requested
        identity: String,
    },

    /// The compiler rejected the source.
    #[error("Failed to compile '{identity}': {reason}")]
    Compile {
        /// Identity being compiled
        identity: String,
        /// Compiler diagnostic
        reason: String,
    },

    /// The compiled artifact failed while servicing a request.
    #[error("Failed to execute '{identity}': {reason}")]
    Execution {
        /// Identity being executed
        identity: String,
        /// Execution diagnostic
        reason: String,
    },

    /// The runtime has been torn down and accepts no new wrappers.
    #[error("Template runtime is shut down")]
    RuntimeShutDown,

    /// Catch-all for failures that fit no other category.
    #[error("Dispatch failed: {message}")]
    Dispatch {
        /// Description of the failure
        message: String,
    },

    /// IO error while reading template sources
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DispatchError {
    /// Response status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::MalformedPrecompileDirective {
                ..
            } => 400,
            Self::SourceNotFound {
                ..
            } => 404,
            Self::RuntimeShutDown => 503,
            Self::IdentityResolution {
                ..
            }
            | Self::Compile {
                ..
            }
            | Self::Execution {
                ..
            }
            | Self::Dispatch {
                ..
            }
            | Self::IoError(_) => 500,
        }
    }

    /// Whether the caller, not the server, is at fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.status(), 400..=499)
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`DispatchError`] and adds optional details and a
/// suggestion. This is how the CLI presents failures.
///
/// # Display Format
///
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
///
/// # Examples
///
/// ```rust,no_run
/// use tplserve::core::{DispatchError, ErrorContext};
///
/// let context = ErrorContext::new(DispatchError::RuntimeShutDown)
///     .with_suggestion("Restart the server")
///     .with_details("Teardown has already released every compiled template");
///
/// println!("{}", context);
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: DispatchError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no details or suggestion.
    #[must_use]
    pub const fn new(error: DispatchError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`]
///
/// Recognizes [`DispatchError`], [`std::io::Error`] and [`toml::de::Error`];
/// anything else is reported as a [`DispatchError::Dispatch`] carrying the
/// full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(dispatch_error) = error.downcast_ref::<DispatchError>() {
        return create_error_context(dispatch_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(DispatchError::Dispatch {
                    message: format!("permission denied: {io_error}"),
                })
                .with_suggestion("Check that the document root and config file are readable")
                .with_details("tplserve could not read a file it needs");
            }
            std::io::ErrorKind::AddrInUse => {
                return ErrorContext::new(DispatchError::Dispatch {
                    message: format!("listen address unavailable: {io_error}"),
                })
                .with_suggestion("Pick another address with --listen")
                .with_details("Another process is already bound to the requested address");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(DispatchError::Dispatch {
            message: format!("invalid configuration: {toml_error}"),
        })
        .with_suggestion("Check the TOML syntax of the configuration file")
        .with_details("Unknown keys and wrongly typed values are rejected");
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(DispatchError::Dispatch {
        message,
    })
}

fn create_error_context(error: &DispatchError) -> ErrorContext {
    match error {
        DispatchError::SourceNotFound {
            identity,
        } => ErrorContext::new(DispatchError::SourceNotFound {
            identity: identity.clone(),
        })
        .with_suggestion("Check the request path against the files under the document root")
        .with_details(format!("No template source exists for '{identity}'")),

        DispatchError::MalformedPrecompileDirective {
            directive,
            value,
        } => ErrorContext::new(DispatchError::MalformedPrecompileDirective {
            directive: directive.clone(),
            value: value.clone(),
        })
        .with_suggestion(format!("Use '{directive}', '{directive}=true' or '{directive}=false'")),

        DispatchError::Compile {
            identity,
            reason,
        } => ErrorContext::new(DispatchError::Compile {
            identity: identity.clone(),
            reason: reason.clone(),
        })
        .with_suggestion(
            "Check template syntax: variables use {{ var }}, comments use {# #}, control flow uses {% %}",
        ),

        DispatchError::RuntimeShutDown => ErrorContext::new(DispatchError::RuntimeShutDown)
            .with_details("Teardown released every compiled template"),

        DispatchError::IdentityResolution {
            reason,
        } => ErrorContext::new(DispatchError::IdentityResolution {
            reason: reason.clone(),
        }),

        DispatchError::Execution {
            identity,
            reason,
        } => ErrorContext::new(DispatchError::Execution {
            identity: identity.clone(),
            reason: reason.clone(),
        }),

        DispatchError::Dispatch {
            message,
        } => ErrorContext::new(DispatchError::Dispatch {
            message: message.clone(),
        }),

        DispatchError::IoError(e) => ErrorContext::new(DispatchError::Dispatch {
            message: format!("IO error: {e}"),
        }),
    }
}
