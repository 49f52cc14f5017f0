//! Normalized template source identities.

use std::fmt;

use thiserror::Error;

use super::error::DispatchError;

/// Why a raw path cannot become a [`SourceIdentity`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path '{path}' does not name a template")]
    NoTemplate { path: String },

    #[error("path '{path}' escapes the document root")]
    EscapesRoot { path: String },
}

/// Normalized path naming one template source under the document root.
///
/// A `SourceIdentity` always starts with `/` and contains no empty, `.` or
/// `..` segments, so two spellings of the same file compare equal and map to
/// the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceIdentity(String);

impl SourceIdentity {
    /// Normalize `raw` into an identity.
    ///
    /// Backslashes are treated as separators, repeated separators collapse and
    /// `.` segments are dropped. A `..` segment removes its parent; one that
    /// would climb above the root is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::IdentityResolution`] for an empty path or a path
    /// escaping the root.
    pub fn parse(raw: &str) -> Result<Self, DispatchError> {
        Self::normalize(raw).map_err(|e| DispatchError::IdentityResolution {
            reason: e.to_string(),
        })
    }

    /// Normalize `raw`, reporting why it names no template.
    ///
    /// Same rules as [`parse`](Self::parse); front ends use the [`PathError`]
    /// to answer client paths before they reach the dispatcher.
    ///
    /// # Errors
    ///
    /// [`PathError::NoTemplate`] or [`PathError::EscapesRoot`].
    pub fn normalize(raw: &str) -> Result<Self, PathError> {
        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(PathError::EscapesRoot {
                            path: raw.to_string(),
                        });
                    }
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Err(PathError::NoTemplate {
                path: raw.to_string(),
            });
        }

        Ok(Self(format!("/{}", segments.join("/"))))
    }

    /// The normalized path, always starting with `/`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path relative to the document root (no leading `/`).
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SourceIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
