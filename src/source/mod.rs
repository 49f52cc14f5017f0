//! Template source storage.
//!
//! The dispatcher never touches the filesystem directly: it asks a
//! [`SourceStore`] whether a source exists, reads it for compilation and
//! checks its modification time in development mode. [`FsSourceStore`] serves
//! sources from a document root directory; tests substitute in-memory stores.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::{DispatchError, SourceIdentity};

/// Backing storage for template sources.
pub trait SourceStore: Send + Sync {
    /// Whether a source exists for `identity`.
    fn exists(&self, identity: &SourceIdentity) -> bool;

    /// Read the source text for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::SourceNotFound`] when the source is missing and
    /// [`DispatchError::IoError`] for any other read failure.
    fn read(&self, identity: &SourceIdentity) -> Result<String, DispatchError>;

    /// Last modification time of the source, if it can be determined.
    fn modified(&self, identity: &SourceIdentity) -> Option<SystemTime>;
}

/// Sources stored as files below a document root.
#[derive(Debug, Clone)]
pub struct FsSourceStore {
    root: PathBuf,
}

impl FsSourceStore {
    /// Serve sources from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// The document root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path backing `identity`.
    #[must_use]
    pub fn path_for(&self, identity: &SourceIdentity) -> PathBuf {
        self.root.join(identity.relative())
    }
}

impl SourceStore for FsSourceStore {
    fn exists(&self, identity: &SourceIdentity) -> bool {
        self.path_for(identity).is_file()
    }

    fn read(&self, identity: &SourceIdentity) -> Result<String, DispatchError> {
        let path = self.path_for(identity);
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DispatchError::SourceNotFound {
                identity: identity.to_string(),
            },
            _ => DispatchError::IoError(e),
        })
    }

    fn modified(&self, identity: &SourceIdentity) -> Option<SystemTime> {
        std::fs::metadata(self.path_for(identity)).and_then(|m| m.modified()).ok()
    }
}
