//! Fragment source trait and error types.
//!
//! Provides the core [`FragmentSource`] trait for fetching the children of a
//! deferred navigation node, along with [`SourceError`] for unified error
//! handling across backends.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::node::{SubtreeHandle, TreeNode};

/// Semantic error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceErrorKind {
    /// No fragment exists for the handle.
    NotFound,
    /// Handle cannot name a fragment (e.g. contains a path separator).
    InvalidHandle,
    /// Fragment exists but could not be parsed.
    InvalidData,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ErrorStatus {
    /// Don't retry (missing fragment, bad handle, malformed data).
    #[default]
    Permanent,
    /// Retry immediately (timeout, interrupted read).
    Temporary,
    /// Retry with backoff (backend unavailable).
    Persistent,
}

/// Fragment source error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct SourceError {
    /// Semantic error category.
    pub kind: SourceErrorKind,
    /// Retry guidance.
    pub status: ErrorStatus,
    /// Handle being fetched.
    pub handle: Option<SubtreeHandle>,
    /// File involved (if applicable).
    pub path: Option<PathBuf>,
    /// Backend identifier (e.g., "Fs", "Mock").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    /// Create a new source error.
    #[must_use]
    pub fn new(kind: SourceErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            handle: None,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Set retry status.
    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the handle being fetched.
    #[must_use]
    pub fn with_handle(mut self, handle: &SubtreeHandle) -> Self {
        self.handle = Some(handle.clone());
        self
    }

    /// Attach file context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a not found error for a handle.
    #[must_use]
    pub fn not_found(handle: &SubtreeHandle) -> Self {
        Self::new(SourceErrorKind::NotFound).with_handle(handle)
    }

    /// Create a source error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let (kind, status) = match err.kind() {
            std::io::ErrorKind::NotFound => (SourceErrorKind::NotFound, ErrorStatus::Permanent),
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted => {
                (SourceErrorKind::Unavailable, ErrorStatus::Temporary)
            }
            _ => (SourceErrorKind::Other, ErrorStatus::Permanent),
        };
        Self::new(kind)
            .with_status(status)
            .with_source(err)
            .with_path(path)
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (handle: files_dup, path: /foo/bar)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            SourceErrorKind::NotFound => "Fragment not found",
            SourceErrorKind::InvalidHandle => "Invalid handle",
            SourceErrorKind::InvalidData => "Invalid fragment",
            SourceErrorKind::Unavailable => "Unavailable",
            SourceErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        match (&self.handle, &self.path) {
            (Some(handle), Some(path)) => {
                write!(f, " (handle: {handle}, path: {})", path.display())?;
            }
            (Some(handle), None) => write!(f, " (handle: {handle})")?,
            (None, Some(path)) => write!(f, " (path: {})", path.display())?,
            (None, None) => {}
        }

        Ok(())
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Source of subtree fragments for deferred navigation nodes.
///
/// Implementations return the ordered child records of the node whose
/// children are deferred under `handle`. The engine runs on a single-threaded
/// event loop, so futures are not required to be `Send`.
#[async_trait(?Send)]
pub trait FragmentSource {
    /// Fetch the children stored under `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] with [`SourceErrorKind::NotFound`] if the source
    /// has no fragment for `handle`, or another kind if it exists but cannot
    /// be read.
    async fn fetch(&self, handle: &SubtreeHandle) -> Result<Vec<TreeNode>, SourceError>;
}
