//! Filesystem fragment source.
//!
//! Fragments live next to the navigation data, one file per handle:
//! - `<dir>/<handle>.json`: JSON array of child records
//! - `<dir>/<handle>.js`: Doxygen script assigning the array to `var <handle>`
//!
//! The JSON form wins when both exist.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::data::fragment_from_json;
use crate::doxygen;
use crate::node::{SubtreeHandle, TreeNode};
use crate::source::{FragmentSource, SourceError, SourceErrorKind};

const BACKEND: &str = "Fs";

/// Fragment source reading fragment files from a directory.
#[derive(Debug)]
pub struct FsFragmentSource {
    dir: PathBuf,
}

impl FsFragmentSource {
    /// Create a source reading fragments from `dir`.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory fragments are read from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reject handles that would escape the fragment directory.
    fn check_handle(handle: &SubtreeHandle) -> Result<(), SourceError> {
        let key = handle.as_str();
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(SourceError::new(SourceErrorKind::InvalidHandle)
                .with_handle(handle)
                .with_backend(BACKEND));
        }
        Ok(())
    }

    async fn read_optional(path: &Path) -> Result<Option<String>, SourceError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SourceError::io(err, path)),
        }
    }

    fn parse(
        handle: &SubtreeHandle,
        path: &Path,
        content: &str,
        script: bool,
    ) -> Result<Vec<TreeNode>, SourceError> {
        let invalid = || {
            SourceError::new(SourceErrorKind::InvalidData)
                .with_handle(handle)
                .with_path(path)
        };

        let json = if script {
            doxygen::array_literal(content, handle.as_str()).ok_or_else(invalid)?
        } else {
            content
        };

        fragment_from_json(json).map_err(|err| invalid().with_source(err))
    }
}

#[async_trait(?Send)]
impl FragmentSource for FsFragmentSource {
    async fn fetch(&self, handle: &SubtreeHandle) -> Result<Vec<TreeNode>, SourceError> {
        Self::check_handle(handle)?;

        for (extension, script) in [("json", false), ("js", true)] {
            let path = self.dir.join(format!("{handle}.{extension}"));
            let content = Self::read_optional(&path)
                .await
                .map_err(|err| err.with_handle(handle).with_backend(BACKEND))?;
            if let Some(content) = content {
                tracing::debug!(handle = %handle, path = %path.display(), "Read fragment");
                return Self::parse(handle, &path, &content, script)
                    .map_err(|err| err.with_backend(BACKEND));
            }
        }

        Err(SourceError::not_found(handle)
            .with_path(&self.dir)
            .with_backend(BACKEND))
    }
}
