// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Doctest error types.
//!
//! A verification mismatch is not an error: it's a `Verdict::Fail` in an
//! `Ok` report. Everything here aborts the invocation.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DoctestError>;

/// Which side of the invocation boundary an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was invalid. Raised before any workspace exists.
    Configuration,
    /// Filesystem, process or output failure while carrying out the request.
    Resource,
}

#[derive(Debug, Error)]
pub enum DoctestError {
    #[error("invalid snippet name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("unknown artifact format '{0}' (expected exe, obj or lib)")]
    UnknownArtifactFormat(String),

    #[error("invalid environment assignment '{0}' (expected KEY=VALUE)")]
    InvalidEnv(String),

    #[error("failed to create workspace {}: {source}", path.display())]
    WorkspaceCreate { path: PathBuf, source: io::Error },

    #[error("no free workspace name under {} after {attempts} attempts", root.display())]
    WorkspaceExhausted { root: PathBuf, attempts: u32 },

    #[error("failed to remove workspace {}: {source}", path.display())]
    WorkspaceCleanup { path: PathBuf, source: io::Error },

    #[error("failed to launch {}: {source}", program.display())]
    Spawn { program: PathBuf, source: io::Error },

    #[error("{context}: {source}")]
    Io { context: String, source: io::Error },
}

impl DoctestError {
    pub fn invalid_name(name: &str, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason,
        }
    }

    pub fn workspace_create(path: &Path, source: io::Error) -> Self {
        Self::WorkspaceCreate {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn workspace_cleanup(path: &Path, source: io::Error) -> Self {
        Self::WorkspaceCleanup {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn spawn(program: &Path, source: io::Error) -> Self {
        Self::Spawn {
            program: program.to_path_buf(),
            source,
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidName { .. } | Self::UnknownArtifactFormat(_) | Self::InvalidEnv(_) => {
                ErrorClass::Configuration
            }
            Self::WorkspaceCreate { .. }
            | Self::WorkspaceExhausted { .. }
            | Self::WorkspaceCleanup { .. }
            | Self::Spawn { .. }
            | Self::Io { .. } => ErrorClass::Resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert_eq!(
            DoctestError::UnknownArtifactFormat("wasm".into()).class(),
            ErrorClass::Configuration
        );
        assert_eq!(
            DoctestError::invalid_name("a/b", "contains a path separator").class(),
            ErrorClass::Configuration
        );
        let missing = io::Error::new(io::ErrorKind::NotFound, "no such file");
        assert_eq!(
            DoctestError::spawn(Path::new("rask"), missing).class(),
            ErrorClass::Resource
        );
    }

    #[test]
    fn messages_name_the_path() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = DoctestError::workspace_cleanup(Path::new("/tmp/ws"), denied);
        assert_eq!(err.to_string(), "failed to remove workspace /tmp/ws: denied");
    }
}
