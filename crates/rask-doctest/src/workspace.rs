// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Ephemeral per-invocation build directories.
//!
//! Each verification gets a fresh directory `<root>/<prefix><random>`.
//! Uniqueness comes from the random suffix plus `create_dir` failing on an
//! existing name, so concurrent invocations never share a workspace and no
//! lock is needed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::error::{DoctestError, Result};

/// Directory name prefix used when the caller doesn't pick one.
pub const DEFAULT_PREFIX: &str = ".rask-doctest-";

/// Name collisions tolerated before giving up.
const MAX_ATTEMPTS: u32 = 64;

/// A uniquely named directory owned by one invocation.
///
/// Call [`Workspace::release`] to delete it and learn whether that worked,
/// or [`Workspace::retain`] to keep it. A workspace dropped without either
/// (an unwinding panic) is removed on a best-effort basis.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    done: bool,
}

impl Workspace {
    /// Create a new workspace directory under `root`.
    pub fn acquire(root: &Path, prefix: &str) -> Result<Self> {
        Self::acquire_with(root, prefix, random_suffix)
    }

    fn acquire_with(root: &Path, prefix: &str, mut suffix: impl FnMut() -> String) -> Result<Self> {
        let root = std::path::absolute(root)
            .map_err(|e| DoctestError::io(format!("failed to resolve {}", root.display()), e))?;

        for _ in 0..MAX_ATTEMPTS {
            let path = root.join(format!("{}{}", prefix, suffix()));
            match fs::create_dir(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "acquired workspace");
                    return Ok(Self { path, done: false });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    trace!(path = %path.display(), "workspace name taken, retrying");
                }
                Err(e) => return Err(DoctestError::workspace_create(&path, e)),
            }
        }

        Err(DoctestError::WorkspaceExhausted {
            root,
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Absolute path of the workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Recursively delete the workspace.
    pub fn release(mut self) -> Result<()> {
        self.done = true;
        debug!(path = %self.path.display(), "releasing workspace");
        fs::remove_dir_all(&self.path).map_err(|e| DoctestError::workspace_cleanup(&self.path, e))
    }

    /// Keep the workspace on disk for inspection and return its path.
    pub fn retain(mut self) -> PathBuf {
        self.done = true;
        warn!(path = %self.path.display(), "keeping workspace");
        std::mem::take(&mut self.path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove abandoned workspace");
        }
    }
}

fn random_suffix() -> String {
    format!("{:016x}", rand::random::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_directory_with_prefix() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::acquire(tmp.path(), "doc-").unwrap();
        assert!(ws.path().is_dir());
        assert!(ws.path().is_absolute());
        let name = ws.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("doc-"));
        assert_eq!(name.len(), "doc-".len() + 16);
        ws.release().unwrap();
    }

    #[test]
    fn names_are_distinct() {
        let tmp = TempDir::new().unwrap();
        let workspaces: Vec<_> = (0..200)
            .map(|_| Workspace::acquire(tmp.path(), DEFAULT_PREFIX).unwrap())
            .collect();
        let names: HashSet<_> = workspaces.iter().map(|w| w.path().to_path_buf()).collect();
        assert_eq!(names.len(), 200);
        for ws in workspaces {
            ws.release().unwrap();
        }
    }

    #[test]
    fn collision_is_retried() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("ws-a")).unwrap();

        let mut suffixes = ["a", "a", "b"].into_iter();
        let ws = Workspace::acquire_with(tmp.path(), "ws-", || {
            suffixes.next().unwrap().to_string()
        })
        .unwrap();
        assert_eq!(ws.path().file_name().unwrap(), "ws-b");
        ws.release().unwrap();
    }

    #[test]
    fn endless_collisions_give_up() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("ws-a")).unwrap();

        let mut calls = 0;
        let err = Workspace::acquire_with(tmp.path(), "ws-", || {
            calls += 1;
            "a".to_string()
        })
        .unwrap_err();
        assert!(matches!(err, DoctestError::WorkspaceExhausted { attempts: MAX_ATTEMPTS, .. }));
        assert_eq!(calls, MAX_ATTEMPTS);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let tmp = TempDir::new().unwrap();
        let missing_root = tmp.path().join("does-not-exist");

        let mut calls = 0;
        let err = Workspace::acquire_with(&missing_root, "ws-", || {
            calls += 1;
            "a".to_string()
        })
        .unwrap_err();
        assert!(matches!(err, DoctestError::WorkspaceCreate { .. }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn release_removes_contents() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::acquire(tmp.path(), "ws-").unwrap();
        fs::create_dir(ws.join("nested")).unwrap();
        fs::write(ws.join("nested").join("file.rk"), "func main() { }").unwrap();
        let path = ws.path().to_path_buf();

        ws.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn release_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::acquire(tmp.path(), "ws-").unwrap();
        fs::remove_dir(ws.path()).unwrap();

        let err = ws.release().unwrap_err();
        assert!(matches!(err, DoctestError::WorkspaceCleanup { .. }));
    }

    #[test]
    fn retain_keeps_directory() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::acquire(tmp.path(), "ws-").unwrap();
        let path = ws.retain();
        assert!(path.is_dir());
    }

    #[test]
    fn drop_removes_unreleased_workspace() {
        let tmp = TempDir::new().unwrap();
        let path = {
            let ws = Workspace::acquire(tmp.path(), "ws-").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
