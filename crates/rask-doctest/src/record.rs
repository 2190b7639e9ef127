// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! What one toolchain (or artifact) invocation did.

use std::path::PathBuf;
use std::process::ExitStatus;

use serde::Serialize;

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    Success,
    /// Non-zero exit, or killed by a signal (`code` is `None`).
    Failure { code: Option<i32> },
    /// Killed after running past the configured timeout.
    TimedOut,
}

impl Termination {
    pub(crate) fn from_status(status: Option<ExitStatus>) -> Self {
        match status {
            Some(status) if status.success() => Termination::Success,
            Some(status) => Termination::Failure { code: status.code() },
            None => Termination::TimedOut,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRecord {
    /// Command line as shown in the transcript, relative to the workspace.
    pub argv: Vec<String>,
    pub termination: Termination,
    pub stdout: String,
    pub stderr: String,
    /// The artifact a successful build left in the workspace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
}

impl ExecutionRecord {
    pub fn succeeded(&self) -> bool {
        self.termination == Termination::Success
    }

    pub fn failed(&self) -> bool {
        matches!(self.termination, Termination::Failure { .. })
    }
}
