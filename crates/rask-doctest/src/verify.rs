// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Judge an execution record against the declared expectation.

use std::fmt;

use serde::Serialize;

use crate::operation::ExpectedOutcome;
use crate::record::{ExecutionRecord, Termination};

/// Why a verification failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailReason {
    ExpectedSuccess,
    /// Exited successfully but wrote diagnostics where silence was required.
    UnexpectedStderr,
    ExpectedFailure,
    MissingFailureText { expected: String },
    NoArtifact,
    TimedOut,
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::ExpectedSuccess => write!(f, "expected success but operation failed"),
            FailReason::UnexpectedStderr => {
                write!(f, "expected no diagnostics but stderr was not empty")
            }
            FailReason::ExpectedFailure => write!(f, "expected failure but operation succeeded"),
            FailReason::MissingFailureText { expected } => {
                write!(f, "expected failure text not found in stderr: '{}'", expected)
            }
            FailReason::NoArtifact => write!(f, "build produced no artifact to execute"),
            FailReason::TimedOut => write!(f, "operation timed out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(FailReason),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// Compare `actual` with `expected`.
///
/// A timed-out record always fails, whatever was expected: a hang is not
/// the failure a compile-fail or panic example documents.
pub fn verify(expected: &ExpectedOutcome, actual: &ExecutionRecord) -> Verdict {
    if actual.termination == Termination::TimedOut {
        return Verdict::Fail(FailReason::TimedOut);
    }

    match expected {
        ExpectedOutcome::Success if actual.succeeded() => Verdict::Pass,
        ExpectedOutcome::Success => Verdict::Fail(FailReason::ExpectedSuccess),

        ExpectedOutcome::SilentSuccess if !actual.succeeded() => {
            Verdict::Fail(FailReason::ExpectedSuccess)
        }
        ExpectedOutcome::SilentSuccess if !actual.stderr.is_empty() => {
            Verdict::Fail(FailReason::UnexpectedStderr)
        }
        ExpectedOutcome::SilentSuccess => Verdict::Pass,

        ExpectedOutcome::Failure(_) if actual.succeeded() => {
            Verdict::Fail(FailReason::ExpectedFailure)
        }
        ExpectedOutcome::Failure(Some(text)) if !actual.stderr.contains(text.as_str()) => {
            Verdict::Fail(FailReason::MissingFailureText {
                expected: text.clone(),
            })
        }
        ExpectedOutcome::Failure(_) => Verdict::Pass,
    }
}
