// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The result of one doctest invocation, and its JSON form.

use std::path::PathBuf;

use serde::Serialize;

use crate::record::ExecutionRecord;
use crate::verify::{FailReason, Verdict};

/// Outcome of a completed verification, pass or fail.
#[derive(Debug, Clone)]
pub struct Report {
    /// Snippet file name, e.g. `hello.rk`.
    pub file: String,
    pub operation: &'static str,
    pub verdict: Verdict,
    /// Invocations in the order they ran. Empty for a syntax check.
    pub records: Vec<ExecutionRecord>,
    /// Set when the workspace was kept for inspection.
    pub workspace: Option<PathBuf>,
}

/// Machine-readable report, versioned like the compiler's diagnostic JSON.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub version: u32,
    pub file: &'a str,
    pub operation: &'a str,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a FailReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub invocations: &'a [ExecutionRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<&'a PathBuf>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.verdict.passed()
    }

    pub fn fail_reason(&self) -> Option<&FailReason> {
        match &self.verdict {
            Verdict::Pass => None,
            Verdict::Fail(reason) => Some(reason),
        }
    }

    pub fn to_json(&self) -> JsonReport<'_> {
        let reason = self.fail_reason();
        JsonReport {
            version: 1,
            file: &self.file,
            operation: self.operation,
            passed: self.passed(),
            reason,
            message: reason.map(|r| r.to_string()),
            invocations: &self.records,
            workspace: self.workspace.as_ref(),
        }
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Termination;

    fn report(verdict: Verdict) -> Report {
        Report {
            file: "hello.rk".into(),
            operation: "build",
            verdict,
            records: vec![ExecutionRecord {
                argv: vec!["rask".into(), "compile".into(), "hello.rk".into()],
                termination: Termination::Failure { code: Some(1) },
                stdout: String::new(),
                stderr: "error: expected ';' after statement\n".into(),
                artifact: None,
            }],
            workspace: None,
        }
    }

    #[test]
    fn passing_report_json() {
        let json: serde_json::Value =
            serde_json::from_str(&report(Verdict::Pass).to_json_string().unwrap()).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["passed"], true);
        assert!(json.get("reason").is_none());
        assert_eq!(json["invocations"][0]["termination"]["kind"], "failure");
        assert_eq!(json["invocations"][0]["termination"]["code"], 1);
    }

    #[test]
    fn failing_report_json() {
        let verdict = Verdict::Fail(FailReason::MissingFailureText {
            expected: "unknown identifier".into(),
        });
        let json: serde_json::Value =
            serde_json::from_str(&report(verdict).to_json_string().unwrap()).unwrap();
        assert_eq!(json["passed"], false);
        assert_eq!(json["reason"]["reason"], "missing_failure_text");
        assert_eq!(json["reason"]["expected"], "unknown identifier");
        assert_eq!(
            json["message"],
            "expected failure text not found in stderr: 'unknown identifier'"
        );
    }
}
