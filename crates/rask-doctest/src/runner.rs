// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Run one snippet through the toolchain and judge the result.
//!
//! The snippet is always highlighted first. A syntax check stops there;
//! every other operation gets a fresh workspace that is released on every
//! exit path unless the caller asked to keep it.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tracing::{error, info};

use crate::error::{DoctestError, Result};
use crate::operation::{BuildConfig, ExpectedOutcome, Operation, RunConfig, TestConfig};
use crate::record::ExecutionRecord;
use crate::render;
use crate::report::Report;
use crate::toolchain::Toolchain;
use crate::verify::{verify, FailReason, Verdict};
use crate::workspace::{Workspace, DEFAULT_PREFIX};

/// File extension of Rask sources.
pub const SOURCE_EXTENSION: &str = "rk";

/// Snippet name used when the input has no file name to borrow.
pub const DEFAULT_NAME: &str = "snippet";

/// A snippet to verify.
#[derive(Debug, Clone, Copy)]
pub struct Snippet<'a> {
    /// Stem of the file the snippet is written to (`<name>.rk`) and of its
    /// build artifact.
    pub name: &'a str,
    pub source: &'a [u8],
}

impl<'a> Snippet<'a> {
    pub fn new(name: &'a str, source: &'a [u8]) -> Self {
        Self { name, source }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, SOURCE_EXTENSION)
    }

    /// Names become file names inside the workspace, so they must stay there.
    fn validate(&self) -> Result<()> {
        let reason = if self.name.is_empty() {
            "name is empty"
        } else if self.name.contains(['/', '\\']) {
            "contains a path separator"
        } else if self.name.starts_with('.') {
            "starts with '.'"
        } else if self.name.contains('\0') {
            "contains a NUL byte"
        } else {
            return Ok(());
        };
        Err(DoctestError::invalid_name(self.name, reason))
    }
}

/// Everything about an invocation that isn't the snippet or the expectation.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub toolchain: Toolchain,
    /// Directory workspaces are created in.
    pub workspace_root: PathBuf,
    pub workspace_prefix: String,
    /// Skip workspace cleanup so the artifacts can be inspected.
    pub keep_workspace: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            toolchain: Toolchain::default(),
            workspace_root: PathBuf::from("."),
            workspace_prefix: DEFAULT_PREFIX.to_string(),
            keep_workspace: false,
        }
    }
}

/// What the toolchain stages produced.
struct Outcome {
    verdict: Verdict,
    records: Vec<ExecutionRecord>,
}

impl Outcome {
    fn single(verdict: Verdict, record: ExecutionRecord) -> Self {
        Self {
            verdict,
            records: vec![record],
        }
    }
}

/// Verify `snippet` under `operation` against `expected`, writing the
/// highlighted snippet and the transcript to `out`.
///
/// `Ok` carries the verdict, pass or fail. `Err` means the verification
/// couldn't be carried out at all.
pub fn run_doctest(
    snippet: &Snippet<'_>,
    operation: &Operation,
    expected: &ExpectedOutcome,
    options: &VerifyOptions,
    out: &mut dyn Write,
) -> Result<Report> {
    snippet.validate()?;
    let file = snippet.file_name();

    render::write_code_figure(out, &file, snippet.source)
        .map_err(|e| DoctestError::io("failed to write highlighted snippet", e))?;

    let (outcome, workspace) = match operation {
        Operation::SyntaxCheck => (
            Outcome {
                verdict: Verdict::Pass,
                records: Vec::new(),
            },
            None,
        ),
        Operation::Build(config) => in_workspace(options, |ws| {
            build_stage(&options.toolchain, ws, snippet, config, expected)
        })?,
        Operation::Run(config) => in_workspace(options, |ws| {
            run_stage(&options.toolchain, ws, snippet, config, expected)
        })?,
        Operation::Test(config) => in_workspace(options, |ws| {
            test_stage(&options.toolchain, ws, snippet, config, expected)
        })?,
    };

    if !outcome.records.is_empty() {
        render::write_transcript(out, &outcome.records)
            .map_err(|e| DoctestError::io("failed to write transcript", e))?;
    }

    match &outcome.verdict {
        Verdict::Pass => info!(file = %file, operation = operation.name(), "pass"),
        Verdict::Fail(reason) => {
            info!(file = %file, operation = operation.name(), %reason, "fail")
        }
    }

    Ok(Report {
        file,
        operation: operation.name(),
        verdict: outcome.verdict,
        records: outcome.records,
        workspace,
    })
}

/// Run `stage` in a fresh workspace, then release or retain it.
///
/// A stage error wins over a cleanup error; the cleanup error is logged.
fn in_workspace<F>(options: &VerifyOptions, stage: F) -> Result<(Outcome, Option<PathBuf>)>
where
    F: FnOnce(&Workspace) -> Result<Outcome>,
{
    let workspace = Workspace::acquire(&options.workspace_root, &options.workspace_prefix)?;
    let result = stage(&workspace);

    if options.keep_workspace {
        let path = workspace.retain();
        return result.map(|outcome| (outcome, Some(path)));
    }

    match (result, workspace.release()) {
        (Ok(outcome), Ok(())) => Ok((outcome, None)),
        (Ok(_), Err(cleanup)) => Err(cleanup),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup)) => {
            error!(error = %cleanup, "workspace cleanup failed after an earlier error");
            Err(e)
        }
    }
}

/// Write the snippet into the workspace and return its file name.
fn write_source(workspace: &Workspace, snippet: &Snippet<'_>) -> Result<String> {
    let file = snippet.file_name();
    let path = workspace.join(&file);
    fs::write(&path, snippet.source)
        .map_err(|e| DoctestError::io(format!("failed to write {}", path.display()), e))?;
    Ok(file)
}

fn build_stage(
    toolchain: &Toolchain,
    workspace: &Workspace,
    snippet: &Snippet<'_>,
    config: &BuildConfig,
    expected: &ExpectedOutcome,
) -> Result<Outcome> {
    let source = write_source(workspace, snippet)?;
    let record = toolchain.build(workspace, &source, snippet.name, config)?;
    Ok(Outcome::single(verify(expected, &record), record))
}

/// Build an executable, which must succeed silently, then run it against
/// the caller's expectation.
fn run_stage(
    toolchain: &Toolchain,
    workspace: &Workspace,
    snippet: &Snippet<'_>,
    config: &RunConfig,
    expected: &ExpectedOutcome,
) -> Result<Outcome> {
    let source = write_source(workspace, snippet)?;
    let build = toolchain.build(workspace, &source, snippet.name, &BuildConfig::default())?;

    let verdict = verify(&ExpectedOutcome::SilentSuccess, &build);
    if !verdict.passed() {
        return Ok(Outcome::single(verdict, build));
    }
    let Some(artifact) = build.artifact.clone() else {
        return Ok(Outcome::single(Verdict::Fail(FailReason::NoArtifact), build));
    };

    let run = toolchain.execute(workspace, &artifact, &config.args)?;
    Ok(Outcome {
        verdict: verify(expected, &run),
        records: vec![build, run],
    })
}

fn test_stage(
    toolchain: &Toolchain,
    workspace: &Workspace,
    snippet: &Snippet<'_>,
    config: &TestConfig,
    expected: &ExpectedOutcome,
) -> Result<Outcome> {
    let source = write_source(workspace, snippet)?;
    let record = toolchain.test(workspace, &source, config)?;
    Ok(Outcome::single(verify(expected, &record), record))
}
