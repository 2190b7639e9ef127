// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! What to do with a snippet, and what should happen when we do it.

use std::fmt;
use std::str::FromStr;

use crate::error::DoctestError;

/// Output of a `Build` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactFormat {
    #[default]
    Executable,
    Object,
    Library,
}

impl ArtifactFormat {
    /// Artifact file name for a snippet called `name`.
    pub fn file_name(self, name: &str) -> String {
        match self {
            ArtifactFormat::Executable => format!("{}{}", name, std::env::consts::EXE_SUFFIX),
            ArtifactFormat::Object => format!("{}.o", name),
            ArtifactFormat::Library => format!("lib{}.a", name),
        }
    }

    /// Value for `rask compile --emit`. Executables are the default and need none.
    pub fn emit_flag(self) -> Option<&'static str> {
        match self {
            ArtifactFormat::Executable => None,
            ArtifactFormat::Object => Some("obj"),
            ArtifactFormat::Library => Some("lib"),
        }
    }
}

impl FromStr for ArtifactFormat {
    type Err = DoctestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exe" | "executable" => Ok(ArtifactFormat::Executable),
            "obj" | "object" => Ok(ArtifactFormat::Object),
            "lib" | "library" => Ok(ArtifactFormat::Library),
            other => Err(DoctestError::UnknownArtifactFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactFormat::Executable => "exe",
            ArtifactFormat::Object => "obj",
            ArtifactFormat::Library => "lib",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    pub format: ArtifactFormat,
    /// Cross-compilation target triple. `None` builds for the host.
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Arguments passed to the built program.
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestConfig {
    /// Only run tests whose name matches (`rask test -f`).
    pub filter: Option<String>,
}

/// The requested verification mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Highlight only; the toolchain is never invoked.
    SyntaxCheck,
    Build(BuildConfig),
    /// Build an executable, then run it.
    Run(RunConfig),
    /// Run the snippet's test functions with `rask test`.
    Test(TestConfig),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SyntaxCheck => "syntax",
            Operation::Build(_) => "build",
            Operation::Run(_) => "run",
            Operation::Test(_) => "test",
        }
    }
}

/// How an invocation is expected to terminate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedOutcome {
    /// Exit successfully; stderr is not looked at.
    Success,
    /// Exit successfully with nothing on stderr. Gates a build before its
    /// artifact is run, so warnings can't pass for a clean build.
    SilentSuccess,
    /// Exit unsuccessfully, with stderr containing the text when given.
    Failure(Option<String>),
}

impl ExpectedOutcome {
    /// Build the expectation from an optional expected-failure match text.
    /// No text means success is expected; an empty text means any failure.
    pub fn from_failure_text(text: Option<String>) -> Self {
        match text {
            None => ExpectedOutcome::Success,
            Some(text) if text.is_empty() => ExpectedOutcome::Failure(None),
            Some(text) => ExpectedOutcome::Failure(Some(text)),
        }
    }
}
