// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Driving the `rask` toolchain.
//!
//! Every child runs inside the workspace with paths relative to it, so the
//! recorded command line is also what a reader could type.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use crate::error::{DoctestError, Result};
use crate::operation::{BuildConfig, TestConfig};
use crate::process::{self, Captured};
use crate::record::{ExecutionRecord, Termination};
use crate::workspace::Workspace;

/// Program looked up on `PATH` when no toolchain is configured.
pub const DEFAULT_TOOLCHAIN: &str = "rask";

/// Forced on every child so diagnostics are plain text whether or not we
/// sit behind a terminal.
const DIAGNOSTIC_ENV: &[(&str, &str)] = &[("NO_COLOR", "1"), ("TERM", "dumb")];

/// Variables that would turn colour back on.
const COLOR_FORCING_ENV: &[&str] = &["FORCE_COLOR", "CLICOLOR_FORCE"];

/// The external toolchain and how to launch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub program: PathBuf,
    /// Extra environment for every child, on top of the inherited one.
    pub envs: Vec<(String, String)>,
    /// Kill a child that runs longer than this.
    pub timeout: Option<Duration>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new(DEFAULT_TOOLCHAIN)
    }
}

impl Toolchain {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            envs: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Split a `KEY=VALUE` assignment.
    pub fn parse_env(assignment: &str) -> Result<(String, String)> {
        match assignment.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(DoctestError::InvalidEnv(assignment.to_string())),
        }
    }

    /// `compile <source> -o <artifact> [--emit <kind>] [--target <triple>]`
    pub fn build_args(&self, source: &str, artifact: &str, config: &BuildConfig) -> Vec<String> {
        let mut args = vec![
            "compile".to_string(),
            source.to_string(),
            "-o".to_string(),
            artifact.to_string(),
        ];
        if let Some(emit) = config.format.emit_flag() {
            args.push("--emit".to_string());
            args.push(emit.to_string());
        }
        if let Some(target) = &config.target {
            args.push("--target".to_string());
            args.push(target.clone());
        }
        args
    }

    /// `test <source> [-f <filter>]`
    pub fn test_args(&self, source: &str, config: &TestConfig) -> Vec<String> {
        let mut args = vec!["test".to_string(), source.to_string()];
        if let Some(filter) = &config.filter {
            args.push("-f".to_string());
            args.push(filter.clone());
        }
        args
    }

    /// Compile `source` (a file in the workspace) for snippet `name`.
    ///
    /// On success the record carries the artifact's path, provided the
    /// toolchain actually wrote it.
    pub fn build(
        &self,
        workspace: &Workspace,
        source: &str,
        name: &str,
        config: &BuildConfig,
    ) -> Result<ExecutionRecord> {
        let artifact = config.format.file_name(name);
        let args = self.build_args(source, &artifact, config);
        let mut record = self.invoke_toolchain(workspace, &args)?;

        let path = workspace.join(&artifact);
        if record.succeeded() && path.is_file() {
            record.artifact = Some(path);
        }
        Ok(record)
    }

    /// Run the snippet's tests.
    pub fn test(
        &self,
        workspace: &Workspace,
        source: &str,
        config: &TestConfig,
    ) -> Result<ExecutionRecord> {
        let args = self.test_args(source, config);
        self.invoke_toolchain(workspace, &args)
    }

    /// Run a built artifact directly, with the same environment and timeout
    /// as toolchain invocations.
    pub fn execute(
        &self,
        workspace: &Workspace,
        artifact: &Path,
        args: &[String],
    ) -> Result<ExecutionRecord> {
        let shown = match artifact.strip_prefix(workspace.path()) {
            Ok(relative) => Path::new(".").join(relative),
            Err(_) => artifact.to_path_buf(),
        };
        let mut argv = vec![shown.display().to_string()];
        argv.extend(args.iter().cloned());

        self.invoke(artifact, argv, workspace.path())
    }

    fn invoke_toolchain(&self, workspace: &Workspace, args: &[String]) -> Result<ExecutionRecord> {
        let program = self.resolved_program()?;
        let mut argv = vec![self.program.display().to_string()];
        argv.extend(args.iter().cloned());

        self.invoke(&program, argv, workspace.path())
    }

    /// Spawn `program` with `argv[1..]` in `cwd` and record the result.
    fn invoke(&self, program: &Path, argv: Vec<String>, cwd: &Path) -> Result<ExecutionRecord> {
        debug!(argv = ?argv, cwd = %cwd.display(), "spawning");

        let mut command = Command::new(program);
        command.args(&argv[1..]).current_dir(cwd);
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        for key in COLOR_FORCING_ENV {
            command.env_remove(key);
        }
        for (key, value) in DIAGNOSTIC_ENV {
            command.env(key, value);
        }

        let Captured {
            status,
            stdout,
            stderr,
        } = process::capture(&mut command, program, self.timeout)?;
        let termination = Termination::from_status(status);
        debug!(termination = ?termination, "child finished");

        Ok(ExecutionRecord {
            argv,
            termination,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            artifact: None,
        })
    }

    /// A bare name is left for `PATH` lookup. A relative path with a
    /// directory part is anchored to our own working directory, since the
    /// child starts in the workspace.
    fn resolved_program(&self) -> Result<PathBuf> {
        if self.program.is_absolute() || self.program.components().count() <= 1 {
            return Ok(self.program.clone());
        }
        std::path::absolute(&self.program).map_err(|e| {
            DoctestError::io(format!("failed to resolve {}", self.program.display()), e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::ArtifactFormat;

    #[test]
    fn build_args_for_executable() {
        let tc = Toolchain::default();
        let args = tc.build_args("hello.rk", "hello", &BuildConfig::default());
        assert_eq!(args, ["compile", "hello.rk", "-o", "hello"]);
    }

    #[test]
    fn build_args_for_object_with_target() {
        let tc = Toolchain::default();
        let config = BuildConfig {
            format: ArtifactFormat::Object,
            target: Some("aarch64-unknown-linux-gnu".into()),
        };
        let args = tc.build_args("hello.rk", "hello.o", &config);
        assert_eq!(
            args,
            [
                "compile",
                "hello.rk",
                "-o",
                "hello.o",
                "--emit",
                "obj",
                "--target",
                "aarch64-unknown-linux-gnu"
            ]
        );
    }

    #[test]
    fn build_args_for_library() {
        let tc = Toolchain::default();
        let config = BuildConfig {
            format: ArtifactFormat::Library,
            target: None,
        };
        let args = tc.build_args("m.rk", "libm.a", &config);
        assert_eq!(args, ["compile", "m.rk", "-o", "libm.a", "--emit", "lib"]);
    }

    #[test]
    fn test_args_with_filter() {
        let tc = Toolchain::default();
        assert_eq!(tc.test_args("t.rk", &TestConfig::default()), ["test", "t.rk"]);
        let config = TestConfig {
            filter: Some("parses".into()),
        };
        assert_eq!(tc.test_args("t.rk", &config), ["test", "t.rk", "-f", "parses"]);
    }

    #[test]
    fn parse_env_assignments() {
        assert_eq!(
            Toolchain::parse_env("RASK_RUNTIME_DIR=/opt/rask").unwrap(),
            ("RASK_RUNTIME_DIR".to_string(), "/opt/rask".to_string())
        );
        assert_eq!(Toolchain::parse_env("EMPTY=").unwrap().1, "");
        assert!(matches!(
            Toolchain::parse_env("NOVALUE"),
            Err(DoctestError::InvalidEnv(_))
        ));
        assert!(Toolchain::parse_env("=x").is_err());
    }

    #[test]
    fn bare_program_is_left_for_path_lookup() {
        let tc = Toolchain::default();
        assert_eq!(tc.resolved_program().unwrap(), PathBuf::from("rask"));
    }

    #[test]
    fn relative_program_is_anchored() {
        let tc = Toolchain::new("bin/rask");
        let resolved = tc.resolved_program().unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("bin/rask"));
    }
}
