// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! rask-doctest: check that a documentation snippet does what the docs say.
//!
//! The highlighted snippet (and the transcript of any toolchain runs) is
//! written to stdout or `--output`. The verdict goes to stderr, and the
//! exit status says how it went:
//!
//! - 0: the snippet behaved as expected
//! - 1: it didn't
//! - 2: the request was invalid
//! - 3: something failed while carrying it out

mod output;
mod telemetry;

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, Level};

use rask_doctest::{
    run_doctest, ArtifactFormat, BuildConfig, DoctestError, ErrorClass, ExpectedOutcome,
    Operation, Report, RunConfig, Snippet, TestConfig, Toolchain, VerifyOptions, DEFAULT_NAME,
    DEFAULT_PREFIX, DEFAULT_TOOLCHAIN,
};

const EXIT_FAIL: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_RESOURCE: u8 = 3;

#[derive(Parser)]
#[command(name = "rask-doctest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify Rask documentation snippets against the toolchain", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Print a JSON report on stderr instead of the summary line
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Highlight only; the toolchain is never invoked
    Syntax {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Compile the snippet
    Build {
        #[command(flatten)]
        common: CommonArgs,

        /// Artifact format: exe, obj or lib
        #[arg(long, default_value = "exe")]
        format: String,

        /// Target triple to cross-compile for
        #[arg(long)]
        target: Option<String>,
    },

    /// Compile the snippet, then run the executable
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Arguments passed to the program
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Run the snippet's tests
    Test {
        #[command(flatten)]
        common: CommonArgs,

        /// Only run tests matching this pattern
        #[arg(short, long)]
        filter: Option<String>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Snippet file (default: stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write the rendered snippet here (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Snippet name (default: input file stem, or "snippet")
    #[arg(long)]
    name: Option<String>,

    /// Expect failure; with TEXT, stderr must also contain it
    #[arg(long, value_name = "TEXT", num_args = 0..=1, default_missing_value = "")]
    expect_fail: Option<String>,

    /// Toolchain executable
    #[arg(long, env = "RASK_DOCTEST_TOOLCHAIN", default_value = DEFAULT_TOOLCHAIN)]
    toolchain: PathBuf,

    /// Extra environment for toolchain runs
    #[arg(long = "env", value_name = "KEY=VALUE")]
    envs: Vec<String>,

    /// Kill any toolchain or program run after this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Don't delete the workspace afterwards
    #[arg(long)]
    keep_workspace: bool,

    /// Directory to create workspaces in
    #[arg(long, default_value = ".")]
    workspace_root: PathBuf,

    /// Refuse input larger than this
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    max_input_bytes: u64,
}

impl CommonArgs {
    fn expected(&self) -> ExpectedOutcome {
        ExpectedOutcome::from_failure_text(self.expect_fail.clone())
    }

    fn options(&self) -> Result<VerifyOptions> {
        let mut toolchain = Toolchain::new(self.toolchain.clone());
        for assignment in &self.envs {
            let (key, value) = Toolchain::parse_env(assignment)?;
            toolchain = toolchain.with_env(key, value);
        }
        if let Some(secs) = self.timeout {
            toolchain = toolchain.with_timeout(Duration::from_secs(secs));
        }

        Ok(VerifyOptions {
            toolchain,
            workspace_root: self.workspace_root.clone(),
            workspace_prefix: DEFAULT_PREFIX.to_string(),
            keep_workspace: self.keep_workspace,
        })
    }

    fn name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.input
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_NAME.to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    output::init();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    telemetry::init_tracing(cli.log_json, level);

    match run(&cli) {
        Ok(report) => {
            if let Err(e) = print_summary(&cli, &report) {
                eprintln!("{}: {:#}", output::error_label(), e);
                return ExitCode::from(EXIT_RESOURCE);
            }
            if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_FAIL)
            }
        }
        Err(e) => {
            eprintln!("{}: {:#}", output::error_label(), e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: &Cli) -> Result<Report> {
    let (common, operation) = match &cli.command {
        Commands::Syntax { common } => (common, Operation::SyntaxCheck),
        Commands::Build {
            common,
            format,
            target,
        } => {
            let config = BuildConfig {
                format: format.parse::<ArtifactFormat>()?,
                target: target.clone(),
            };
            (common, Operation::Build(config))
        }
        Commands::Run { common, args } => {
            let config = RunConfig { args: args.clone() };
            (common, Operation::Run(config))
        }
        Commands::Test { common, filter } => (
            common,
            Operation::Test(TestConfig {
                filter: filter.clone(),
            }),
        ),
    };

    let options = common.options()?;
    let name = common.name();
    let source = read_input(common.input.as_deref(), common.max_input_bytes)?;
    debug!(name = %name, bytes = source.len(), operation = operation.name(), "read snippet");

    // Rendered into memory so a rejected request leaves no partial output.
    let mut rendered = Vec::new();
    let report = run_doctest(
        &Snippet::new(&name, &source),
        &operation,
        &common.expected(),
        &options,
        &mut rendered,
    )?;
    write_output(common.output.as_deref(), &rendered)?;
    Ok(report)
}

fn read_input(path: Option<&Path>, limit: u64) -> Result<Vec<u8>> {
    let mut source = Vec::new();
    match path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            file.take(limit.saturating_add(1))
                .read_to_end(&mut source)
                .with_context(|| format!("failed to read {}", path.display()))?;
        }
        None => {
            io::stdin()
                .lock()
                .take(limit.saturating_add(1))
                .read_to_end(&mut source)
                .context("failed to read stdin")?;
        }
    }
    if source.len() as u64 > limit {
        bail!("input is larger than {} bytes", limit);
    }
    Ok(source)
}

fn write_output(path: Option<&Path>, rendered: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(rendered)
                .and_then(|()| stdout.flush())
                .context("failed to write stdout")?;
        }
    }
    Ok(())
}

fn print_summary(cli: &Cli, report: &Report) -> Result<()> {
    if cli.json {
        let json = report.to_json_string().context("failed to encode report")?;
        eprintln!("{}", json);
    } else {
        eprintln!("{}", output::summary(report));
    }
    Ok(())
}

/// Library errors carry their class; anything else went wrong at the edge
/// (reading input, writing output) and is a resource failure.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DoctestError>().map(DoctestError::class) {
        Some(ErrorClass::Configuration) => EXIT_CONFIG,
        Some(ErrorClass::Resource) | None => EXIT_RESOURCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    fn common(args: &[&str]) -> CommonArgs {
        let mut argv = vec!["rask-doctest", "syntax"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Syntax { common } => common,
            _ => unreachable!(),
        }
    }

    #[test]
    fn name_comes_from_flag_then_input_stem() {
        assert_eq!(common(&["--name", "greet"]).name(), "greet");
        assert_eq!(common(&["-i", "docs/hello.rk"]).name(), "hello");
        assert_eq!(common(&[]).name(), DEFAULT_NAME);
    }

    #[test]
    fn expect_fail_with_and_without_text() {
        assert_eq!(common(&[]).expected(), ExpectedOutcome::Success);
        assert_eq!(
            common(&["--expect-fail"]).expected(),
            ExpectedOutcome::Failure(None)
        );
        assert_eq!(
            common(&["--expect-fail", "unknown identifier"]).expected(),
            ExpectedOutcome::Failure(Some("unknown identifier".into()))
        );
    }

    #[test]
    fn malformed_env_is_a_configuration_error() {
        let err = common(&["--env", "NOVALUE"]).options().unwrap_err();
        assert_eq!(exit_code(&err), EXIT_CONFIG);
    }

    #[test]
    fn env_and_timeout_reach_the_toolchain() {
        let options = common(&["--env", "RASK_RUNTIME_DIR=/opt/rt", "--timeout", "5"])
            .options()
            .unwrap();
        assert_eq!(
            options.toolchain.envs,
            [("RASK_RUNTIME_DIR".to_string(), "/opt/rt".to_string())]
        );
        assert_eq!(options.toolchain.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn run_arguments_follow_double_dash() {
        let cli = Cli::try_parse_from(["rask-doctest", "run", "--", "world", "--loud"]).unwrap();
        match cli.command {
            Commands::Run { args, .. } => assert_eq!(args, ["world", "--loud"]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn edge_errors_are_resource_errors() {
        let err = anyhow::anyhow!("failed to read stdin");
        assert_eq!(exit_code(&err), EXIT_RESOURCE);
    }
}
